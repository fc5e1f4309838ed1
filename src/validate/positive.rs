// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The Positive/CNAME Validator: verifies a positive answer's RRset
//! chain -- a run of zero or more CNAMEs followed by the RRset of the
//! queried type -- together with the authority RRsets asserted alongside
//! it, re-entering the Trust-Chain Walker whenever a link in the chain is
//! signed by a different zone than the one before it.

use crate::error::{Result, ValidationErrorKind};
use crate::keyentry::KeyEntryState;
use crate::message::SMessage;
use crate::name::Name;
use crate::rr::{RData, RRset, RecordType};
use crate::verifier::verify_rrset;

use super::chain::{ensure_trust_chain, wire_now, ValidationContext};
use super::{nsec, nsec3};

/// Verify every link of the answer chain starting at `qname`: for an
/// ordinary query this is a single RRset; for a query that crossed one or
/// more CNAMEs it is each CNAME RRset followed by the final RRset of
/// `qtype`. Each link is verified under whichever zone its own RRSIG
/// names, which may differ link to link if the chain crosses a zone cut.
pub async fn validate_answer_chain(message: &mut SMessage, qname: &Name, qtype: RecordType, ctx: &ValidationContext<'_>) -> Result<()> {
    if qtype == RecordType::ANY {
        return validate_any(message, qname, ctx).await;
    }

    let class = message.question.qclass;
    let now = wire_now(ctx.config);
    let mut current_owner = qname.clone();
    let mut wildcard_links: Vec<(Name, Name)> = Vec::new();

    loop {
        let idx = message
            .answer
            .iter()
            .position(|r| r.name() == &current_owner && (r.record_type() == qtype || r.record_type() == RecordType::CNAME))
            .ok_or_else(|| ValidationErrorKind::MissingRrsig { owner: current_owner.clone(), rtype: qtype.mnemonic() })?;

        let signer = message.answer[idx]
            .rrsigs()
            .first()
            .map(|sig| sig.signer_name().clone())
            .ok_or_else(|| ValidationErrorKind::MissingRrsig {
                owner: current_owner.clone(),
                rtype: message.answer[idx].record_type().mnemonic(),
            })?;

        let entry = ensure_trust_chain(&signer, class, ctx).await?;
        match entry.state() {
            KeyEntryState::Bad { .. } => return Err(ValidationErrorKind::CachedBad { zone: signer }.into()),
            KeyEntryState::NullInsecureDelegation => return Ok(()),
            KeyEntryState::TrustedKeySet { dnskeys } => {
                let rrset = &mut message.answer[idx];
                if let Some(sig) = rrset.rrsigs().first() {
                    if rrset.is_wildcard_expanded(sig) {
                        wildcard_links.push((rrset.name().clone(), signer.clone()));
                    }
                }
                verify_rrset(rrset, &signer, dnskeys, now, ctx.backend.as_ref())?;
            }
        }

        let found_type = message.answer[idx].record_type();
        if found_type == qtype {
            break;
        }
        current_owner = match cname_target(&message.answer[idx]) {
            Some(target) => target,
            None => break,
        };
    }

    for (owner, zone) in &wildcard_links {
        if !proves_no_closer_match(&message.authority, owner, zone, ctx)? {
            return Err(ValidationErrorKind::BogusDenial { qname: owner.clone(), reason: "wildcard-no-closer-match" }.into());
        }
    }

    Ok(())
}

/// ANY has no chain to walk: verify every answer RRset owned by `qname`
/// under whichever zone its own RRSIG names, skipping unsigned members
/// (their individual status stays UNCHECKED, per the monotone merge in
/// [`SMessage::overall_status`](crate::message::SMessage::overall_status)).
async fn validate_any(message: &mut SMessage, qname: &Name, ctx: &ValidationContext<'_>) -> Result<()> {
    let class = message.question.qclass;
    let now = wire_now(ctx.config);
    let indices: Vec<usize> = message.answer.iter().enumerate().filter(|(_, r)| r.name() == qname).map(|(i, _)| i).collect();

    for idx in indices {
        let signer = match message.answer[idx].rrsigs().first() {
            Some(sig) => sig.signer_name().clone(),
            None => continue,
        };
        let entry = ensure_trust_chain(&signer, class, ctx).await?;
        if let KeyEntryState::TrustedKeySet { dnskeys } = entry.state() {
            verify_rrset(&mut message.answer[idx], &signer, dnskeys, now, ctx.backend.as_ref())?;
        }
    }
    Ok(())
}

/// Verify the structural authority RRsets (NS, SOA, and any NSEC/NSEC3
/// carried alongside a positive answer) under whichever zone each one's
/// own RRSIG names. Unsigned authority glue is left unverified rather
/// than rejected outright -- it contributes nothing to `overall_status`
/// either way.
pub async fn validate_authority(message: &mut SMessage, ctx: &ValidationContext<'_>) -> Result<()> {
    let class = message.question.qclass;
    let now = wire_now(ctx.config);

    for idx in 0..message.authority.len() {
        if !matches!(message.authority[idx].record_type(), RecordType::NS | RecordType::SOA | RecordType::NSEC | RecordType::NSEC3) {
            continue;
        }
        let signer = match message.authority[idx].rrsigs().first() {
            Some(sig) => sig.signer_name().clone(),
            None => continue,
        };
        let entry = ensure_trust_chain(&signer, class, ctx).await?;
        if let KeyEntryState::TrustedKeySet { dnskeys } = entry.state() {
            verify_rrset(&mut message.authority[idx], &signer, dnskeys, now, ctx.backend.as_ref())?;
        }
    }
    Ok(())
}

fn cname_target(rrset: &RRset) -> Option<Name> {
    rrset.rdata().iter().find_map(|d| match d {
        RData::CNAME(target) => Some(target.clone()),
        _ => None,
    })
}

fn proves_no_closer_match(authority: &[RRset], qname: &Name, zone: &Name, ctx: &ValidationContext<'_>) -> Result<bool> {
    let nsec3_records = nsec3::collect(authority);
    if !nsec3_records.is_empty() {
        return match nsec3::Nsec3Params::from_records(&nsec3_records) {
            Some(params) => nsec3::proves_no_closer_match(&nsec3_records, qname, &params, ctx.backend.as_ref()),
            None => Ok(false),
        };
    }
    let nsec_records = nsec::collect(authority);
    Ok(nsec::proves_no_closer_match(&nsec_records, qname, zone))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Algorithm, RingCryptoBackend};
    use crate::message::{Question, Rcode};
    use crate::rr::rdata::{PublicKeyBuf, RRSIG, DNSKEY};
    use crate::rr::{Class, Record};
    use crate::trust_anchor::{TrustAnchor, TrustAnchorSet};
    use crate::upstream::{Upstream, UpstreamError};
    use crate::cache::KeyCache;
    use crate::config::ValidatorConfig;
    use async_trait::async_trait;
    use ring::rand::SystemRandom;
    use ring::signature::{Ed25519KeyPair, KeyPair};

    fn name(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    struct NeverCalled;
    #[async_trait]
    impl Upstream for NeverCalled {
        async fn send(&self, _query: &Question) -> std::result::Result<SMessage, UpstreamError> {
            panic!("positive validation over already-trusted keys must not query upstream");
        }
    }

    fn signed_rrset(owner: &str, data: RData, key_pair: &Ed25519KeyPair, zone: &str, labels: u8) -> RRset {
        let rtype = data.record_type();
        let record = Record::new(name(owner), Class::IN, 300, data);
        let mut rrset = RRset::from_records(vec![record]).unwrap();
        let mut rrsig = RRSIG::new(rtype, Algorithm::ED25519, labels, 300, 2_000_000_000, 1_000_000_000, 1, name(zone), vec![]);
        let signed_data = rrset.signed_data(&rrsig);
        let signature = key_pair.sign(&signed_data);
        rrsig = RRSIG::new(
            rrsig.type_covered(),
            rrsig.algorithm(),
            rrsig.labels(),
            rrsig.original_ttl(),
            rrsig.expiration(),
            rrsig.inception(),
            rrsig.key_tag(),
            rrsig.signer_name().clone(),
            signature.as_ref().to_vec(),
        );
        rrset.add_rrsig(rrsig);
        rrset
    }

    fn ed25519_pair() -> Ed25519KeyPair {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap()
    }

    fn ctx_with_trusted_zone<'a>(
        zone: &str,
        key_pair: &Ed25519KeyPair,
        cache: &'a KeyCache,
        anchors: &'a TrustAnchorSet,
        config: &'a ValidatorConfig,
        backend: RingCryptoBackend,
        upstream: NeverCalled,
    ) -> ValidationContext<'a> {
        let dnskey = DNSKEY::new(257, PublicKeyBuf::new(key_pair.public_key().as_ref().to_vec(), Algorithm::ED25519));
        let entry = crate::keyentry::KeyEntry::trusted(name(zone), vec![dnskey], std::time::SystemTime::now() + std::time::Duration::from_secs(3600));
        cache.insert(entry);
        ValidationContext { cache, anchors, upstream: std::sync::Arc::new(upstream), config, backend: std::sync::Arc::new(backend) }
    }

    #[tokio::test]
    async fn verifies_a_single_link_positive_answer() {
        let key_pair = ed25519_pair();
        let cache = KeyCache::new(16);
        let anchors = TrustAnchorSet::new();
        let config = ValidatorConfig::default();
        let backend = RingCryptoBackend;
        let upstream = NeverCalled;
        let ctx = ctx_with_trusted_zone("example.com.", &key_pair, &cache, &anchors, &config, backend, upstream);

        let mut msg = SMessage::new(Question { qname: name("www.example.com."), qclass: Class::IN, qtype: RecordType::A }, Rcode::NoError);
        msg.answer.push(signed_rrset("www.example.com.", RData::Opaque(vec![192, 0, 2, 1]), &key_pair, "example.com.", 3));

        validate_answer_chain(&mut msg, &name("www.example.com."), RecordType::A, &ctx).await.unwrap();
        assert_eq!(msg.answer[0].status(), crate::status::SecurityStatus::Secure);
    }

    #[tokio::test]
    async fn follows_a_cname_link_to_the_final_answer() {
        let key_pair = ed25519_pair();
        let cache = KeyCache::new(16);
        let anchors = TrustAnchorSet::new();
        let config = ValidatorConfig::default();
        let backend = RingCryptoBackend;
        let upstream = NeverCalled;
        let ctx = ctx_with_trusted_zone("example.com.", &key_pair, &cache, &anchors, &config, backend, upstream);

        let mut msg = SMessage::new(Question { qname: name("www.example.com."), qclass: Class::IN, qtype: RecordType::A }, Rcode::NoError);
        msg.answer.push(signed_rrset("www.example.com.", RData::CNAME(name("alias.example.com.")), &key_pair, "example.com.", 3));
        msg.answer.push(signed_rrset("alias.example.com.", RData::Opaque(vec![192, 0, 2, 1]), &key_pair, "example.com.", 3));

        validate_answer_chain(&mut msg, &name("www.example.com."), RecordType::A, &ctx).await.unwrap();
        assert!(msg.answer.iter().all(|r| r.status() == crate::status::SecurityStatus::Secure));
    }

    #[tokio::test]
    async fn missing_link_in_the_chain_is_an_error() {
        let key_pair = ed25519_pair();
        let cache = KeyCache::new(16);
        let anchors = TrustAnchorSet::new();
        let config = ValidatorConfig::default();
        let backend = RingCryptoBackend;
        let upstream = NeverCalled;
        let ctx = ctx_with_trusted_zone("example.com.", &key_pair, &cache, &anchors, &config, backend, upstream);

        let mut msg = SMessage::new(Question { qname: name("www.example.com."), qclass: Class::IN, qtype: RecordType::A }, Rcode::NoError);
        let err = validate_answer_chain(&mut msg, &name("www.example.com."), RecordType::A, &ctx).await.unwrap_err();
        assert!(matches!(err.kind(), ValidationErrorKind::MissingRrsig { .. }));
    }
}
