// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The Event Orchestrator: the state machine that drives one user query
//! from `Init` to `Done`, dispatching to the Positive/CNAME Validator or
//! the NSEC/NSEC3 Denial Provers once the Trust-Chain Walker has resolved
//! the zone expected to sign it.

use tracing::{info_span, warn};

use crate::classify::{classify, ResponseKind};
use crate::error::{Result, ValidationErrorKind};
use crate::keyentry::KeyEntryState;
use crate::message::{Question, Rcode, SMessage};
use crate::name::Name;
use crate::rr::{RData, RecordType};
use crate::signer::resolve_signer;
use crate::verifier::verify_rrset;

use super::chain::{ensure_trust_chain, query, wire_now, ValidationContext};
use super::event::{Event, EventState};
use super::positive;
use super::{nsec, nsec3};

/// Validate `query` against `ctx.upstream`, returning a fully finalized
/// [`SMessage`] -- AD/rcode set per its overall security status --
/// regardless of whether validation succeeded. A lower-layer failure
/// (unreachable upstream, max chain depth, no trust anchor) is logged and
/// surfaced as a synthesized SERVFAIL rather than propagated, matching how
/// a stub resolver's caller expects one message back per query.
pub async fn validate(query: Question, ctx: &ValidationContext<'_>) -> SMessage {
    let span = info_span!("validate", qname = %query.qname, qtype = %query.qtype);
    let _enter = span.enter();

    let original = query.clone();
    let mut event = Event::new(query);

    match validate_event(&mut event, ctx).await {
        Ok(mut message) => {
            message.finalize();
            message
        }
        Err(err) => {
            warn!(%err, "validation failed");
            let mut message = SMessage::new(original, Rcode::ServFail);
            message.flags.ad = false;
            message
        }
    }
}

async fn validate_event(event: &mut Event, ctx: &ValidationContext<'_>) -> Result<SMessage> {
    loop {
        event.set_state(EventState::Init);
        let question = event.current_query().clone();

        let mut message = query(ctx.upstream.as_ref(), &question.qname, question.qclass, question.qtype).await?;

        if message.flags.cd {
            // RFC 4035 §3.2.2: Checking Disabled means pass the response
            // through unvalidated.
            return Ok(message);
        }

        let kind = classify(&message);
        event.validator_state_mut().classification = Some(kind);
        if kind == ResponseKind::Unknown {
            return Err(ValidationErrorKind::Unclassifiable { qname: question.qname.clone() }.into());
        }

        event.set_state(EventState::NeedKeys);
        match kind {
            ResponseKind::Positive | ResponseKind::Any | ResponseKind::Cname => {
                positive::validate_answer_chain(&mut message, &question.qname, question.qtype, ctx).await?;
                positive::validate_authority(&mut message, ctx).await?;
            }
            ResponseKind::NoData => validate_nodata(&mut message, &question, ctx).await?,
            ResponseKind::NxDomain => validate_nxdomain(&mut message, &question, ctx).await?,
            ResponseKind::Unknown => unreachable!("filtered above"),
        }
        event.set_state(EventState::Verifying);

        if kind == ResponseKind::Cname {
            if let Some(target) = dangling_cname_target(&message, question.qtype) {
                let follow_up = Question { qname: target, qclass: question.qclass, qtype: question.qtype };
                *event = event.child(follow_up)?;
                continue;
            }
        }

        event.set_state(EventState::Done);
        return Ok(message);
    }
}

/// `Some(target)` if the response carries a CNAME at the query name but
/// upstream did not itself chase it to an RRset of the queried type --
/// the stub must re-query for the target and re-enter validation.
fn dangling_cname_target(message: &SMessage, qtype: RecordType) -> Option<Name> {
    if message.answer_rrsets_of_type(qtype).next().is_some() {
        return None;
    }
    message
        .answer
        .iter()
        .filter(|r| r.record_type() == RecordType::CNAME)
        .rev()
        .find_map(|r| {
            r.rdata().iter().find_map(|d| match d {
                RData::CNAME(target) => Some(target.clone()),
                _ => None,
            })
        })
}

/// NODATA proof (RFC 4035 §5.4, RFC 5155 §8.5): resolve the signer zone's
/// keys, then prove the absence of `qtype` (and CNAME) at
/// `question.qname` via whichever of NSEC/NSEC3 the response carries.
async fn validate_nodata(message: &mut SMessage, question: &Question, ctx: &ValidationContext<'_>) -> Result<()> {
    let signer = resolve_signer(message, ResponseKind::NoData)
        .ok_or_else(|| ValidationErrorKind::MissingRrsig { owner: question.qname.clone(), rtype: "NSEC" })?;

    let entry = ensure_trust_chain(&signer, question.qclass, ctx).await?;
    let dnskeys = match entry.state() {
        KeyEntryState::TrustedKeySet { dnskeys } => dnskeys.clone(),
        KeyEntryState::NullInsecureDelegation => return Ok(()),
        KeyEntryState::Bad { .. } => return Err(ValidationErrorKind::CachedBad { zone: signer }.into()),
    };
    let now = wire_now(ctx.config);

    let nsec3_idxs: Vec<usize> = message.authority.iter().enumerate().filter(|(_, r)| r.record_type() == RecordType::NSEC3).map(|(i, _)| i).collect();
    if !nsec3_idxs.is_empty() {
        for &i in &nsec3_idxs {
            verify_rrset(&mut message.authority[i], &signer, &dnskeys, now, ctx.backend.as_ref())?;
        }
        let records = nsec3::collect(&message.authority);
        let params = nsec3::Nsec3Params::from_records(&records)
            .ok_or_else(|| ValidationErrorKind::BogusDenial { qname: question.qname.clone(), reason: "missing-nsec3-params" })?;
        if nsec3::iterations_exceed_cap(&params, &dnskeys, ctx.config) {
            return Ok(());
        }
        return if nsec3::proves_nodata(&records, &question.qname, question.qtype, &params, ctx.backend.as_ref())? {
            Ok(())
        } else {
            Err(ValidationErrorKind::BogusDenial { qname: question.qname.clone(), reason: "nsec3-nodata-proof-failed" }.into())
        };
    }

    let nsec_idxs: Vec<usize> = message.authority.iter().enumerate().filter(|(_, r)| r.record_type() == RecordType::NSEC).map(|(i, _)| i).collect();
    if nsec_idxs.is_empty() {
        return Err(ValidationErrorKind::MissingRrsig { owner: question.qname.clone(), rtype: "NSEC" }.into());
    }
    for &i in &nsec_idxs {
        verify_rrset(&mut message.authority[i], &signer, &dnskeys, now, ctx.backend.as_ref())?;
    }
    let records = nsec::collect(&message.authority);
    if nsec::proves_nodata(&records, &question.qname, question.qtype) {
        Ok(())
    } else {
        Err(ValidationErrorKind::BogusDenial { qname: question.qname.clone(), reason: "nsec-nodata-proof-failed" }.into())
    }
}

/// NXDOMAIN proof (RFC 4035 §5.4, RFC 5155 §8.4): resolve the signer
/// zone's keys, then prove `question.qname` does not exist via whichever
/// of NSEC/NSEC3 the response carries.
async fn validate_nxdomain(message: &mut SMessage, question: &Question, ctx: &ValidationContext<'_>) -> Result<()> {
    let signer = resolve_signer(message, ResponseKind::NxDomain)
        .ok_or_else(|| ValidationErrorKind::MissingRrsig { owner: question.qname.clone(), rtype: "NSEC" })?;

    let entry = ensure_trust_chain(&signer, question.qclass, ctx).await?;
    let dnskeys = match entry.state() {
        KeyEntryState::TrustedKeySet { dnskeys } => dnskeys.clone(),
        KeyEntryState::NullInsecureDelegation => return Ok(()),
        KeyEntryState::Bad { .. } => return Err(ValidationErrorKind::CachedBad { zone: signer }.into()),
    };
    let now = wire_now(ctx.config);

    let nsec3_idxs: Vec<usize> = message.authority.iter().enumerate().filter(|(_, r)| r.record_type() == RecordType::NSEC3).map(|(i, _)| i).collect();
    if !nsec3_idxs.is_empty() {
        for &i in &nsec3_idxs {
            verify_rrset(&mut message.authority[i], &signer, &dnskeys, now, ctx.backend.as_ref())?;
        }
        let records = nsec3::collect(&message.authority);
        let params = nsec3::Nsec3Params::from_records(&records)
            .ok_or_else(|| ValidationErrorKind::BogusDenial { qname: question.qname.clone(), reason: "missing-nsec3-params" })?;
        if nsec3::iterations_exceed_cap(&params, &dnskeys, ctx.config) {
            return Ok(());
        }
        return if nsec3::proves_nxdomain(&records, &question.qname, &params, ctx.backend.as_ref())? {
            Ok(())
        } else {
            Err(ValidationErrorKind::BogusDenial { qname: question.qname.clone(), reason: "nsec3-nxdomain-proof-failed" }.into())
        };
    }

    let nsec_idxs: Vec<usize> = message.authority.iter().enumerate().filter(|(_, r)| r.record_type() == RecordType::NSEC).map(|(i, _)| i).collect();
    if nsec_idxs.is_empty() {
        return Err(ValidationErrorKind::MissingRrsig { owner: question.qname.clone(), rtype: "NSEC" }.into());
    }
    for &i in &nsec_idxs {
        verify_rrset(&mut message.authority[i], &signer, &dnskeys, now, ctx.backend.as_ref())?;
    }
    let records = nsec::collect(&message.authority);
    if nsec::proves_nxdomain(&records, &question.qname, &signer) {
        Ok(())
    } else {
        Err(ValidationErrorKind::BogusDenial { qname: question.qname.clone(), reason: "nsec-nxdomain-proof-failed" }.into())
    }
}

#[cfg(test)]
#[cfg(feature = "ring")]
mod tests {
    use super::*;
    use crate::cache::KeyCache;
    use crate::config::ValidatorConfig;
    use crate::crypto::{Algorithm, RingCryptoBackend};
    use crate::rr::Class;
    use crate::rr::rdata::{PublicKeyBuf, RRSIG, DNSKEY, NSEC};
    use crate::rr::rdata::TypeBitMap;
    use crate::rr::{RData, RRset, Record};
    use crate::trust_anchor::{TrustAnchor, TrustAnchorSet};
    use crate::upstream::{Upstream, UpstreamError};
    use async_trait::async_trait;
    use ring::rand::SystemRandom;
    use ring::signature::{Ed25519KeyPair, KeyPair};
    use std::sync::Mutex;

    fn name(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    fn sign(owner: &str, data: RData, key_pair: &Ed25519KeyPair, zone: &str, labels: u8) -> RRset {
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

    struct ScriptedUpstream {
        responses: Mutex<Vec<SMessage>>,
    }

    #[async_trait]
    impl Upstream for ScriptedUpstream {
        async fn send(&self, _query: &Question) -> std::result::Result<SMessage, UpstreamError> {
            let mut responses = self.responses.lock().unwrap();
            Ok(responses.remove(0))
        }
    }

    #[tokio::test]
    async fn positive_answer_under_a_trust_anchor_becomes_secure() {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        let dnskey = DNSKEY::new(257, PublicKeyBuf::new(key_pair.public_key().as_ref().to_vec(), Algorithm::ED25519));

        let mut anchors = TrustAnchorSet::new();
        anchors.insert(TrustAnchor::DnsKey { zone: name("example.com."), dnskey });

        let question = Question { qname: name("www.example.com."), qclass: Class::IN, qtype: RecordType::A };
        let mut response = SMessage::new(question.clone(), Rcode::NoError);
        response.answer.push(sign("www.example.com.", RData::Opaque(vec![192, 0, 2, 1]), &key_pair, "example.com.", 3));

        let cache = KeyCache::new(16);
        let config = ValidatorConfig::default();
        let backend = RingCryptoBackend;
        let upstream = ScriptedUpstream { responses: Mutex::new(vec![response]) };
        let ctx = ValidationContext { cache: &cache, anchors: &anchors, upstream: std::sync::Arc::new(upstream), config: &config, backend: std::sync::Arc::new(backend) };

        let result = validate(question, &ctx).await;
        assert!(result.flags.ad);
        assert_eq!(result.rcode, Rcode::NoError);
    }

    #[tokio::test]
    async fn bogus_answer_synthesizes_servfail_with_no_sections() {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        let dnskey = DNSKEY::new(257, PublicKeyBuf::new(key_pair.public_key().as_ref().to_vec(), Algorithm::ED25519));

        let mut anchors = TrustAnchorSet::new();
        anchors.insert(TrustAnchor::DnsKey { zone: name("example.com."), dnskey });

        let question = Question { qname: name("www.example.com."), qclass: Class::IN, qtype: RecordType::A };
        let mut response = SMessage::new(question.clone(), Rcode::NoError);
        // Signed by a zone the trust chain will never vouch for.
        response.answer.push(sign("www.example.com.", RData::Opaque(vec![192, 0, 2, 1]), &key_pair, "attacker.example.", 3));

        let cache = KeyCache::new(16);
        let config = ValidatorConfig::default();
        let backend = RingCryptoBackend;
        let upstream = ScriptedUpstream { responses: Mutex::new(vec![response]) };
        let ctx = ValidationContext { cache: &cache, anchors: &anchors, upstream: std::sync::Arc::new(upstream), config: &config, backend: std::sync::Arc::new(backend) };

        let result = validate(question, &ctx).await;
        assert_eq!(result.rcode, Rcode::ServFail);
        assert!(result.answer.is_empty());
        assert!(!result.flags.ad);
    }

    #[tokio::test]
    async fn checking_disabled_passes_through_unvalidated() {
        let anchors = TrustAnchorSet::new();
        let question = Question { qname: name("www.example.com."), qclass: Class::IN, qtype: RecordType::A };
        let mut response = SMessage::new(question.clone(), Rcode::NoError);
        response.flags.cd = true;
        response.answer.push(RRset::from_records(vec![Record::new(name("www.example.com."), Class::IN, 300, RData::Opaque(vec![1]))]).unwrap());

        let cache = KeyCache::new(16);
        let config = ValidatorConfig::default();
        let backend = RingCryptoBackend;
        let upstream = ScriptedUpstream { responses: Mutex::new(vec![response]) };
        let ctx = ValidationContext { cache: &cache, anchors: &anchors, upstream: std::sync::Arc::new(upstream), config: &config, backend: std::sync::Arc::new(backend) };

        let result = validate(question, &ctx).await;
        assert!(result.flags.cd);
        assert_eq!(result.answer.len(), 1);
    }

    #[tokio::test]
    async fn nxdomain_via_nsec_is_secure() {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        let dnskey = DNSKEY::new(257, PublicKeyBuf::new(key_pair.public_key().as_ref().to_vec(), Algorithm::ED25519));

        let mut anchors = TrustAnchorSet::new();
        anchors.insert(TrustAnchor::DnsKey { zone: name("example.com."), dnskey });

        let question = Question { qname: name("missing.example.com."), qclass: Class::IN, qtype: RecordType::A };
        let mut response = SMessage::new(question.clone(), Rcode::NxDomain);
        let nsec_apex = NSEC::new(name("a.example.com."), TypeBitMap::from_types(vec![RecordType::SOA, RecordType::NS]));
        let nsec_cover = NSEC::new(name("z.example.com."), TypeBitMap::from_types(vec![RecordType::A]));
        response.authority.push(sign("example.com.", RData::NSEC(nsec_apex), &key_pair, "example.com.", 2));
        response.authority.push(sign("b.example.com.", RData::NSEC(nsec_cover), &key_pair, "example.com.", 2));

        let cache = KeyCache::new(16);
        let config = ValidatorConfig::default();
        let backend = RingCryptoBackend;
        let upstream = ScriptedUpstream { responses: Mutex::new(vec![response]) };
        let ctx = ValidationContext { cache: &cache, anchors: &anchors, upstream: std::sync::Arc::new(upstream), config: &config, backend: std::sync::Arc::new(backend) };

        let result = validate(question, &ctx).await;
        assert_eq!(result.rcode, Rcode::NxDomain);
        assert!(result.flags.ad);
    }
}
