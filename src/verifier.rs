// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! RRset Verifier: verifies a single signed RRset against a
//! candidate DNSKEY set by selecting matching RRSIGs, canonicalizing the
//! RRset per RFC 4034 §6, and invoking the cryptographic backend.

use tracing::{debug, trace, warn};

use crate::crypto::CryptoBackend;
use crate::error::{Result, ValidationErrorKind};
use crate::name::Name;
use crate::rr::rdata::DNSKEY;
use crate::rr::RRset;
use crate::status::SecurityStatus;

/// Candidate DNSKEYs eligible to verify an RRSIG with the given algorithm
/// and key tag: the ZONE flag must be set (RFC 4034 §2.1.1), and the
/// DNSKEY's own key tag and algorithm must match the RRSIG.
fn candidate_keys<'a>(dnskeys: &'a [DNSKEY], algorithm: crate::crypto::Algorithm, key_tag: u16) -> impl Iterator<Item = &'a DNSKEY> {
    dnskeys
        .iter()
        .filter(move |k| k.zone_key() && k.algorithm() == algorithm && k.calculate_key_tag() == key_tag)
}

/// Verify `rrset` against `dnskeys` (the candidate key set owned by
/// `zone`), at time `now` (wire seconds-since-epoch). On success, raises
/// `rrset`'s status to SECURE and returns `Ok(())`. On failure, raises it
/// to BOGUS and returns the reason as an `Err`.
pub fn verify_rrset(rrset: &mut RRset, zone: &Name, dnskeys: &[DNSKEY], now: u32, backend: &dyn CryptoBackend) -> Result<()> {
    if rrset.rrsigs().is_empty() {
        warn!(owner = %rrset.name(), rtype = %rrset.record_type(), "no RRSIG present");
        rrset.set_status(SecurityStatus::Bogus);
        return Err(ValidationErrorKind::MissingRrsig {
            owner: rrset.name().clone(),
            rtype: rrset.record_type().mnemonic(),
        }
        .into());
    }

    for rrsig in rrset.rrsigs() {
        if rrsig.signer_name() != zone {
            trace!(rrsig_signer = %rrsig.signer_name(), expected = %zone, "signer mismatch, skipping RRSIG");
            continue;
        }
        if rrsig.type_covered() != rrset.record_type() {
            trace!(type_covered = %rrsig.type_covered(), rtype = %rrset.record_type(), "type-covered mismatch");
            continue;
        }
        if !rrsig.algorithm().is_supported() {
            trace!(algorithm = %rrsig.algorithm(), "unsupported algorithm");
            continue;
        }
        if !rrsig.is_time_valid(now) {
            trace!(inception = rrsig.inception(), expiration = rrsig.expiration(), now, "RRSIG outside validity window");
            continue;
        }

        let signed_data = rrset.signed_data(rrsig);
        for key in candidate_keys(dnskeys, rrsig.algorithm(), rrsig.key_tag()) {
            match backend.verify(rrsig.algorithm(), key.public_key(), &signed_data, rrsig.signature()) {
                Ok(()) => {
                    debug!(owner = %rrset.name(), rtype = %rrset.record_type(), zone = %zone, "RRSIG verified");
                    rrset.set_status(SecurityStatus::Secure);
                    return Ok(());
                }
                Err(err) => {
                    trace!(owner = %rrset.name(), key_tag = rrsig.key_tag(), %err, "candidate key failed to verify");
                }
            }
        }
    }

    warn!(owner = %rrset.name(), rtype = %rrset.record_type(), zone = %zone, "no RRSIG verified under any candidate key");
    rrset.set_status(SecurityStatus::Bogus);
    Err(ValidationErrorKind::BogusSignature {
        owner: rrset.name().clone(),
        rtype: rrset.record_type().mnemonic(),
        signer: zone.clone(),
    }
    .into())
}

#[cfg(test)]
#[cfg(feature = "ring")]
mod tests {
    use super::*;
    use crate::crypto::{Algorithm, RingCryptoBackend};
    use crate::rr::rdata::{PublicKeyBuf, RRSIG};
    use crate::rr::{Class, RData, Record};
    use ring::rand::SystemRandom;
    use ring::signature::{Ed25519KeyPair, KeyPair};

    fn name(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    fn signed_a_rrset(zone: &str, owner: &str, key_pair: &Ed25519KeyPair, key_tag: u16) -> (RRset, DNSKEY) {
        let record = Record::new(name(owner), Class::IN, 300, RData::Opaque(vec![192, 0, 2, 1]));
        let mut rrset = RRset::from_records(vec![record]).unwrap();

        let dnskey = DNSKEY::new(257, PublicKeyBuf::new(key_pair.public_key().as_ref().to_vec(), Algorithm::ED25519));
        let mut rrsig = RRSIG::new(
            opaque_record_type(),
            Algorithm::ED25519,
            owner.trim_end_matches('.').split('.').count() as u8,
            300,
            2_000_000_000,
            1_000_000_000,
            key_tag,
            name(zone),
            vec![],
        );
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
        (rrset, dnskey)
    }

    fn opaque_record_type() -> crate::rr::RecordType {
        crate::rr::RecordType::Unknown(0)
    }

    #[test]
    fn verifies_under_matching_key_and_rejects_tampered_signature() {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        let dnskey_for_tag = DNSKEY::new(257, PublicKeyBuf::new(key_pair.public_key().as_ref().to_vec(), Algorithm::ED25519));
        let key_tag = dnskey_for_tag.calculate_key_tag();

        let (mut rrset, dnskey) = signed_a_rrset("example.com.", "www.example.com.", &key_pair, key_tag);
        let backend = RingCryptoBackend;

        let result = verify_rrset(&mut rrset, &name("example.com."), std::slice::from_ref(&dnskey), 1_500_000_000, &backend);
        assert!(result.is_ok());
        assert_eq!(rrset.status(), SecurityStatus::Secure);
    }

    #[test]
    fn expired_signature_is_bogus() {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        let dnskey_for_tag = DNSKEY::new(257, PublicKeyBuf::new(key_pair.public_key().as_ref().to_vec(), Algorithm::ED25519));
        let key_tag = dnskey_for_tag.calculate_key_tag();

        let (mut rrset, dnskey) = signed_a_rrset("example.com.", "www.example.com.", &key_pair, key_tag);
        let backend = RingCryptoBackend;

        // now == expiration (2_000_000_000) must be rejected (boundary).
        let result = verify_rrset(&mut rrset, &name("example.com."), std::slice::from_ref(&dnskey), 2_000_000_000, &backend);
        assert!(result.is_err());
        assert_eq!(rrset.status(), SecurityStatus::Bogus);
    }
}
