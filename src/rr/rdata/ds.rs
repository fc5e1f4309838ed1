// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! [RFC 4034 §5](https://www.rfc-editor.org/rfc/rfc4034#section-5), the
//! Delegation Signer resource record.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::crypto::{Algorithm, CryptoBackend, DigestType};
use crate::error::Result;
use crate::name::Name;

use super::DNSKEY;

/// A Delegation Signer record: a parent-side pointer to a child zone's
/// key-signing key, identified by key tag, algorithm, and a digest of the
/// referenced DNSKEY's RDATA.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DS {
    key_tag: u16,
    algorithm: Algorithm,
    digest_type: DigestType,
    digest: Vec<u8>,
}

impl DS {
    pub fn new(key_tag: u16, algorithm: Algorithm, digest_type: DigestType, digest: Vec<u8>) -> Self {
        Self { key_tag, algorithm, digest_type, digest }
    }

    pub fn key_tag(&self) -> u16 {
        self.key_tag
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn digest_type(&self) -> DigestType {
        self.digest_type
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// RFC 4033 §3.1 / RFC 4035 §5.2: does `candidate` match this DS? Key
    /// tag and algorithm must agree before the (comparatively expensive)
    /// digest is recomputed and compared.
    pub fn matches(
        &self,
        owner: &Name,
        candidate: &DNSKEY,
        backend: &dyn CryptoBackend,
    ) -> Result<bool> {
        if candidate.calculate_key_tag() != self.key_tag || candidate.algorithm() != self.algorithm {
            return Ok(false);
        }
        let digest = candidate.to_digest(owner, self.digest_type, backend)?;
        Ok(digest == self.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::rdata::PublicKeyBuf;

    #[test]
    fn mismatched_key_tag_short_circuits_before_digesting() {
        let ds = DS::new(12345, Algorithm::RSASHA256, DigestType::SHA256, vec![0xAA; 32]);
        let dnskey = DNSKEY::new(257, PublicKeyBuf::new(vec![1, 2, 3], Algorithm::RSASHA256));
        #[cfg(feature = "ring")]
        {
            let backend = crate::crypto::RingCryptoBackend;
            let owner = Name::parse("example.com.").unwrap();
            assert!(!ds.matches(&owner, &dnskey, &backend).unwrap());
        }
    }

    #[cfg(feature = "ring")]
    #[test]
    fn digest_mismatch_is_rejected_even_with_matching_tag_and_algorithm() {
        let backend = crate::crypto::RingCryptoBackend;
        let owner = Name::parse("example.com.").unwrap();
        let dnskey = DNSKEY::new(257, PublicKeyBuf::new(vec![1, 2, 3], Algorithm::RSASHA256));
        let ds = DS::new(dnskey.calculate_key_tag(), Algorithm::RSASHA256, DigestType::SHA256, vec![0; 32]);
        assert!(!ds.matches(&owner, &dnskey, &backend).unwrap());
    }

    #[cfg(feature = "ring")]
    #[test]
    fn correct_digest_matches() {
        let backend = crate::crypto::RingCryptoBackend;
        let owner = Name::parse("example.com.").unwrap();
        let dnskey = DNSKEY::new(257, PublicKeyBuf::new(vec![1, 2, 3], Algorithm::RSASHA256));
        let digest = dnskey.to_digest(&owner, DigestType::SHA256, &backend).unwrap();
        let ds = DS::new(dnskey.calculate_key_tag(), Algorithm::RSASHA256, DigestType::SHA256, digest);
        assert!(ds.matches(&owner, &dnskey, &backend).unwrap());
    }
}
