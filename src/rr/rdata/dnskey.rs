// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! [RFC 4034 §2](https://www.rfc-editor.org/rfc/rfc4034#section-2), the
//! DNSKEY resource record.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::crypto::{Algorithm, CryptoBackend, DigestType, PublicKeyBuf};
use crate::error::Result;
use crate::name::Name;

/// A public key record used to verify RRSIGs in a zone.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DNSKEY {
    flags: u16,
    public_key: PublicKeyBuf,
}

impl DNSKEY {
    /// Build a DNSKEY from an explicit flags value (the wire value,
    /// including bits 0-14 reserved-must-be-zero) and key material. The
    /// Protocol field is always 3 and is not stored.
    pub fn new(flags: u16, public_key: PublicKeyBuf) -> Self {
        Self { flags, public_key }
    }

    /// RFC 4034 §2.1.1: bit 7 ("Zone Key"). Must be set for the key to be
    /// eligible to verify RRSIGs over RRsets.
    pub fn zone_key(&self) -> bool {
        self.flags & 0b0000_0001_0000_0000 != 0
    }

    /// RFC 4034 §2.1.1 / RFC 3757: bit 15 ("Secure Entry Point"), a hint
    /// only -- validators MUST NOT change behavior based on it.
    pub fn secure_entry_point(&self) -> bool {
        self.flags & 0b0000_0000_0000_0001 != 0
    }

    /// RFC 5011 §7: bit 8 ("REVOKE").
    pub fn revoked(&self) -> bool {
        self.flags & 0b0000_0000_1000_0000 != 0
    }

    /// `true` for the conventional KSK flags value of 257.
    pub fn is_key_signing_key(&self) -> bool {
        self.secure_entry_point() && self.zone_key() && !self.revoked()
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn algorithm(&self) -> Algorithm {
        self.public_key.algorithm()
    }

    pub fn public_key(&self) -> &PublicKeyBuf {
        &self.public_key
    }

    /// The wire bytes of this DNSKEY's RDATA (flags ‖ protocol=3 ‖ algorithm
    /// ‖ public key), as needed for key-tag computation, DS digesting, and
    /// RRSIG signed-data canonicalization (RFC 4034 §6.2).
    pub(crate) fn rdata_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.public_key.public_bytes().len());
        buf.extend_from_slice(&self.flags.to_be_bytes());
        buf.push(3);
        buf.push(self.public_key.algorithm().to_u8());
        buf.extend_from_slice(self.public_key.public_bytes());
        buf
    }

    /// RFC 4034 Appendix B: the key tag, a 16-bit checksum used to
    /// narrow down candidate DNSKEYs before attempting verification.
    pub fn calculate_key_tag(&self) -> u16 {
        Self::calculate_key_tag_from_wire(&self.rdata_wire())
    }

    fn calculate_key_tag_from_wire(bytes: &[u8]) -> u16 {
        let mut ac: u32 = 0;
        for (i, &b) in bytes.iter().enumerate() {
            ac += u32::from(b) << if i & 1 != 0 { 0 } else { 8 };
        }
        ac += ac >> 16;
        (ac & 0xFFFF) as u16
    }

    /// RFC 4034 §5.1.4: the DS digest over `digest_algorithm(owner name ‖
    /// DNSKEY RDATA)`. The owner name is lowercased and uncompressed per
    /// the canonical form rules (RFC 4034 §6.2).
    pub fn to_digest(
        &self,
        owner: &Name,
        digest_type: DigestType,
        backend: &dyn CryptoBackend,
    ) -> Result<Vec<u8>> {
        let mut buf = owner.to_lowercase_wire();
        buf.extend(self.rdata_wire());
        Ok(backend.digest(digest_type, &buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_decoding() {
        let ksk = DNSKEY::new(257, PublicKeyBuf::new(vec![1, 2, 3], Algorithm::RSASHA256));
        assert!(ksk.is_key_signing_key());
        assert!(ksk.zone_key());
        assert!(ksk.secure_entry_point());

        let zsk = DNSKEY::new(256, PublicKeyBuf::new(vec![1, 2, 3], Algorithm::RSASHA256));
        assert!(!zsk.is_key_signing_key());
        assert!(zsk.zone_key());
        assert!(!zsk.secure_entry_point());
    }

    #[test]
    fn key_tag_checksum_vectors() {
        // Test vectors mirror the canonical RFC 2535 Appendix C reference
        // checksum, applied here to raw RDATA-shaped byte strings.
        let vectors: &[(&[u8], u16)] = &[
            (&[], 0),
            (&[0, 0, 0, 0], 0),
            (&[0xff, 0xff, 0xff, 0xff], 0xffff),
            (&[1, 0, 0, 0], 0x0100),
            (&[0, 1, 0, 0], 0x0001),
            (&[0, 0, 1, 0], 0x0100),
        ];
        for &(input, expected) in vectors {
            assert_eq!(DNSKEY::calculate_key_tag_from_wire(input), expected);
        }
    }

    #[cfg(feature = "ring")]
    #[test]
    fn digest_uses_lowercased_owner() {
        use crate::crypto::RingCryptoBackend;

        let key = DNSKEY::new(257, PublicKeyBuf::new(vec![9, 9, 9], Algorithm::RSASHA256));
        let backend = RingCryptoBackend;
        let lower = key
            .to_digest(&Name::parse("example.com.").unwrap(), DigestType::SHA256, &backend)
            .unwrap();
        let upper = key
            .to_digest(&Name::parse("EXAMPLE.COM.").unwrap(), DigestType::SHA256, &backend)
            .unwrap();
        assert_eq!(lower, upper);
    }
}
