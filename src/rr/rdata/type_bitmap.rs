// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The NSEC/NSEC3 "Type Bit Maps" field, RFC 4034 §4.1.2.
//!
//! ```text
//! The RR type space is split into 256-value windows. Each window is
//! encoded as: a one-octet window number, a one-octet bitmap length (1-32),
//! then that many octets of bitmap, MSB = lowest type number in the window.
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::rr::RecordType;

/// A parsed/constructed type bitmap: the set of record types a NSEC/NSEC3
/// owner asserts do (or do not) exist at that name.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeBitMap {
    // Sorted, de-duplicated type codes; small enough that a Vec beats a
    // BTreeSet in practice for this crate's sizes (a handful of types).
    types: Vec<u16>,
}

impl TypeBitMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_types(mut types: Vec<RecordType>) -> Self {
        types.sort_by_key(|t| t.to_u16());
        let mut codes: Vec<u16> = types.into_iter().map(|t| t.to_u16()).collect();
        codes.dedup();
        Self { types: codes }
    }

    pub fn contains(&self, rtype: RecordType) -> bool {
        self.types.binary_search(&rtype.to_u16()).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = RecordType> + '_ {
        self.types.iter().map(|&c| RecordType::from_u16(c))
    }

    /// Decode the RFC 4034 §4.1.2 windowed bitmap wire format.
    pub fn from_wire(mut data: &[u8]) -> Result<Self, &'static str> {
        let mut types = Vec::new();
        while !data.is_empty() {
            if data.len() < 2 {
                return Err("truncated type bitmap window header");
            }
            let window = data[0] as u16;
            let len = data[1] as usize;
            if len == 0 || len > 32 {
                return Err("invalid type bitmap window length");
            }
            if data.len() < 2 + len {
                return Err("truncated type bitmap window body");
            }
            let bitmap = &data[2..2 + len];
            for (byte_idx, byte) in bitmap.iter().enumerate() {
                for bit in 0..8 {
                    if byte & (0x80 >> bit) != 0 {
                        let type_code = window * 256 + (byte_idx as u16 * 8 + bit as u16);
                        types.push(type_code);
                    }
                }
            }
            data = &data[2 + len..];
        }
        types.sort_unstable();
        Ok(Self { types })
    }

    /// Encode back to the RFC 4034 §4.1.2 windowed bitmap wire format.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut iter = self.types.iter().peekable();
        while let Some(&first) = iter.peek() {
            let window = first / 256;
            let mut bitmap = [0u8; 32];
            let mut max_byte = 0usize;
            while let Some(&code) = iter.peek() {
                if code / 256 != window {
                    break;
                }
                iter.next();
                let offset = (code % 256) as usize;
                let byte_idx = offset / 8;
                bitmap[byte_idx] |= 0x80 >> (offset % 8);
                max_byte = max_byte.max(byte_idx + 1);
            }
            out.push(window as u8);
            out.push(max_byte as u8);
            out.extend_from_slice(&bitmap[..max_byte]);
        }
        out
    }
}

impl FromIterator<RecordType> for TypeBitMap {
    fn from_iter<I: IntoIterator<Item = RecordType>>(iter: I) -> Self {
        Self::from_types(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_roundtrip_simple_set() {
        let bitmap = TypeBitMap::from_types(vec![
            RecordType::A,
            RecordType::RRSIG,
            RecordType::NSEC,
            RecordType::DNSKEY,
        ]);
        let wire = bitmap.to_wire();
        let decoded = TypeBitMap::from_wire(&wire).unwrap();
        assert_eq!(bitmap, decoded);
        assert!(decoded.contains(RecordType::A));
        assert!(decoded.contains(RecordType::RRSIG));
        assert!(!decoded.contains(RecordType::AAAA));
    }

    #[test]
    fn wire_roundtrip_spans_multiple_windows() {
        // NSEC3PARAM (51) is in window 0; a synthetic type 300 lands in window 1.
        let bitmap = TypeBitMap::from_types(vec![RecordType::NSEC3PARAM, RecordType::Unknown(300)]);
        let wire = bitmap.to_wire();
        let decoded = TypeBitMap::from_wire(&wire).unwrap();
        assert!(decoded.contains(RecordType::NSEC3PARAM));
        assert!(decoded.contains(RecordType::Unknown(300)));
    }

    #[test]
    fn rfc4035_example_excludes_ds_and_soa_for_child_side() {
        // An insecure-delegation NSEC at the child side of a zone cut has
        // NS but lacks SOA and DS in its bitmap (RFC 4035 section 5.2).
        let bitmap = TypeBitMap::from_types(vec![RecordType::NS, RecordType::RRSIG, RecordType::NSEC]);
        assert!(bitmap.contains(RecordType::NS));
        assert!(!bitmap.contains(RecordType::SOA));
        assert!(!bitmap.contains(RecordType::DS));
    }
}
