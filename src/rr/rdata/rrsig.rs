// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! [RFC 4034 §3](https://www.rfc-editor.org/rfc/rfc4034#section-3), the
//! RRSIG resource record.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::crypto::Algorithm;
use crate::name::Name;
use crate::rr::record::RecordType;

/// A signature over an RRset, RFC 4034 §3.1. Inception and expiration are
/// kept as the raw 32-bit wire values; comparisons against "now" use RFC
/// 4034 §3.1.5 serial-number arithmetic rather than a plain `<`/`>`, since
/// the field can wrap.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RRSIG {
    type_covered: RecordType,
    algorithm: Algorithm,
    labels: u8,
    original_ttl: u32,
    expiration: u32,
    inception: u32,
    key_tag: u16,
    signer_name: Name,
    signature: Vec<u8>,
}

impl RRSIG {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        type_covered: RecordType,
        algorithm: Algorithm,
        labels: u8,
        original_ttl: u32,
        expiration: u32,
        inception: u32,
        key_tag: u16,
        signer_name: Name,
        signature: Vec<u8>,
    ) -> Self {
        Self {
            type_covered,
            algorithm,
            labels,
            original_ttl,
            expiration,
            inception,
            key_tag,
            signer_name,
            signature,
        }
    }

    pub fn type_covered(&self) -> RecordType {
        self.type_covered
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn labels(&self) -> u8 {
        self.labels
    }

    pub fn original_ttl(&self) -> u32 {
        self.original_ttl
    }

    pub fn expiration(&self) -> u32 {
        self.expiration
    }

    pub fn inception(&self) -> u32 {
        self.inception
    }

    pub fn key_tag(&self) -> u16 {
        self.key_tag
    }

    pub fn signer_name(&self) -> &Name {
        &self.signer_name
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// RFC 4034 §3.1.5: is `now` (wire seconds-since-epoch) within
    /// `[inception, expiration]`, treating both bounds with
    /// serial-number arithmetic so a field that has wrapped around
    /// 2^32 is still compared correctly? Both boundaries are inclusive:
    /// `now == inception` is valid, `now == expiration` is not (the
    /// window has already closed).
    pub fn is_time_valid(&self, now: u32) -> bool {
        !serial_less_than(now, self.inception) && serial_less_than(now, self.expiration)
    }

    /// RFC 4034 §3.1.8.1 / §6.2: the RRSIG RDATA fields preceding the
    /// signature, with the signer name lowercased -- the fixed prefix of
    /// the signed data, before the canonicalized RRset itself.
    pub(crate) fn rdata_prefix(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.type_covered.to_u16().to_be_bytes());
        buf.push(self.algorithm.to_u8());
        buf.push(self.labels);
        buf.extend_from_slice(&self.original_ttl.to_be_bytes());
        buf.extend_from_slice(&self.expiration.to_be_bytes());
        buf.extend_from_slice(&self.inception.to_be_bytes());
        buf.extend_from_slice(&self.key_tag.to_be_bytes());
        buf.extend(self.signer_name.to_lowercase_wire());
        buf
    }
}

/// RFC 1982 serial number arithmetic: `a` is "less than" `b` if the
/// signed 32-bit difference `a - b` is negative. Used because RRSIG
/// inception/expiration are unsigned 32-bit wire fields that can wrap.
fn serial_less_than(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}
