// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Resource record, record-type, and RRset types.
//!
//! Wire encoding/decoding of these types is left to an external
//! collaborator: this module defines the data the validation engine
//! operates on, however it was obtained, and keeps types this crate does
//! not need to interpret (A, AAAA, MX, TXT, ...) as opaque rdata bytes.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::rdata::{DNSKEY, DS, NSEC, NSEC3, NSEC3PARAM, RRSIG};
use crate::name::Name;

/// DNS record class. Only `IN` is exercised by this crate; others are kept
/// so a decoder upstream of this crate can still round-trip them.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    IN,
    CH,
    HS,
    Unknown(u16),
}

impl From<u16> for Class {
    fn from(v: u16) -> Self {
        match v {
            1 => Self::IN,
            3 => Self::CH,
            4 => Self::HS,
            other => Self::Unknown(other),
        }
    }
}

impl From<Class> for u16 {
    fn from(c: Class) -> Self {
        match c {
            Class::IN => 1,
            Class::CH => 3,
            Class::HS => 4,
            Class::Unknown(v) => v,
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IN => write!(f, "IN"),
            Self::CH => write!(f, "CH"),
            Self::HS => write!(f, "HS"),
            Self::Unknown(v) => write!(f, "CLASS{v}"),
        }
    }
}

/// DNS record type. The DNSSEC-relevant types, plus the handful of
/// structural types the validator must recognize (NS/SOA/CNAME for
/// delegation and NODATA bitmap checks), are named explicitly; everything
/// else is `Unknown`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    AAAA,
    NS,
    CNAME,
    SOA,
    MX,
    TXT,
    DS,
    DNSKEY,
    RRSIG,
    NSEC,
    NSEC3,
    NSEC3PARAM,
    DNAME,
    /// Meta-type used only in questions.
    ANY,
    Unknown(u16),
}

impl RecordType {
    /// The wire-format type code (RFC 1035 / RFC 4034 / RFC 5155).
    pub fn to_u16(self) -> u16 {
        match self {
            Self::A => 1,
            Self::NS => 2,
            Self::CNAME => 5,
            Self::SOA => 6,
            Self::MX => 15,
            Self::TXT => 16,
            Self::AAAA => 28,
            Self::DNAME => 39,
            Self::DS => 43,
            Self::RRSIG => 46,
            Self::NSEC => 47,
            Self::DNSKEY => 48,
            Self::NSEC3 => 50,
            Self::NSEC3PARAM => 51,
            Self::ANY => 255,
            Self::Unknown(v) => v,
        }
    }

    /// Parse from a wire-format type code.
    pub fn from_u16(v: u16) -> Self {
        match v {
            1 => Self::A,
            2 => Self::NS,
            5 => Self::CNAME,
            6 => Self::SOA,
            15 => Self::MX,
            16 => Self::TXT,
            28 => Self::AAAA,
            39 => Self::DNAME,
            43 => Self::DS,
            46 => Self::RRSIG,
            47 => Self::NSEC,
            48 => Self::DNSKEY,
            50 => Self::NSEC3,
            51 => Self::NSEC3PARAM,
            255 => Self::ANY,
            other => Self::Unknown(other),
        }
    }

    /// Short mnemonic, used in error messages and logs.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::NS => "NS",
            Self::CNAME => "CNAME",
            Self::SOA => "SOA",
            Self::MX => "MX",
            Self::TXT => "TXT",
            Self::DS => "DS",
            Self::DNSKEY => "DNSKEY",
            Self::RRSIG => "RRSIG",
            Self::NSEC => "NSEC",
            Self::NSEC3 => "NSEC3",
            Self::NSEC3PARAM => "NSEC3PARAM",
            Self::DNAME => "DNAME",
            Self::ANY => "ANY",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(v) => write!(f, "TYPE{v}"),
            other => f.write_str(other.mnemonic()),
        }
    }
}

/// Record data. DNSSEC-relevant and structurally-relevant types are parsed;
/// everything the validator treats opaquely is kept as raw rdata bytes
/// alongside its type, so an RRset of an uninterpreted type can still be
/// canonicalized -- RRset verification needs only the bytes, not their
/// meaning.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    CNAME(Name),
    NS(Name),
    DNAME(Name),
    SOA { mname: Name, rname: Name, serial: u32, refresh: u32, retry: u32, expire: u32, minimum: u32 },
    DNSKEY(DNSKEY),
    DS(DS),
    RRSIG(RRSIG),
    NSEC(NSEC),
    NSEC3(NSEC3),
    NSEC3PARAM(NSEC3PARAM),
    /// Any record type this crate does not interpret structurally (A,
    /// AAAA, MX, TXT, ...): kept as raw rdata bytes for canonicalization.
    Opaque(Vec<u8>),
}

impl RData {
    /// The record type this rdata represents the data for.
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::CNAME(_) => RecordType::CNAME,
            Self::NS(_) => RecordType::NS,
            Self::DNAME(_) => RecordType::DNAME,
            Self::SOA { .. } => RecordType::SOA,
            Self::DNSKEY(_) => RecordType::DNSKEY,
            Self::DS(_) => RecordType::DS,
            Self::RRSIG(_) => RecordType::RRSIG,
            Self::NSEC(_) => RecordType::NSEC,
            Self::NSEC3(_) => RecordType::NSEC3,
            Self::NSEC3PARAM(_) => RecordType::NSEC3PARAM,
            Self::Opaque(_) => RecordType::Unknown(0),
        }
    }

    /// RFC 4034 §6.2: the RDATA in canonical wire form, used both to sort
    /// RRset members into canonical order and to build the signed data an
    /// RRSIG covers. Names embedded within RDATA are lowercased and
    /// uncompressed, matching how `Name::to_lowercase_wire` already
    /// represents them; this crate never compresses names, so "canonical
    /// form" and "wire form" coincide everywhere except case folding.
    pub(crate) fn to_canonical_wire(&self) -> Vec<u8> {
        match self {
            Self::CNAME(name) | Self::NS(name) | Self::DNAME(name) => name.to_lowercase_wire(),
            Self::SOA { mname, rname, serial, refresh, retry, expire, minimum } => {
                let mut buf = mname.to_lowercase_wire();
                buf.extend(rname.to_lowercase_wire());
                buf.extend_from_slice(&serial.to_be_bytes());
                buf.extend_from_slice(&refresh.to_be_bytes());
                buf.extend_from_slice(&retry.to_be_bytes());
                buf.extend_from_slice(&expire.to_be_bytes());
                buf.extend_from_slice(&minimum.to_be_bytes());
                buf
            }
            Self::DNSKEY(dnskey) => dnskey.rdata_wire(),
            Self::DS(ds) => {
                let mut buf = Vec::with_capacity(4 + ds.digest().len());
                buf.extend_from_slice(&ds.key_tag().to_be_bytes());
                buf.push(ds.algorithm().to_u8());
                buf.push(ds.digest_type().to_u8());
                buf.extend_from_slice(ds.digest());
                buf
            }
            Self::RRSIG(rrsig) => {
                let mut buf = rrsig.rdata_prefix();
                buf.extend_from_slice(rrsig.signature());
                buf
            }
            Self::NSEC(nsec) => {
                let mut buf = nsec.next_domain_name().to_lowercase_wire();
                buf.extend(nsec.type_bit_maps().to_wire());
                buf
            }
            Self::NSEC3(nsec3) => {
                let mut buf = Vec::new();
                buf.push(nsec3.hash_algorithm());
                buf.push(if nsec3.opt_out() { 0x01 } else { 0x00 });
                buf.extend_from_slice(&nsec3.iterations().to_be_bytes());
                buf.push(nsec3.salt().len() as u8);
                buf.extend_from_slice(nsec3.salt());
                buf.push(nsec3.next_hashed_owner_name().len() as u8);
                buf.extend_from_slice(nsec3.next_hashed_owner_name());
                buf.extend(nsec3.type_bit_maps().to_wire());
                buf
            }
            Self::NSEC3PARAM(param) => {
                let mut buf = Vec::new();
                buf.push(param.hash_algorithm());
                buf.push(0);
                buf.extend_from_slice(&param.iterations().to_be_bytes());
                buf.push(param.salt().len() as u8);
                buf.extend_from_slice(param.salt());
                buf
            }
            Self::Opaque(bytes) => bytes.clone(),
        }
    }
}

/// A single resource record: owner name, class, type, TTL and rdata.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: Name,
    pub class: Class,
    pub ttl: u32,
    pub data: RData,
}

impl Record {
    pub fn new(name: Name, class: Class, ttl: u32, data: RData) -> Self {
        Self { name, class, ttl, data }
    }

    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }
}

/// An RRset: all records sharing owner name, class, and type, plus any
/// RRSIGs attached to them. TTL is the minimum of member TTLs, enforced on
/// construction.
///
/// This is the unit of signing and of security labeling: a
/// [`SecurityStatus`](crate::status::SecurityStatus) is attached to the set
/// as a whole, not to individual records within it.
#[derive(Debug, Clone)]
pub struct RRset {
    name: Name,
    class: Class,
    rr_type: RecordType,
    ttl: u32,
    rdata: Vec<RData>,
    rrsigs: Vec<RRSIG>,
    status: crate::status::SecurityStatus,
}

/// Error building an RRset from records that do not share owner/class/type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RRsetError {
    #[error("RRset member owner/class/type mismatch")]
    Mismatch,
    #[error("RRset has no members")]
    Empty,
}

impl RRset {
    /// Build an RRset from one or more records that share owner/class/type.
    /// TTL is set to the minimum across all records, per RFC 2181 §5.2.
    pub fn from_records(records: Vec<Record>) -> Result<Self, RRsetError> {
        let first = records.first().ok_or(RRsetError::Empty)?;
        let name = first.name.clone();
        let class = first.class;
        let rr_type = first.record_type();
        let mut ttl = first.ttl;

        for r in &records {
            if r.name != name || r.class != class || r.record_type() != rr_type {
                return Err(RRsetError::Mismatch);
            }
            ttl = ttl.min(r.ttl);
        }

        Ok(Self {
            name,
            class,
            rr_type,
            ttl,
            rdata: records.into_iter().map(|r| r.data).collect(),
            rrsigs: Vec::new(),
            status: crate::status::SecurityStatus::Unchecked,
        })
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn class(&self) -> Class {
        self.class
    }

    pub fn record_type(&self) -> RecordType {
        self.rr_type
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn rdata(&self) -> &[RData] {
        &self.rdata
    }

    pub fn rrsigs(&self) -> &[RRSIG] {
        &self.rrsigs
    }

    /// Attach an RRSIG, after checking it plausibly covers this RRset
    /// (type-covered match; full validity is checked by the RRset
    /// verifier). The owner of the RRSIG record itself must equal this
    /// RRset's owner per RFC 4035 §2.2.
    pub fn add_rrsig(&mut self, rrsig: RRSIG) {
        self.rrsigs.push(rrsig);
    }

    /// Current security status of this RRset.
    pub fn status(&self) -> crate::status::SecurityStatus {
        self.status
    }

    /// Monotonically raise this RRset's status. Panics if `next` would
    /// violate the upgrade-only invariant -- a programming error in the
    /// validator, not a data error.
    pub fn set_status(&mut self, next: crate::status::SecurityStatus) {
        assert!(
            self.status.can_transition_to(next),
            "illegal SecurityStatus transition {} -> {next} for {} {}",
            self.status,
            self.name,
            self.rr_type
        );
        self.status = next;
    }

    /// Synthesize the ("original") owner name the RRSIG RDATA would have
    /// signed over, expanding `*.<suffix>` if `rrsig.labels()` is fewer than
    /// this RRset's owner's label count (RFC 4035 §5.3.2, wildcard case).
    pub fn signed_owner(&self, rrsig_labels: u8) -> Name {
        let owner_labels = self.name.label_count();
        if rrsig_labels < owner_labels {
            let suffix = self
                .name
                .ancestor_at_depth(rrsig_labels)
                .expect("rrsig_labels <= owner_labels checked by caller");
            suffix.prepend_wildcard()
        } else {
            self.name.clone()
        }
    }

    /// `true` if this RRset is wildcard-expanded relative to `rrsig`: its
    /// RRSIG label count is fewer than `owner labels - 1` (RFC 4035 §5.3.2 --
    /// the `- 1` excludes the root label from the count comparison used for
    /// detection).
    pub fn is_wildcard_expanded(&self, rrsig: &RRSIG) -> bool {
        rrsig.labels() < self.name.label_count().saturating_sub(1)
    }

    /// RFC 4034 §3.1.8.1 / §6: the full signed data for `rrsig` over this
    /// RRset -- the RRSIG RDATA prefix (signer name lowercased, no
    /// signature) followed by every member record in canonical form,
    /// sorted by canonical RDATA ordering, with the owner replaced by the
    /// wildcard-expanded name if `rrsig` indicates wildcard expansion and
    /// the original TTL taken from the RRSIG rather than the wire TTL.
    pub(crate) fn signed_data(&self, rrsig: &RRSIG) -> Vec<u8> {
        let owner = self.signed_owner(rrsig.labels());
        let owner_wire = owner.to_lowercase_wire();

        let mut rdata_wires: Vec<Vec<u8>> = self.rdata.iter().map(RData::to_canonical_wire).collect();
        rdata_wires.sort();

        let mut buf = rrsig.rdata_prefix();
        for rdata_wire in rdata_wires {
            buf.extend_from_slice(&owner_wire);
            buf.extend_from_slice(&self.rr_type.to_u16().to_be_bytes());
            buf.extend_from_slice(&u16::from(self.class).to_be_bytes());
            buf.extend_from_slice(&rrsig.original_ttl().to_be_bytes());
            buf.extend_from_slice(&(rdata_wire.len() as u16).to_be_bytes());
            buf.extend_from_slice(&rdata_wire);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::rdata::PublicKeyBuf;

    fn name(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    #[test]
    fn rrset_ttl_is_minimum_of_members() {
        let records = vec![
            Record::new(name("www.example.com."), Class::IN, 300, RData::Opaque(vec![1, 2, 3, 4])),
            Record::new(name("www.example.com."), Class::IN, 100, RData::Opaque(vec![5, 6, 7, 8])),
        ];
        // These carry the same (fake) record_type() == Unknown(0) so they're compatible.
        let set = RRset::from_records(records).unwrap();
        assert_eq!(set.ttl(), 100);
    }

    #[test]
    fn rrset_rejects_mismatched_owner() {
        let a = Record::new(name("www.example.com."), Class::IN, 300, RData::Opaque(vec![1]));
        let b = Record::new(name("other.example.com."), Class::IN, 300, RData::Opaque(vec![1]));
        assert_eq!(RRset::from_records(vec![a, b]).unwrap_err(), RRsetError::Mismatch);
    }

    #[test]
    fn rrset_rejects_mismatched_type() {
        let dnskey = DNSKEY::new(256, PublicKeyBuf::new(vec![1, 2, 3], crate::crypto::Algorithm::RSASHA256));
        let a = Record::new(name("example.com."), Class::IN, 300, RData::DNSKEY(dnskey));
        let b = Record::new(name("example.com."), Class::IN, 300, RData::Opaque(vec![1]));
        assert_eq!(RRset::from_records(vec![a, b]).unwrap_err(), RRsetError::Mismatch);
    }

    #[test]
    fn wildcard_detection() {
        use super::super::rdata::RRSIG;
        let owner = name("anything.wild.example.com."); // 4 labels
        let records = vec![Record::new(owner.clone(), Class::IN, 300, RData::Opaque(vec![1, 2, 3, 4]))];
        let set = RRset::from_records(records).unwrap();
        let rrsig = RRSIG::new(
            RecordType::A,
            crate::crypto::Algorithm::RSASHA256,
            3, // labels below root: *.wild.example.com. == 3 labels signed
            300,
            2_000_000_000,
            1_000_000_000,
            1,
            name("example.com."),
            vec![0; 16],
        );
        assert!(set.is_wildcard_expanded(&rrsig));
        assert_eq!(set.signed_owner(rrsig.labels()), name("*.wild.example.com."));
    }

    #[test]
    fn signed_data_is_deterministic_regardless_of_member_order() {
        let rrsig = RRSIG::new(
            RecordType::Unknown(0),
            crate::crypto::Algorithm::RSASHA256,
            3,
            300,
            2_000_000_000,
            1_000_000_000,
            1,
            name("example.com."),
            vec![0; 4],
        );
        let forward = RRset::from_records(vec![
            Record::new(name("www.example.com."), Class::IN, 300, RData::Opaque(vec![1, 1])),
            Record::new(name("www.example.com."), Class::IN, 300, RData::Opaque(vec![0, 9])),
        ])
        .unwrap();
        let reversed = RRset::from_records(vec![
            Record::new(name("www.example.com."), Class::IN, 300, RData::Opaque(vec![0, 9])),
            Record::new(name("www.example.com."), Class::IN, 300, RData::Opaque(vec![1, 1])),
        ])
        .unwrap();
        assert_eq!(forward.signed_data(&rrsig), reversed.signed_data(&rrsig));
    }
}
