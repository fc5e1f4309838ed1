// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! `SMessage`: a DNS response carrying four section-lists of RRsets, an
//! rcode, header flags, and an overall [`SecurityStatus`] derived from its
//! RRsets.

use crate::name::Name;
use crate::rr::{Class, RRset, RecordType};
use crate::status::SecurityStatus;

/// The response code of an `SMessage`, RFC 1035 §4.1.1 plus the handful of
/// extended codes this engine synthesizes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rcode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    Unknown(u16),
}

impl Rcode {
    pub fn to_u16(self) -> u16 {
        match self {
            Self::NoError => 0,
            Self::FormErr => 1,
            Self::ServFail => 2,
            Self::NxDomain => 3,
            Self::NotImp => 4,
            Self::Refused => 5,
            Self::Unknown(v) => v,
        }
    }

    pub fn from_u16(v: u16) -> Self {
        match v {
            0 => Self::NoError,
            1 => Self::FormErr,
            2 => Self::ServFail,
            3 => Self::NxDomain,
            4 => Self::NotImp,
            5 => Self::Refused,
            other => Self::Unknown(other),
        }
    }
}

/// The question a message answers: qname, qclass, qtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub qname: Name,
    pub qclass: Class,
    pub qtype: RecordType,
}

/// Header flags relevant to DNSSEC processing. Other header bits (QR,
/// opcode, TC, RA, Z) are an external collaborator's concern and are not
/// modeled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderFlags {
    /// Recursion Desired, copied through from the query.
    pub rd: bool,
    /// Checking Disabled, RFC 4035 §3.2.2 -- when set, the stub must skip
    /// validation and pass the upstream response through unchanged.
    pub cd: bool,
    /// Authentic Data, RFC 4035 §3.1.6 -- set by this engine iff the
    /// overall status is SECURE.
    pub ad: bool,
}

/// A DNS response: four section-lists of RRsets, an rcode, header flags,
/// and the question it answers.
#[derive(Debug, Clone)]
pub struct SMessage {
    pub question: Question,
    pub rcode: Rcode,
    pub flags: HeaderFlags,
    pub answer: Vec<RRset>,
    pub authority: Vec<RRset>,
    pub additional: Vec<RRset>,
}

impl SMessage {
    pub fn new(question: Question, rcode: Rcode) -> Self {
        Self {
            question,
            rcode,
            flags: HeaderFlags::default(),
            answer: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// RFC 4035 §3.2.3: the overall status of a message is the monotone
    /// merge of every RRset in its answer and authority sections (the
    /// additional section carries no signed assertion this engine relies
    /// on). An empty message (no RRsets at all, e.g. a bare NXDOMAIN with
    /// only NSEC in authority already counted) is UNCHECKED.
    pub fn overall_status(&self) -> SecurityStatus {
        self.answer
            .iter()
            .chain(self.authority.iter())
            .map(RRset::status)
            .fold(SecurityStatus::Unchecked, SecurityStatus::merge)
    }

    /// Applies the user-visible behavior for the overall status: BOGUS
    /// synthesizes SERVFAIL preserving the question, INSECURE passes the
    /// rcode through with AD=0, SECURE sets AD=1.
    pub fn finalize(&mut self) {
        match self.overall_status() {
            SecurityStatus::Bogus => {
                self.rcode = Rcode::ServFail;
                self.answer.clear();
                self.authority.clear();
                self.additional.clear();
                self.flags.ad = false;
            }
            SecurityStatus::Secure => {
                self.flags.ad = true;
            }
            _ => {
                self.flags.ad = false;
            }
        }
    }

    pub fn answer_rrsets_of_type(&self, rtype: RecordType) -> impl Iterator<Item = &RRset> {
        self.answer.iter().filter(move |r| r.record_type() == rtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::{RData, Record};

    fn question(qname: &str, qtype: RecordType) -> Question {
        Question { qname: Name::parse(qname).unwrap(), qclass: Class::IN, qtype }
    }

    fn opaque_rrset(owner: &str, status: SecurityStatus) -> RRset {
        let record = Record::new(Name::parse(owner).unwrap(), Class::IN, 300, RData::Opaque(vec![1]));
        let mut set = RRset::from_records(vec![record]).unwrap();
        if status != SecurityStatus::Unchecked {
            set.set_status(status);
        }
        set
    }

    #[test]
    fn overall_status_is_monotone_merge_of_member_rrsets() {
        let mut msg = SMessage::new(question("www.example.com.", RecordType::A), Rcode::NoError);
        msg.answer.push(opaque_rrset("www.example.com.", SecurityStatus::Secure));
        msg.authority.push(opaque_rrset("example.com.", SecurityStatus::Insecure));
        assert_eq!(msg.overall_status(), SecurityStatus::Insecure);
    }

    #[test]
    fn finalize_bogus_synthesizes_servfail_and_clears_sections() {
        let mut msg = SMessage::new(question("www.example.com.", RecordType::A), Rcode::NoError);
        msg.answer.push(opaque_rrset("www.example.com.", SecurityStatus::Bogus));
        msg.finalize();
        assert_eq!(msg.rcode, Rcode::ServFail);
        assert!(msg.answer.is_empty());
        assert!(!msg.flags.ad);
    }

    #[test]
    fn finalize_secure_sets_ad_bit() {
        let mut msg = SMessage::new(question("www.example.com.", RecordType::A), Rcode::NoError);
        msg.answer.push(opaque_rrset("www.example.com.", SecurityStatus::Secure));
        msg.finalize();
        assert!(msg.flags.ad);
        assert_eq!(msg.rcode, Rcode::NoError);
    }

    #[test]
    fn finalize_insecure_leaves_response_unchanged_with_ad_unset() {
        let mut msg = SMessage::new(question("www.example.com.", RecordType::A), Rcode::NoError);
        msg.answer.push(opaque_rrset("www.example.com.", SecurityStatus::Insecure));
        msg.finalize();
        assert!(!msg.flags.ad);
        assert_eq!(msg.rcode, Rcode::NoError);
        assert!(!msg.answer.is_empty());
    }
}
