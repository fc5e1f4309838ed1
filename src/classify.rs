// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Response Classifier: labels an `SMessage` as one of
//! POSITIVE/CNAME/NODATA/NXDOMAIN/ANY/UNKNOWN from its rcode, question, and
//! answer-section contents.

use tracing::warn;

use crate::message::{Rcode, SMessage};
use crate::rr::RecordType;

/// The classification of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Positive,
    Cname,
    NoData,
    NxDomain,
    Any,
    /// The response did not fit any recognized shape. Per the Open
    /// Question resolution in the governing design notes, the orchestrator
    /// must treat this as BOGUS(reason=unclassifiable) rather than merely
    /// logging and proceeding.
    Unknown,
}

/// Classify `message` by its rcode, question, and answer shape, checking
/// NXDOMAIN and ANY before falling back to NODATA/CNAME/POSITIVE.
pub fn classify(message: &SMessage) -> ResponseKind {
    if message.rcode == Rcode::NxDomain && message.answer.is_empty() {
        return ResponseKind::NxDomain;
    }
    if message.answer.is_empty() {
        return ResponseKind::NoData;
    }
    if message.question.qtype == RecordType::ANY {
        return ResponseKind::Any;
    }
    if message.answer.iter().any(|r| r.record_type() == message.question.qtype) {
        return ResponseKind::Positive;
    }
    if message.answer.iter().any(|r| r.record_type() == RecordType::CNAME) {
        return ResponseKind::Cname;
    }

    warn!(
        qname = %message.question.qname,
        qtype = %message.question.qtype,
        "response did not classify as a known response type"
    );
    ResponseKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Question;
    use crate::name::Name;
    use crate::rr::{Class, RData, RRset, Record};

    fn question(qname: &str, qtype: RecordType) -> Question {
        Question { qname: Name::parse(qname).unwrap(), qclass: Class::IN, qtype }
    }

    fn rrset_of(owner: &str, rtype_record: RData) -> RRset {
        let record = Record::new(Name::parse(owner).unwrap(), Class::IN, 300, rtype_record);
        RRset::from_records(vec![record]).unwrap()
    }

    #[test]
    fn nxdomain_rule_takes_priority_when_answer_empty() {
        let mut msg = SMessage::new(question("missing.example.com.", RecordType::A), Rcode::NxDomain);
        assert!(msg.answer.is_empty());
        assert_eq!(classify(&msg), ResponseKind::NxDomain);
        msg.rcode = Rcode::NoError;
        assert_eq!(classify(&msg), ResponseKind::NoData);
    }

    #[test]
    fn any_qtype_classifies_as_any_even_with_answers() {
        let mut msg = SMessage::new(question("example.com.", RecordType::ANY), Rcode::NoError);
        msg.answer.push(rrset_of("example.com.", RData::Opaque(vec![1])));
        assert_eq!(classify(&msg), ResponseKind::Any);
    }

    #[test]
    fn matching_qtype_in_answer_is_positive() {
        let mut msg = SMessage::new(question("www.example.com.", RecordType::NS), Rcode::NoError);
        msg.answer.push(rrset_of("www.example.com.", RData::NS(Name::parse("ns1.example.com.").unwrap())));
        assert_eq!(classify(&msg), ResponseKind::Positive);
    }

    #[test]
    fn cname_in_answer_without_matching_qtype_is_cname() {
        let mut msg = SMessage::new(question("www.example.com.", RecordType::A), Rcode::NoError);
        msg.answer.push(rrset_of("www.example.com.", RData::CNAME(Name::parse("alias.example.com.").unwrap())));
        assert_eq!(classify(&msg), ResponseKind::Cname);
    }

    #[test]
    fn unrecognized_shape_is_unknown() {
        let mut msg = SMessage::new(question("www.example.com.", RecordType::A), Rcode::NoError);
        msg.answer.push(rrset_of("www.example.com.", RData::SOA {
            mname: Name::parse("ns1.example.com.").unwrap(),
            rname: Name::parse("hostmaster.example.com.").unwrap(),
            serial: 1,
            refresh: 2,
            retry: 3,
            expire: 4,
            minimum: 5,
        }));
        assert_eq!(classify(&msg), ResponseKind::Unknown);
    }
}
