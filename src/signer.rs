// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Signer Resolver: finds the zone whose keys sign a given response by
//! inspecting RRSIG signer names in the appropriate section, per RFC 4035
//! §5.3.

use crate::classify::ResponseKind;
use crate::message::SMessage;
use crate::name::Name;
use crate::rr::RecordType;

/// The signer zone for `message`, given its classification. `None` means
/// the response is unsigned (no RRSIG found where one was expected), which
/// is either INSECURE (if the path to the zone is proven unsigned) or
/// BOGUS, a decision left to the caller.
pub fn resolve_signer(message: &SMessage, kind: ResponseKind) -> Option<Name> {
    match kind {
        ResponseKind::Positive | ResponseKind::Cname | ResponseKind::Any => message
            .answer
            .iter()
            .find(|rrset| rrset.name() == &message.question.qname)
            .and_then(|rrset| rrset.rrsigs().first())
            .map(|rrsig| rrsig.signer_name().clone()),
        ResponseKind::NoData | ResponseKind::NxDomain => message
            .authority
            .iter()
            .find(|rrset| matches!(rrset.record_type(), RecordType::NSEC | RecordType::NSEC3))
            .and_then(|rrset| rrset.rrsigs().first())
            .map(|rrsig| rrsig.signer_name().clone()),
        ResponseKind::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Algorithm;
    use crate::message::{Question, Rcode};
    use crate::rr::rdata::RRSIG;
    use crate::rr::{Class, RData, RRset, Record};

    fn name(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    fn question(qname: &str, qtype: RecordType) -> Question {
        Question { qname: name(qname), qclass: Class::IN, qtype }
    }

    fn signed_rrset(owner: &str, rtype: RData, signer: &str) -> RRset {
        let record = Record::new(name(owner), Class::IN, 300, rtype);
        let mut set = RRset::from_records(vec![record]).unwrap();
        let rrsig = RRSIG::new(
            RecordType::A,
            Algorithm::RSASHA256,
            2,
            300,
            2_000_000_000,
            1_000_000_000,
            1,
            name(signer),
            vec![0; 4],
        );
        set.add_rrsig(rrsig);
        set
    }

    #[test]
    fn positive_response_resolves_signer_from_matching_answer() {
        let mut msg = SMessage::new(question("www.example.com.", RecordType::A), Rcode::NoError);
        msg.answer.push(signed_rrset("www.example.com.", RData::Opaque(vec![1]), "example.com."));
        assert_eq!(resolve_signer(&msg, ResponseKind::Positive), Some(name("example.com.")));
    }

    #[test]
    fn nxdomain_resolves_signer_from_nsec_in_authority() {
        let mut msg = SMessage::new(question("missing.example.com.", RecordType::A), Rcode::NxDomain);
        let nsec = crate::rr::rdata::NSEC::new(name("z.example.com."), crate::rr::rdata::TypeBitMap::new());
        msg.authority.push(signed_rrset("a.example.com.", RData::NSEC(nsec), "example.com."));
        assert_eq!(resolve_signer(&msg, ResponseKind::NxDomain), Some(name("example.com.")));
    }

    #[test]
    fn unsigned_answer_resolves_to_none() {
        let mut msg = SMessage::new(question("www.example.com.", RecordType::A), Rcode::NoError);
        let record = Record::new(name("www.example.com."), Class::IN, 300, RData::Opaque(vec![1]));
        msg.answer.push(RRset::from_records(vec![record]).unwrap());
        assert_eq!(resolve_signer(&msg, ResponseKind::Positive), None);
    }
}
