// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! [RFC 4034 §4](https://www.rfc-editor.org/rfc/rfc4034#section-4), the
//! NSEC resource record, and the interval-containment logic used to prove
//! denial of existence over it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::name::Name;
use crate::rr::record::RecordType;

use super::TypeBitMap;

/// An NSEC record: the next owner name in canonical zone order, plus the
/// set of record types that exist at this owner.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NSEC {
    next_domain_name: Name,
    type_bit_maps: TypeBitMap,
}

impl NSEC {
    pub fn new(next_domain_name: Name, type_bit_maps: TypeBitMap) -> Self {
        Self { next_domain_name, type_bit_maps }
    }

    pub fn next_domain_name(&self) -> &Name {
        &self.next_domain_name
    }

    pub fn type_bit_maps(&self) -> &TypeBitMap {
        &self.type_bit_maps
    }

    pub fn type_exists(&self, rtype: RecordType) -> bool {
        self.type_bit_maps.contains(rtype)
    }

    /// RFC 4035 §5.4: does this NSEC's `(owner, next)` interval strictly
    /// contain `name`, in canonical zone order? The interval wraps at the
    /// zone apex; per the governing proof rule the wrap is detected via
    /// `signer_name == next_domain_name` rather than by comparing owner
    /// and next directly (see the redesign note on this heuristic).
    pub fn covers(&self, owner: &Name, name: &Name, signer_name: &Name) -> bool {
        let wraps = signer_name == &self.next_domain_name;
        if wraps {
            name > owner || name < &self.next_domain_name
        } else {
            name > owner && name < &self.next_domain_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    #[test]
    fn interval_contains_name_strictly_between() {
        let nsec = NSEC::new(name("c.example.com."), TypeBitMap::new());
        let owner = name("a.example.com.");
        let signer = name("example.com.");
        assert!(nsec.covers(&owner, &name("b.example.com."), &signer));
        assert!(!nsec.covers(&owner, &name("a.example.com."), &signer));
        assert!(!nsec.covers(&owner, &name("c.example.com."), &signer));
        assert!(!nsec.covers(&owner, &name("d.example.com."), &signer));
    }

    #[test]
    fn wraparound_interval_detected_via_signer_equals_next() {
        // NSEC at the last name before the apex wraps back to the apex.
        let apex = name("example.com.");
        let nsec = NSEC::new(apex.clone(), TypeBitMap::new());
        let owner = name("z.example.com.");
        assert!(nsec.covers(&owner, &name("zz.example.com."), &apex));
        assert!(nsec.covers(&owner, &name("a.example.com."), &apex));
        assert!(!nsec.covers(&owner, &name("z.example.com."), &apex));
    }

    #[test]
    fn type_bitmap_reports_existing_types() {
        let nsec = NSEC::new(
            name("b.example.com."),
            TypeBitMap::from_types(vec![RecordType::A, RecordType::RRSIG, RecordType::NSEC]),
        );
        assert!(nsec.type_exists(RecordType::A));
        assert!(!nsec.type_exists(RecordType::AAAA));
    }
}
