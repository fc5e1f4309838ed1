// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Statically configured trust anchors, seeded into the key cache as
//! SECURE at startup. Trust-anchor rollover (RFC 5011) is not implemented:
//! anchors are immutable for the lifetime of the engine.

use crate::name::Name;
use crate::rr::rdata::{DNSKEY, DS};

/// A single configured trust anchor: either a DNSKEY the operator has
/// decided to trust directly, or a DS record to be resolved into a
/// DNSKEY on first use, matched against its own zone's DNSKEY RRset per
/// RFC 4035 §5.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustAnchor {
    DnsKey { zone: Name, dnskey: DNSKEY },
    Ds { zone: Name, ds: DS },
}

impl TrustAnchor {
    pub fn zone(&self) -> &Name {
        match self {
            Self::DnsKey { zone, .. } => zone,
            Self::Ds { zone, .. } => zone,
        }
    }
}

/// The full set of configured trust anchors, indexed by zone for the
/// longest-matching-ancestor lookup the Trust-Chain Walker performs.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorSet {
    anchors: Vec<TrustAnchor>,
}

impl TrustAnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, anchor: TrustAnchor) {
        self.anchors.push(anchor);
    }

    /// The longest (most specific) configured anchor that is `zone` itself
    /// or a strict ancestor of it -- the starting point for a chain walk
    /// down to `zone`.
    pub fn longest_match(&self, zone: &Name) -> Option<&TrustAnchor> {
        self.anchors
            .iter()
            .filter(|a| zone.is_subdomain_of(a.zone()))
            .max_by_key(|a| a.zone().label_count())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrustAnchor> {
        self.anchors.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
