// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The cached, authoritative verdict for a zone's key material, produced
//! by the trust-chain walk down from a trust anchor.

use std::time::{Duration, SystemTime};

use crate::name::Name;
use crate::rr::rdata::DNSKEY;

/// A negative (bad) [`KeyEntry`]'s cache lifetime: short, so a transient
/// failure does not poison the chain for long -- failed verifications
/// cache bad with a short negative TTL.
pub const NEGATIVE_TTL: Duration = Duration::from_secs(60);

/// The authoritative cached verdict for one zone's key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEntryState {
    /// A validated DNSKEY RRset for the zone: SECURE.
    TrustedKeySet { dnskeys: Vec<DNSKEY> },
    /// An authenticated proof that the zone has no supported DS
    /// algorithm, or that DS does not exist at all: INSECURE.
    NullInsecureDelegation,
    /// Validation failed somewhere on the path to this zone: BOGUS.
    Bad { reason: &'static str },
}

/// A [`KeyEntryState`] plus the zone it describes and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    zone: Name,
    state: KeyEntryState,
    expires_at: SystemTime,
}

impl KeyEntry {
    pub fn trusted(zone: Name, dnskeys: Vec<DNSKEY>, expires_at: SystemTime) -> Self {
        Self { zone, state: KeyEntryState::TrustedKeySet { dnskeys }, expires_at }
    }

    pub fn null_insecure(zone: Name, expires_at: SystemTime) -> Self {
        Self { zone, state: KeyEntryState::NullInsecureDelegation, expires_at }
    }

    pub fn bad(zone: Name, reason: &'static str, now: SystemTime) -> Self {
        Self { zone, state: KeyEntryState::Bad { reason }, expires_at: now + NEGATIVE_TTL }
    }

    pub fn zone(&self) -> &Name {
        &self.zone
    }

    pub fn state(&self) -> &KeyEntryState {
        &self.state
    }

    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }

    pub fn is_trusted(&self) -> bool {
        matches!(self.state, KeyEntryState::TrustedKeySet { .. })
    }

    pub fn is_null(&self) -> bool {
        matches!(self.state, KeyEntryState::NullInsecureDelegation)
    }

    pub fn is_bad(&self) -> bool {
        matches!(self.state, KeyEntryState::Bad { .. })
    }

    /// The DNSKEYs this entry vouches for, if it is a trusted keyset.
    pub fn dnskeys(&self) -> Option<&[DNSKEY]> {
        match &self.state {
            KeyEntryState::TrustedKeySet { dnskeys } => Some(dnskeys),
            _ => None,
        }
    }
}
