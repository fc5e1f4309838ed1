// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The DNSSEC security-status lattice, RFC 4035 and Unbound/dnssec-java
//! conventions: `UNCHECKED < BOGUS < INDETERMINATE < INSECURE < SECURE`.
//!
//! The numeric ordering only governs the "upgrade-only" rule (an RRset's
//! status may only move upward over its lifetime, and once SECURE or BOGUS
//! it is terminal); it is not a statement that BOGUS is "better" than
//! UNCHECKED in any other sense.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-RRset or per-message validation verdict.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SecurityStatus {
    /// Initial state only. Must never be observed on a message returned
    /// from [`crate::validate::orchestrator::validate`].
    Unchecked = 0,
    /// Signature verification failed, a denial proof failed, or some other
    /// terminal validation failure occurred.
    Bogus = 1,
    /// No trust anchor covers the query name, so no verdict could be
    /// reached either way.
    Indeterminate = 2,
    /// Proven unsigned: a DS denial or a cached null `KeyEntry` on the path
    /// to the signer zone.
    Insecure = 3,
    /// Every required RRset verified under a trust-anchor-rooted chain.
    Secure = 4,
}

impl SecurityStatus {
    /// Merge two statuses per the "upgrade-only, BOGUS-dominates" rule: the
    /// combined status of a message is BOGUS if any contributing RRset is
    /// BOGUS, otherwise the lowest non-BOGUS status among its parts (an
    /// INSECURE RRset pulls an otherwise-SECURE message down to INSECURE).
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Bogus, _) | (_, Self::Bogus) => Self::Bogus,
            (Self::Indeterminate, _) | (_, Self::Indeterminate) => Self::Indeterminate,
            (Self::Insecure, _) | (_, Self::Insecure) => Self::Insecure,
            (Self::Unchecked, other) => other,
            (this, Self::Unchecked) => this,
            (Self::Secure, Self::Secure) => Self::Secure,
        }
    }

    /// `true` if moving from `self` to `next` respects the upgrade-only
    /// invariant: status may only transition upward, and SECURE/BOGUS are
    /// terminal.
    pub fn can_transition_to(self, next: Self) -> bool {
        if matches!(self, Self::Secure | Self::Bogus) {
            return self == next;
        }
        next >= self
    }

    /// Whether the header AD bit should be set for a message with this
    /// overall status.
    pub fn is_authenticated(self) -> bool {
        self == Self::Secure
    }
}

impl Default for SecurityStatus {
    fn default() -> Self {
        Self::Unchecked
    }
}

impl std::fmt::Display for SecurityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unchecked => "UNCHECKED",
            Self::Bogus => "BOGUS",
            Self::Indeterminate => "INDETERMINATE",
            Self::Insecure => "INSECURE",
            Self::Secure => "SECURE",
        };
        f.write_str(s)
    }
}
