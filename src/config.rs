// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Validator configuration knobs. Parsing these out of a config file or CLI
//! flags is an external collaborator's job; this module only defines the
//! struct the engine reads from.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::crypto::DigestType;

/// Runtime knobs for the validation engine, mirroring Unbound's
/// `val-override-date`, `val-nsec3-keysize-iterations`,
/// `val-digest-preference`, and `harden-algo-downgrade` options.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorConfig {
    /// Overrides wall-clock time for RRSIG inception/expiration checks.
    /// Testing only; `None` uses the system clock.
    pub val_override_date: Option<OffsetDateTime>,

    /// Ordered `(keysize_bits, max_iterations)` pairs, sorted ascending by
    /// keysize. The table entry selected for a given key is the one with
    /// the largest `keysize_bits` that does not exceed the key's own size;
    /// its `max_iterations` is the cap for that key.
    pub val_nsec3_keysize_iterations: Vec<(u16, u32)>,

    /// Preference order for DS digest types when a child zone publishes
    /// more than one digest of the same DNSKEY: only the most-preferred
    /// available digest is used, the rest are ignored rather than
    /// cross-checked.
    pub val_digest_preference: Vec<DigestType>,

    /// When `true`, every DS algorithm present for a zone must be
    /// supported or the delegation is BOGUS; when `false`, any single
    /// supported algorithm is sufficient.
    pub harden_algo_downgrade: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            val_override_date: None,
            // Mirrors Unbound's default val-nsec3-keysize-iterations table.
            val_nsec3_keysize_iterations: vec![
                (1024, 150),
                (2048, 500),
                (4096, 2500),
            ],
            val_digest_preference: vec![DigestType::SHA384, DigestType::SHA256, DigestType::SHA1],
            harden_algo_downgrade: true,
        }
    }
}

impl ValidatorConfig {
    /// The iteration cap that applies to a key of `keysize_bits`: the
    /// largest table entry whose keysize does not exceed `keysize_bits`,
    /// or the smallest entry's cap if the key is smaller than every
    /// tabulated size.
    pub fn nsec3_iteration_cap(&self, keysize_bits: u16) -> u32 {
        let mut applicable = None;
        for &(size, cap) in &self.val_nsec3_keysize_iterations {
            if size <= keysize_bits {
                applicable = Some(cap);
            }
        }
        applicable.unwrap_or_else(|| {
            self.val_nsec3_keysize_iterations
                .first()
                .map(|&(_, cap)| cap)
                .unwrap_or(0)
        })
    }

    /// `true` if `iterations` is within the cap for `keysize_bits`.
    pub fn nsec3_iterations_allowed(&self, keysize_bits: u16, iterations: u32) -> bool {
        iterations <= self.nsec3_iteration_cap(keysize_bits)
    }

    /// Select the most-preferred DS digest type present in `available`,
    /// per `val_digest_preference`.
    pub fn preferred_digest<'a>(&self, available: &'a [DigestType]) -> Option<&'a DigestType> {
        for preferred in &self.val_digest_preference {
            if let Some(found) = available.iter().find(|d| *d == preferred) {
                return Some(found);
            }
        }
        None
    }
}
