// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! [RFC 5155](https://www.rfc-editor.org/rfc/rfc5155), hashed authenticated
//! denial of existence: the NSEC3 and NSEC3PARAM resource records, and the
//! iterated-hash computation used to map a query name onto the hashed owner
//! space.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::crypto::{CryptoBackend, DigestType};
use crate::error::{Result, ValidationErrorKind};
use crate::name::Name;

use super::TypeBitMap;

/// Base32hex (RFC 4648 §7), no padding -- the encoding RFC 5155 §1 mandates
/// for NSEC3 owner-name and `next_hashed_owner_name` presentation, and what
/// this crate uses internally to keep hashed names comparable as plain
/// byte strings.
const BASE32HEX_NOPAD: data_encoding::Encoding = data_encoding::BASE32HEX_NOPAD;

/// RFC 5155 §4.1.1: only hash algorithm 1 (SHA-1) is currently defined.
pub fn is_supported_hash_algorithm(algorithm: u8) -> bool {
    algorithm == 1
}

/// RFC 5155 §5: hash `name` under the given salt/iteration parameters.
/// `iterations` counts *additional* rounds past the initial hash, per
/// RFC 5155 §5: `IH(salt, x, 0) = H(x || salt)`,
/// `IH(salt, x, k) = H(IH(salt, x, k-1) || salt)`.
pub fn hash_name(
    name: &Name,
    salt: &[u8],
    iterations: u16,
    backend: &dyn CryptoBackend,
) -> Result<Vec<u8>> {
    let mut input = name.to_lowercase_wire();
    input.extend_from_slice(salt);
    let mut hash = backend.digest(DigestType::SHA1, &input)?;
    for _ in 0..iterations {
        let mut next = hash;
        next.extend_from_slice(salt);
        hash = backend.digest(DigestType::SHA1, &next)?;
    }
    Ok(hash)
}

/// RFC 5155 §4: hashed authenticated denial of existence record.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NSEC3 {
    hash_algorithm: u8,
    opt_out: bool,
    iterations: u16,
    salt: Vec<u8>,
    next_hashed_owner_name: Vec<u8>,
    type_bit_maps: TypeBitMap,
}

impl NSEC3 {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hash_algorithm: u8,
        opt_out: bool,
        iterations: u16,
        salt: Vec<u8>,
        next_hashed_owner_name: Vec<u8>,
        type_bit_maps: TypeBitMap,
    ) -> Self {
        Self { hash_algorithm, opt_out, iterations, salt, next_hashed_owner_name, type_bit_maps }
    }

    pub fn hash_algorithm(&self) -> u8 {
        self.hash_algorithm
    }

    /// RFC 5155 §3.1.2.1: when set, an insecure (unsigned) delegation may
    /// occupy the span this NSEC3 covers without that being provable as a
    /// denial of a DS record at the delegation's own name.
    pub fn opt_out(&self) -> bool {
        self.opt_out
    }

    pub fn iterations(&self) -> u16 {
        self.iterations
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn next_hashed_owner_name(&self) -> &[u8] {
        &self.next_hashed_owner_name
    }

    pub fn type_bit_maps(&self) -> &TypeBitMap {
        &self.type_bit_maps
    }

    /// RFC 5155 §8.3: does this NSEC3's `(owner_hash, next_hash)` interval
    /// strictly contain `candidate_hash`, in the NSEC3 hash order space?
    /// The interval wraps when `next_hash` sorts at or before `owner_hash`,
    /// i.e. this is the NSEC3 RR with the numerically largest hash in the
    /// zone.
    pub fn covers(&self, owner_hash: &[u8], candidate_hash: &[u8]) -> bool {
        let next = &self.next_hashed_owner_name;
        if next <= owner_hash {
            candidate_hash > owner_hash || candidate_hash < next.as_slice()
        } else {
            candidate_hash > owner_hash && candidate_hash < next.as_slice()
        }
    }

    /// Decode a hashed owner name's leading label (base32hex) into raw
    /// digest bytes, to compare against [`hash_name`] output or another
    /// NSEC3's hash fields.
    pub fn decode_owner_hash(owner: &Name) -> Result<Vec<u8>> {
        let first = owner
            .labels()
            .first()
            .ok_or_else(|| ValidationErrorKind::MalformedRecord("NSEC3 owner has no labels".into()))?;
        let upper: Vec<u8> = first.iter().map(|b| b.to_ascii_uppercase()).collect();
        BASE32HEX_NOPAD
            .decode(&upper)
            .map_err(|_| ValidationErrorKind::MalformedRecord("NSEC3 owner hash is not base32hex".into()).into())
    }
}

/// RFC 5155 §4.3: advertises the hash parameters a zone uses, carried at
/// the zone apex so a validator can compute matching hashes without first
/// fetching an NSEC3 record.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NSEC3PARAM {
    hash_algorithm: u8,
    iterations: u16,
    salt: Vec<u8>,
}

impl NSEC3PARAM {
    pub fn new(hash_algorithm: u8, iterations: u16, salt: Vec<u8>) -> Self {
        Self { hash_algorithm, iterations, salt }
    }

    pub fn hash_algorithm(&self) -> u8 {
        self.hash_algorithm
    }

    pub fn iterations(&self) -> u16 {
        self.iterations
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }
}
