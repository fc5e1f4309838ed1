// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The NSEC3 Denial Prover: the hashed-name counterpart of
//! [`super::nsec`], proving NXDOMAIN, NODATA, wildcard no-closer-match, and
//! no-DS over a response's already-verified NSEC3 RRsets, per RFC 5155 §8.

use crate::config::ValidatorConfig;
use crate::crypto::{Algorithm, CryptoBackend};
use crate::error::Result;
use crate::name::Name;
use crate::rr::rdata::rsa::RSAPublicKey;
use crate::rr::rdata::{hash_name, DNSKEY, NSEC3};
use crate::rr::{RData, RRset, RecordType};

/// One NSEC3 record paired with its owner name, borrowed from an already
/// verified RRset.
pub struct Nsec3Record<'a> {
    pub owner: &'a Name,
    pub nsec3: &'a NSEC3,
}

/// Collect every NSEC3 record carried in `authority`.
pub fn collect<'a>(authority: &'a [RRset]) -> Vec<Nsec3Record<'a>> {
    authority
        .iter()
        .flat_map(|rrset| {
            rrset.rdata().iter().filter_map(move |d| match d {
                RData::NSEC3(n) => Some(Nsec3Record { owner: rrset.name(), nsec3: n }),
                _ => None,
            })
        })
        .collect()
}

/// The hash parameters a set of NSEC3 records share, read off the first
/// record (a response's NSEC3 records are expected to agree; the signer
/// check already rejects records from a different zone/parameter set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nsec3Params {
    pub hash_algorithm: u8,
    pub iterations: u16,
    pub salt: Vec<u8>,
}

impl Nsec3Params {
    pub fn from_records(records: &[Nsec3Record]) -> Option<Self> {
        let first = records.first()?;
        Some(Self {
            hash_algorithm: first.nsec3.hash_algorithm(),
            iterations: first.nsec3.iterations(),
            salt: first.nsec3.salt().to_vec(),
        })
    }
}

fn matches_hash(record: &Nsec3Record, hash: &[u8]) -> bool {
    NSEC3::decode_owner_hash(record.owner).map(|h| h == hash).unwrap_or(false)
}

fn exact_match<'a, 'b>(records: &'b [Nsec3Record<'a>], hash: &[u8]) -> Option<&'b Nsec3Record<'a>> {
    records.iter().find(|r| matches_hash(r, hash))
}

fn covering<'a, 'b>(records: &'b [Nsec3Record<'a>], hash: &[u8]) -> Option<&'b Nsec3Record<'a>> {
    records.iter().find(|r| {
        NSEC3::decode_owner_hash(r.owner)
            .map(|owner_hash| r.nsec3.covers(&owner_hash, hash))
            .unwrap_or(false)
    })
}

/// RFC 5155 §8.3: walk `qname`'s strict ancestors, innermost first, for the
/// one whose hash matches an NSEC3 owner -- the closest encloser.
pub fn find_closest_encloser(
    records: &[Nsec3Record],
    qname: &Name,
    params: &Nsec3Params,
    backend: &dyn CryptoBackend,
) -> Result<Option<Name>> {
    if qname.label_count() == 0 {
        return Ok(None);
    }
    let mut depth = qname.label_count() - 1;
    loop {
        let candidate = qname.ancestor_at_depth(depth).expect("depth within qname's own label count");
        let hash = hash_name(&candidate, &params.salt, params.iterations, backend)?;
        if exact_match(records, &hash).is_some() {
            return Ok(Some(candidate));
        }
        if depth == 0 {
            return Ok(None);
        }
        depth -= 1;
    }
}

/// RFC 5155 §8.4: NXDOMAIN requires a closest encloser, an NSEC3 covering
/// `qname`'s own hash, and one covering the hash of the wildcard that would
/// have expanded from the closest encloser.
pub fn proves_nxdomain(
    records: &[Nsec3Record],
    qname: &Name,
    params: &Nsec3Params,
    backend: &dyn CryptoBackend,
) -> Result<bool> {
    let hash = hash_name(qname, &params.salt, params.iterations, backend)?;
    if exact_match(records, &hash).is_some() {
        return Ok(false);
    }
    if covering(records, &hash).is_none() {
        return Ok(false);
    }
    let Some(ce) = find_closest_encloser(records, qname, params, backend)? else {
        return Ok(false);
    };
    let wildcard = ce.prepend_wildcard();
    let wildcard_hash = hash_name(&wildcard, &params.salt, params.iterations, backend)?;
    Ok(exact_match(records, &wildcard_hash).is_none() && covering(records, &wildcard_hash).is_some())
}

/// RFC 5155 §8.5: NODATA either via an exact-match NSEC3 whose bitmap
/// excludes `qtype` (and CNAME), or, for an empty non-terminal, a closest
/// encloser together with an NSEC3 covering `qname`'s own hash.
pub fn proves_nodata(
    records: &[Nsec3Record],
    qname: &Name,
    qtype: RecordType,
    params: &Nsec3Params,
    backend: &dyn CryptoBackend,
) -> Result<bool> {
    let hash = hash_name(qname, &params.salt, params.iterations, backend)?;
    if let Some(r) = exact_match(records, &hash) {
        return Ok(!r.nsec3.type_bit_maps().contains(qtype) && !r.nsec3.type_bit_maps().contains(RecordType::CNAME));
    }
    Ok(find_closest_encloser(records, qname, params, backend)?.is_some() && covering(records, &hash).is_some())
}

/// RFC 5155 §8.7: a wildcard-expanded answer must be accompanied by an
/// NSEC3 covering `qname`'s own hash, proving no closer name exists.
pub fn proves_no_closer_match(
    records: &[Nsec3Record],
    qname: &Name,
    params: &Nsec3Params,
    backend: &dyn CryptoBackend,
) -> Result<bool> {
    let hash = hash_name(qname, &params.salt, params.iterations, backend)?;
    Ok(covering(records, &hash).is_some())
}

/// The outcome of a no-DS proof: either an authenticated insecure
/// delegation, or a failed (BOGUS) proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDsOutcome {
    Insecure,
    Bogus,
}

/// RFC 5155 §8.6 / RFC 6840 §4.3: a no-DS proof either matches `qname`
/// exactly with a bitmap lacking SOA/DS (ordinary NODATA rules), or, failing
/// that, is a closest-encloser proof whose next-closer-covering NSEC3 has
/// the Opt-Out bit set.
pub fn proves_no_ds(
    records: &[Nsec3Record],
    qname: &Name,
    params: &Nsec3Params,
    backend: &dyn CryptoBackend,
) -> Result<NoDsOutcome> {
    let hash = hash_name(qname, &params.salt, params.iterations, backend)?;
    if let Some(r) = exact_match(records, &hash) {
        if r.nsec3.type_bit_maps().contains(RecordType::SOA) || r.nsec3.type_bit_maps().contains(RecordType::DS) {
            return Ok(NoDsOutcome::Bogus);
        }
        return Ok(NoDsOutcome::Insecure);
    }

    let Some(ce) = find_closest_encloser(records, qname, params, backend)? else {
        return Ok(NoDsOutcome::Bogus);
    };
    let next_closer_depth = ce.label_count() + 1;
    let Some(next_closer) = qname.ancestor_at_depth(next_closer_depth) else {
        return Ok(NoDsOutcome::Bogus);
    };
    let next_closer_hash = hash_name(&next_closer, &params.salt, params.iterations, backend)?;
    match covering(records, &next_closer_hash) {
        Some(r) if r.nsec3.opt_out() => Ok(NoDsOutcome::Insecure),
        _ => Ok(NoDsOutcome::Bogus),
    }
}

/// RSA key size needs parsing the RFC 3110 modulus; fixed-size algorithms
/// use their well-known curve/field size directly.
fn key_size_bits(key: &DNSKEY) -> u16 {
    match key.algorithm() {
        Algorithm::RSASHA1 | Algorithm::RSASHA1NSEC3SHA1 | Algorithm::RSASHA256 | Algorithm::RSASHA512 => {
            RSAPublicKey::try_from(key.public_key().public_bytes())
                .map(|rsa| modulus_bits(rsa.n()))
                .unwrap_or(0)
        }
        Algorithm::ECDSAP256SHA256 => 256,
        Algorithm::ECDSAP384SHA384 => 384,
        Algorithm::ED25519 => 256,
        Algorithm::ED448 => 456,
        Algorithm::Unknown(_) => 0,
    }
}

fn modulus_bits(n: &[u8]) -> u16 {
    let significant = match n.iter().position(|&b| b != 0) {
        Some(idx) => &n[idx..],
        None => return 0,
    };
    let bits = significant.len() as u16 * 8;
    bits - significant[0].leading_zeros() as u16
}

/// The strictest (smallest) iteration cap among a zone's signing keys:
/// an attacker controlling only a weak key should not be able to justify a
/// higher iteration count than the zone's weakest key allows.
fn strictest_iteration_cap(signer_keys: &[DNSKEY], config: &ValidatorConfig) -> u32 {
    signer_keys
        .iter()
        .map(|k| config.nsec3_iteration_cap(key_size_bits(k)))
        .min()
        .unwrap_or(0)
}

/// RFC 9276 / Unbound's `val-nsec3-keysize-iterations`: iteration counts
/// above the cap for the zone's weakest signing key make the NSEC3 proof
/// an insecure-delegation signal rather than a trusted denial -- the
/// response is treated as if no usable proof was present.
pub fn iterations_exceed_cap(params: &Nsec3Params, signer_keys: &[DNSKEY], config: &ValidatorConfig) -> bool {
    u32::from(params.iterations) > strictest_iteration_cap(signer_keys, config)
}
