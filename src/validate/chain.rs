// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The Trust-Chain Walker: climbs from the longest-matching trust anchor
//! down to a target zone one label at a time, fetching and verifying a
//! DS/DNSKEY pair at each step per RFC 4035 §5, and caching the resulting
//! [`KeyEntry`] so sibling events share the work.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::warn;

use crate::cache::KeyCache;
use crate::classify::{classify, ResponseKind};
use crate::config::ValidatorConfig;
use crate::crypto::{Algorithm, DigestType, SharedCryptoBackend};
use crate::error::{Result, ValidationErrorKind};
use crate::keyentry::{KeyEntry, KeyEntryState};
use crate::message::{Question, SMessage};
use crate::name::Name;
use crate::rr::rdata::{DNSKEY, DS};
use crate::rr::{Class, RData, RRset, RecordType};
use crate::trust_anchor::{TrustAnchor, TrustAnchorSet};
use crate::upstream::{SharedUpstream, Upstream};
use crate::verifier::verify_rrset;

use super::{nsec, nsec3};

/// Cache lifetime for a trust anchor seeded directly from a configured
/// DNSKEY: long, since these never need re-verification against anything.
const ANCHOR_TTL: Duration = Duration::from_secs(86_400);

/// Cache lifetime for a null/insecure delegation verdict propagated down
/// from a parent's proven insecure delegation, rather than freshly proven
/// at this exact zone.
const PROPAGATED_NULL_TTL: Duration = Duration::from_secs(3_600);

/// The shared, immutable handles every step of the walk needs. `upstream`
/// and `backend` are held behind `Arc` rather than a borrow so a fetch can
/// be handed to [`KeyCache::get_or_fetch`], which requires its `fetch`
/// closure to produce a `'static` future for concurrent joiners to share.
pub struct ValidationContext<'a> {
    pub cache: &'a KeyCache,
    pub anchors: &'a TrustAnchorSet,
    pub upstream: SharedUpstream,
    pub config: &'a ValidatorConfig,
    pub backend: SharedCryptoBackend,
}

/// The owned subset of a [`ValidationContext`] a coalesced fetch closure
/// needs once it no longer has access to the borrowed `cache`/`anchors`
/// fields -- everything required to run a query and verify its answer.
#[derive(Clone)]
struct FetchCtx {
    config: ValidatorConfig,
    upstream: SharedUpstream,
    backend: SharedCryptoBackend,
}

impl FetchCtx {
    fn from_context(ctx: &ValidationContext<'_>) -> Self {
        Self { config: ctx.config.clone(), upstream: Arc::clone(&ctx.upstream), backend: Arc::clone(&ctx.backend) }
    }
}

/// Wire-format "now", honoring `val_override_date` for reproducible
/// testing.
pub fn wire_now(config: &ValidatorConfig) -> u32 {
    match config.val_override_date {
        Some(dt) => dt.unix_timestamp() as u32,
        None => SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32,
    }
}

/// Resolve the authoritative [`KeyEntry`] for `zone`, walking the chain
/// from the longest-matching trust anchor if nothing is already cached.
/// Every fetch along the way is routed through [`KeyCache::get_or_fetch`]
/// so sibling events resolving the same zone share one upstream round
/// trip instead of issuing duplicates.
pub async fn ensure_trust_chain(zone: &Name, class: Class, ctx: &ValidationContext<'_>) -> Result<Arc<KeyEntry>> {
    let now = SystemTime::now();
    if let Some(entry) = ctx.cache.lookup(zone, now) {
        return Ok(entry);
    }

    let anchor = ctx
        .anchors
        .longest_match(zone)
        .ok_or_else(|| ValidationErrorKind::NoTrustAnchor { zone: zone.clone() })?
        .clone();
    let fctx = FetchCtx::from_context(ctx);

    let anchor_zone = anchor.zone().clone();
    let mut current = match ctx.cache.lookup(&anchor_zone, now) {
        Some(entry) => entry,
        None => {
            let fctx = fctx.clone();
            let err_zone = anchor_zone.clone();
            ctx.cache
                .get_or_fetch(&anchor_zone, RecordType::DNSKEY, move || async move {
                    seed_from_anchor(&anchor, class, &fctx)
                        .await
                        .unwrap_or_else(|_| KeyEntry::bad(err_zone, "upstream-unreachable", SystemTime::now()))
                })
                .await
        }
    };

    let start_depth = anchor_zone.label_count();
    let target_depth = zone.label_count();
    for depth in (start_depth + 1)..=target_depth {
        let child_zone = zone
            .ancestor_at_depth(depth)
            .expect("depth never exceeds zone's own label count");
        current = match ctx.cache.lookup(&child_zone, now) {
            Some(entry) => entry,
            None => {
                let parent = Arc::clone(&current);
                let fctx = fctx.clone();
                let fetch_zone = child_zone.clone();
                let err_zone = child_zone.clone();
                ctx.cache
                    .get_or_fetch(&child_zone, RecordType::DS, move || async move {
                        step_delegation(&parent, &fetch_zone, class, &fctx)
                            .await
                            .unwrap_or_else(|_| KeyEntry::bad(err_zone, "upstream-unreachable", SystemTime::now()))
                    })
                    .await
            }
        };
    }

    Ok(current)
}

/// Seed the chain at a trust anchor's own zone: a configured DNSKEY is
/// trusted outright, a configured DS is resolved against a freshly
/// fetched DNSKEY RRset exactly as any other delegation step would be.
async fn seed_from_anchor(anchor: &TrustAnchor, class: Class, fctx: &FetchCtx) -> Result<KeyEntry> {
    match anchor {
        TrustAnchor::DnsKey { zone, dnskey } => Ok(KeyEntry::trusted(
            zone.clone(),
            vec![dnskey.clone()],
            SystemTime::now() + ANCHOR_TTL,
        )),
        TrustAnchor::Ds { zone, ds } => {
            let response = query(fctx.upstream.as_ref(), zone, class, RecordType::DNSKEY).await?;
            match find_rrset(&response.answer, zone, RecordType::DNSKEY) {
                Some(dnskey_rrset) => {
                    let dnskeys = extract_dnskeys(dnskey_rrset);
                    let now = wire_now(&fctx.config);
                    Ok(verify_new_dnskeys(zone, std::slice::from_ref(ds), &dnskeys, dnskey_rrset, now, fctx))
                }
                None => Ok(KeyEntry::bad(zone.clone(), "missing-dnskey-rrset", SystemTime::now())),
            }
        }
    }
}

/// Take one step of the walk from `parent`'s verdict down to `child_zone`.
async fn step_delegation(parent: &KeyEntry, child_zone: &Name, class: Class, fctx: &FetchCtx) -> Result<KeyEntry> {
    match parent.state() {
        KeyEntryState::Bad { .. } => Ok(KeyEntry::bad(child_zone.clone(), "parent-zone-bad", SystemTime::now())),
        KeyEntryState::NullInsecureDelegation => Ok(KeyEntry::null_insecure(
            child_zone.clone(),
            SystemTime::now() + PROPAGATED_NULL_TTL,
        )),
        KeyEntryState::TrustedKeySet { dnskeys: parent_dnskeys } => {
            let response = query(fctx.upstream.as_ref(), child_zone, class, RecordType::DS).await?;
            match classify(&response) {
                ResponseKind::Positive | ResponseKind::Any => match find_rrset(&response.answer, child_zone, RecordType::DS) {
                    Some(ds_rrset) => {
                        let mut ds_rrset = ds_rrset.clone();
                        let now = wire_now(&fctx.config);
                        match verify_rrset(&mut ds_rrset, parent.zone(), parent_dnskeys, now, fctx.backend.as_ref()) {
                            Ok(()) => resolve_ds(&extract_ds(&ds_rrset), child_zone, class, fctx).await,
                            Err(_) => Ok(KeyEntry::bad(child_zone.clone(), "ds-rrset-bogus", SystemTime::now())),
                        }
                    }
                    None => Ok(KeyEntry::bad(child_zone.clone(), "unclassifiable-ds-response", SystemTime::now())),
                },
                ResponseKind::NoData | ResponseKind::NxDomain => {
                    match verify_no_ds_denial(&response, parent.zone(), parent_dnskeys, child_zone, fctx)? {
                        true => Ok(KeyEntry::null_insecure(child_zone.clone(), SystemTime::now() + PROPAGATED_NULL_TTL)),
                        false => Ok(KeyEntry::bad(child_zone.clone(), "no-ds-denial-failed", SystemTime::now())),
                    }
                }
                ResponseKind::Cname | ResponseKind::Unknown => {
                    Ok(KeyEntry::bad(child_zone.clone(), "unclassifiable-ds-response", SystemTime::now()))
                }
            }
        }
    }
}

/// RFC 4035 §5.2 / §5.3 `verifyNewDNSKEYs`: try each DS against each
/// candidate DNSKEY; the first DS whose digest matches a key that also
/// verifies the DNSKEY RRset's own signature wins.
fn verify_new_dnskeys(
    zone: &Name,
    ds_candidates: &[DS],
    dnskeys: &[DNSKEY],
    dnskey_rrset: &RRset,
    now: u32,
    fctx: &FetchCtx,
) -> KeyEntry {
    for ds in ds_candidates {
        for key in dnskeys {
            match ds.matches(zone, key, fctx.backend.as_ref()) {
                Ok(true) => {
                    let mut attempt = dnskey_rrset.clone();
                    if verify_rrset(&mut attempt, zone, std::slice::from_ref(key), now, fctx.backend.as_ref()).is_ok() {
                        let expires_at = min_expiry(&attempt, now);
                        return KeyEntry::trusted(zone.clone(), dnskeys.to_vec(), expires_at);
                    }
                }
                Ok(false) => continue,
                Err(err) => {
                    warn!(zone = %zone, %err, "DS digest computation failed");
                    continue;
                }
            }
        }
    }
    KeyEntry::bad(zone.clone(), "ds-dnskey-mismatch", SystemTime::now())
}

/// The soonest a freshly verified RRset's trust should be considered
/// stale: the lesser of its TTL and the time left before its tightest
/// RRSIG expires.
fn min_expiry(rrset: &RRset, now_wire: u32) -> SystemTime {
    let ttl_bound = Duration::from_secs(u64::from(rrset.ttl()));
    let sig_bound = rrset
        .rrsigs()
        .iter()
        .map(|r| Duration::from_secs(u64::from(r.expiration().saturating_sub(now_wire))))
        .min()
        .unwrap_or(ttl_bound);
    SystemTime::now() + ttl_bound.min(sig_bound)
}

/// A DS RRset's usable candidates after applying the algorithm-downgrade
/// and digest-preference policy.
enum DsSelection {
    /// No DS algorithm present is one this engine implements.
    NoneSupported,
    /// `harden_algo_downgrade` rejects a DS set mixing supported and
    /// unsupported algorithms.
    AlgorithmDowngrade,
    Candidates(Vec<DS>),
}

fn select_ds_candidates(ds_records: &[DS], config: &ValidatorConfig) -> DsSelection {
    use std::collections::BTreeMap;

    let mut by_algorithm: BTreeMap<u8, Vec<&DS>> = BTreeMap::new();
    for ds in ds_records {
        by_algorithm.entry(ds.algorithm().to_u8()).or_default().push(ds);
    }

    let supported_algorithms: Vec<u8> = by_algorithm
        .keys()
        .copied()
        .filter(|&a| Algorithm::from_u8(a).is_supported())
        .collect();
    if supported_algorithms.is_empty() {
        return DsSelection::NoneSupported;
    }
    if config.harden_algo_downgrade && by_algorithm.keys().any(|&a| !Algorithm::from_u8(a).is_supported()) {
        return DsSelection::AlgorithmDowngrade;
    }

    let mut candidates = Vec::new();
    for algorithm in supported_algorithms {
        let group = &by_algorithm[&algorithm];
        let mut by_tag: BTreeMap<u16, Vec<&DS>> = BTreeMap::new();
        for ds in group {
            by_tag.entry(ds.key_tag()).or_default().push(ds);
        }
        for entries in by_tag.values() {
            let digests: Vec<DigestType> = entries.iter().map(|d| d.digest_type()).collect();
            if let Some(preferred) = config.preferred_digest(&digests) {
                if let Some(&ds) = entries.iter().find(|d| d.digest_type() == *preferred) {
                    candidates.push(ds.clone());
                }
            }
        }
    }

    if candidates.is_empty() {
        DsSelection::NoneSupported
    } else {
        DsSelection::Candidates(candidates)
    }
}

async fn resolve_ds(ds_records: &[DS], child_zone: &Name, class: Class, fctx: &FetchCtx) -> Result<KeyEntry> {
    match select_ds_candidates(ds_records, &fctx.config) {
        DsSelection::NoneSupported => Ok(KeyEntry::null_insecure(child_zone.clone(), SystemTime::now() + PROPAGATED_NULL_TTL)),
        DsSelection::AlgorithmDowngrade => Ok(KeyEntry::bad(child_zone.clone(), "algorithm-downgrade", SystemTime::now())),
        DsSelection::Candidates(candidates) => {
            let response = query(fctx.upstream.as_ref(), child_zone, class, RecordType::DNSKEY).await?;
            match find_rrset(&response.answer, child_zone, RecordType::DNSKEY) {
                Some(dnskey_rrset) => {
                    let dnskeys = extract_dnskeys(dnskey_rrset);
                    let now = wire_now(&fctx.config);
                    Ok(verify_new_dnskeys(child_zone, &candidates, &dnskeys, dnskey_rrset, now, fctx))
                }
                None => Ok(KeyEntry::bad(child_zone.clone(), "missing-dnskey-rrset", SystemTime::now())),
            }
        }
    }
}

/// No-DS proof (RFC 4035 §5.2, RFC 5155 §8.6): verify whatever NSEC/NSEC3
/// rrsets appear in a NODATA/NXDOMAIN response to a DS query under
/// `parent_dnskeys`, then apply the denial rule. `Ok(true)` means the
/// delegation is proven unsigned; `Ok(false)` means the proof failed
/// (BOGUS).
fn verify_no_ds_denial(
    msg: &SMessage,
    parent_zone: &Name,
    parent_dnskeys: &[DNSKEY],
    child_zone: &Name,
    fctx: &FetchCtx,
) -> Result<bool> {
    let now = wire_now(&fctx.config);

    let nsec3_rrsets: Vec<RRset> = msg
        .authority
        .iter()
        .filter(|r| r.record_type() == RecordType::NSEC3)
        .cloned()
        .collect();
    if !nsec3_rrsets.is_empty() {
        let mut verified = Vec::with_capacity(nsec3_rrsets.len());
        for mut rrset in nsec3_rrsets {
            if verify_rrset(&mut rrset, parent_zone, parent_dnskeys, now, fctx.backend.as_ref()).is_err() {
                return Ok(false);
            }
            verified.push(rrset);
        }
        let collected = nsec3::collect(&verified);
        let params = match nsec3::Nsec3Params::from_records(&collected) {
            Some(p) => p,
            None => return Ok(false),
        };
        if nsec3::iterations_exceed_cap(&params, parent_dnskeys, &fctx.config) {
            return Ok(true);
        }
        return Ok(matches!(
            nsec3::proves_no_ds(&collected, child_zone, &params, fctx.backend.as_ref())?,
            nsec3::NoDsOutcome::Insecure
        ));
    }

    let nsec_rrsets: Vec<RRset> = msg
        .authority
        .iter()
        .filter(|r| r.record_type() == RecordType::NSEC)
        .cloned()
        .collect();
    if nsec_rrsets.is_empty() {
        return Ok(false);
    }
    let mut verified = Vec::with_capacity(nsec_rrsets.len());
    for mut rrset in nsec_rrsets {
        if verify_rrset(&mut rrset, parent_zone, parent_dnskeys, now, fctx.backend.as_ref()).is_err() {
            return Ok(false);
        }
        verified.push(rrset);
    }
    let collected = nsec::collect(&verified);
    Ok(matches!(nsec::proves_no_ds(&collected, child_zone), nsec::NoDsOutcome::Insecure))
}

pub(crate) async fn query(upstream: &dyn Upstream, zone: &Name, class: Class, qtype: RecordType) -> Result<SMessage> {
    let question = Question { qname: zone.clone(), qclass: class, qtype };
    upstream
        .send(&question)
        .await
        .map_err(|err| ValidationErrorKind::Unreachable { zone: zone.clone(), source: Box::new(err) }.into())
}

fn find_rrset<'a>(section: &'a [RRset], owner: &Name, rtype: RecordType) -> Option<&'a RRset> {
    section.iter().find(|r| r.name() == owner && r.record_type() == rtype)
}

fn extract_ds(rrset: &RRset) -> Vec<DS> {
    rrset
        .rdata()
        .iter()
        .filter_map(|d| match d {
            RData::DS(ds) => Some(ds.clone()),
            _ => None,
        })
        .collect()
}

fn extract_dnskeys(rrset: &RRset) -> Vec<DNSKEY> {
    rrset
        .rdata()
        .iter()
        .filter_map(|d| match d {
            RData::DNSKEY(k) => Some(k.clone()),
            _ => None,
        })
        .collect()
}
