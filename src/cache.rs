// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The Key Cache: the only shared mutable state across concurrently
//! validating events. Lookup/insert/evict-expired are linearizable; a
//! single in-flight fetch per (zone, qtype) is maintained so concurrent
//! events asking for the same zone's keys share one upstream round trip
//! instead of issuing duplicates.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use futures_util::future::{FutureExt, Shared};
use lru::LruCache;
use tracing::debug;

use crate::keyentry::KeyEntry;
use crate::name::Name;
use crate::rr::RecordType;

/// Default bound on the number of zones tracked at once: bounded
/// key-cache size with TTL-expiry and LRU eviction.
pub const DEFAULT_CAPACITY: usize = 10_000;

type PendingFetch = Shared<Pin<Box<dyn Future<Output = Arc<KeyEntry>> + Send>>>;

/// The shared, linearizable cache of per-zone [`KeyEntry`] verdicts.
pub struct KeyCache {
    entries: Mutex<LruCache<Name, Arc<KeyEntry>>>,
    in_flight: Mutex<HashMap<(Name, RecordType), PendingFetch>>,
}

impl KeyCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).expect("1 is nonzero"));
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Lookup a zone's cached entry. Returns `None` if absent or expired;
    /// an expired entry found along the way is evicted.
    pub fn lookup(&self, zone: &Name, now: SystemTime) -> Option<Arc<KeyEntry>> {
        let mut entries = self.entries.lock().expect("key cache lock poisoned");
        match entries.get(zone) {
            Some(entry) if !entry.is_expired(now) => Some(Arc::clone(entry)),
            Some(_) => {
                entries.pop(zone);
                None
            }
            None => None,
        }
    }

    /// Only fully verified entries are cached: cancellation must not write
    /// partial results. Callers are responsible for only calling this with
    /// a terminal `KeyEntry`.
    pub fn insert(&self, entry: KeyEntry) {
        let mut entries = self.entries.lock().expect("key cache lock poisoned");
        entries.put(entry.zone().clone(), Arc::new(entry));
    }

    /// Sweep expired entries proactively (callable on a timer by the
    /// embedding application; lookups also self-evict lazily).
    pub fn evict_expired(&self, now: SystemTime) {
        let mut entries = self.entries.lock().expect("key cache lock poisoned");
        let expired: Vec<Name> = entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(zone, _)| zone.clone())
            .collect();
        for zone in expired {
            entries.pop(&zone);
        }
    }

    /// Resolve a `(zone, qtype)` fetch, collapsing concurrent callers onto
    /// one in-flight upstream query. `fetch` is invoked at most once per
    /// distinct key among callers that overlap in time. Whichever caller is
    /// first to observe the shared fetch's completion also persists the
    /// result into the entry cache, so the other joined callers don't
    /// redundantly re-insert the same verdict.
    pub async fn get_or_fetch<F, Fut>(&self, zone: &Name, qtype: RecordType, fetch: F) -> Arc<KeyEntry>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = KeyEntry> + Send + 'static,
    {
        let key = (zone.clone(), qtype);

        let shared = {
            let mut in_flight = self.in_flight.lock().expect("in-flight map lock poisoned");
            match in_flight.get(&key) {
                Some(existing) => {
                    debug!(zone = %zone, ?qtype, "joining in-flight fetch");
                    existing.clone()
                }
                None => {
                    let boxed: Pin<Box<dyn Future<Output = Arc<KeyEntry>> + Send>> =
                        Box::pin(async move { Arc::new(fetch().await) });
                    let shared: PendingFetch = boxed.shared();
                    in_flight.insert(key.clone(), shared.clone());
                    shared
                }
            }
        };

        let result = shared.await;

        let won_removal = {
            let mut in_flight = self.in_flight.lock().expect("in-flight map lock poisoned");
            in_flight.remove(&key).is_some()
        };
        if won_removal {
            let mut entries = self.entries.lock().expect("key cache lock poisoned");
            entries.put(zone.clone(), Arc::clone(&result));
        }

        result
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
