// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for successful address resolutions.
//!
//! A user typing into the send screen triggers the same lookup repeatedly;
//! caching successful answers keeps those lookups off the network.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;

use super::AddressResult;

/// Default number of cached resolutions.
pub const DEFAULT_CAPACITY: usize = 128;

struct CacheEntry {
    result: AddressResult,
    inserted_at: Instant,
}

/// In-process LRU cache keyed by target and currency pair.
pub struct ResolutionCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn cache_key(target: &str, currency_code: &str, native_currency_code: &str) -> String {
    format!(
        "{}|{}|{}",
        target.trim().to_lowercase(),
        currency_code.to_lowercase(),
        native_currency_code.to_lowercase()
    )
}

impl ResolutionCache {
    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a cache holding at most `capacity` results for `ttl` each.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Returns `None` if not cached or expired.
    pub fn get(
        &self,
        target: &str,
        currency_code: &str,
        native_currency_code: &str,
    ) -> Option<AddressResult> {
        let key = cache_key(target, currency_code, native_currency_code);
        let mut cache = self.lock();
        if let Some(entry) = cache.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.result.clone());
            }
            cache.pop(&key);
        }
        None
    }

    /// Store a result. Only successes are kept.
    pub fn put(
        &self,
        target: &str,
        currency_code: &str,
        native_currency_code: &str,
        result: &AddressResult,
    ) {
        if !result.is_success() {
            return;
        }
        let key = cache_key(target, currency_code, native_currency_code);
        self.lock().put(
            key,
            CacheEntry {
                result: result.clone(),
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
