//! Time-boxed cache of cleaned fetch results. Entries carry wall-clock
//! timestamps so the cache can be saved between runs and reloaded.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bars::{Bar, Interval, Period};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 30);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
}

impl CacheKey {
    pub fn new(symbol: &str, period: Period, interval: Interval) -> Self {
        Self {
            symbol: symbol.to_string(),
            period,
            interval,
        }
    }
}

/// One cached fetch as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedEntry {
    pub key: CacheKey,
    pub stored_at: DateTime<Utc>,
    pub bars: Vec<Bar>,
}

/// On-disk form of the whole cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    #[serde(default)]
    pub entries: Vec<SavedEntry>,
}

// Entries stamped in the future (clock moved back) count as stale.
fn is_fresh(ttl: Duration, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (now - stored_at).to_std().is_ok_and(|age| age < ttl)
}

struct Entry {
    stored_at: DateTime<Utc>,
    bars: Vec<Bar>,
}

/// Fetch results keyed by request parameters, valid for `ttl` after insertion.
pub struct FetchCache {
    ttl: Duration,
    entries: HashMap<CacheKey, Entry>,
}

impl FetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Rebuilds a cache from a saved snapshot, keeping only entries still
    /// fresh at `now`.
    pub fn from_snapshot(ttl: Duration, snapshot: CacheSnapshot, now: DateTime<Utc>) -> Self {
        let mut cache = Self::new(ttl);
        let saved = snapshot.entries.len();
        for entry in snapshot.entries {
            if is_fresh(ttl, entry.stored_at, now) {
                cache.entries.insert(
                    entry.key,
                    Entry {
                        stored_at: entry.stored_at,
                        bars: entry.bars,
                    },
                );
            }
        }
        debug!(
            saved,
            kept = cache.entries.len(),
            ttl_secs = ttl.as_secs(),
            "restored fetch cache"
        );
        cache
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let mut entries: Vec<SavedEntry> = self
            .entries
            .iter()
            .map(|(key, entry)| SavedEntry {
                key: key.clone(),
                stored_at: entry.stored_at,
                bars: entry.bars.clone(),
            })
            .collect();
        entries.sort_by(|a, b| {
            a.key
                .symbol
                .cmp(&b.key.symbol)
                .then(a.stored_at.cmp(&b.stored_at))
        });
        CacheSnapshot { entries }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<Vec<Bar>> {
        self.get_at(key, Utc::now())
    }

    /// Returns a copy of the cached bars if the entry is still fresh at `now`.
    /// Stale entries are evicted.
    pub fn get_at(&mut self, key: &CacheKey, now: DateTime<Utc>) -> Option<Vec<Bar>> {
        let stored_at = self.entries.get(key)?.stored_at;

        if !is_fresh(self.ttl, stored_at, now) {
            debug!(symbol = %key.symbol, period = %key.period, "evicting stale cache entry");
            self.entries.remove(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.bars.clone())
    }

    pub fn insert(&mut self, key: CacheKey, bars: Vec<Bar>) {
        self.insert_at(key, bars, Utc::now());
    }

    /// Stores `bars` under `key` and sweeps every entry that is stale at `now`.
    pub fn insert_at(&mut self, key: CacheKey, bars: Vec<Bar>, now: DateTime<Utc>) {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| is_fresh(ttl, entry.stored_at, now));
        let swept = before - self.entries.len();
        if swept > 0 {
            debug!(swept, "swept stale cache entries");
        }

        self.entries.insert(
            key,
            Entry {
                stored_at: now,
                bars,
            },
        );
    }
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
