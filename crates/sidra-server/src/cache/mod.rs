//! In-memory TTL cache for upstream-backed GET responses.
//!
//! The store is owned explicitly: constructed at process start, held in
//! `AppState` behind an `Arc`, and injected wherever it is needed. It is
//! unbounded and lives for the whole process; writes are last-write-wins
//! and concurrent misses for the same key may each hit the upstream.

pub mod middleware;

use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use serde::Serialize;

/// One buffered response. Servable only while `expires_at` is in the
/// future; an expired entry is logically absent even while still present
/// in the map.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub body: Bytes,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(body: Bytes, status: u16, headers: Vec<(String, String)>, ttl: Duration) -> Self {
        Self {
            body,
            status,
            headers,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn approx_size(&self) -> usize {
        self.body.len()
            + self
                .headers
                .iter()
                .map(|(name, value)| name.len() + value.len())
                .sum::<usize>()
    }
}

/// Snapshot of the store, serialized with the wire names the frontend
/// consumes. Counts expired-but-present entries; there is no reaper.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsSnapshot {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub approx_size_bytes: usize,
}

#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `key` if it has not expired. An expired entry
    /// is removed on the way out (lazy eviction).
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Some(entry.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn set(&self, key: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        tracing::info!("clearing response cache");
        self.entries.clear();
    }

    /// Full scan, O(n). Fine for the admin stats endpoint.
    pub fn stats(&self) -> CacheStatsSnapshot {
        let mut valid = 0;
        let mut expired = 0;
        let mut size = 0;
        for entry in self.entries.iter() {
            if entry.is_expired() {
                expired += 1;
            } else {
                valid += 1;
            }
            size += entry.approx_size();
        }
        CacheStatsSnapshot {
            total_entries: self.entries.len(),
            valid_entries: valid,
            expired_entries: expired,
            approx_size_bytes: size,
        }
    }
}
