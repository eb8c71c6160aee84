//! Process-local identity store
//!
//! Sharded maps from `dashmap`; each operation holds its shard lock for the
//! whole read-modify-write, which gives the atomicity the trait requires.

use crate::{IdentityStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

/// In-memory [`IdentityStore`] for single-process deployments and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: DashMap<String, String>,
    counters: DashMap<String, WindowCounter>,
    sets: DashMap<String, HashSet<String>>,
    lists: DashMap<String, VecDeque<String>>,
}

/// Counter whose window is fixed at its first increment
#[derive(Debug)]
struct WindowCounter {
    count: u64,
    expires_at: Instant,
}

impl WindowCounter {
    fn live_count(&self, now: Instant) -> u64 {
        if self.expires_at > now {
            self.count
        } else {
            0
        }
    }
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) counters
    pub fn counter_count(&self) -> usize {
        let now = Instant::now();
        self.counters
            .iter()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    /// Drop expired counters
    ///
    /// Expired counters already read as zero; this only reclaims memory.
    /// Long-running hosts call it periodically.
    pub fn evict_expired(&self) {
        let now = Instant::now();
        self.counters.retain(|_, counter| counter.expires_at > now);
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut counter = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| WindowCounter {
                count: 0,
                expires_at: now + window,
            });

        // Re-arm only when the previous window has lapsed
        if counter.expires_at <= now {
            counter.count = 0;
            counter.expires_at = now + window;
        }
        counter.count += 1;
        Ok(counter.count)
    }

    async fn counter(&self, key: &str) -> Result<u64, StoreError> {
        let now = Instant::now();
        Ok(self
            .counters
            .get(key)
            .map(|counter| counter.live_count(now))
            .unwrap_or(0))
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        Ok(self
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn set_len(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.sets.get(key).map(|set| set.len()).unwrap_or(0))
    }

    async fn list_push_capped(
        &self,
        key: &str,
        value: &str,
        capacity: usize,
    ) -> Result<(), StoreError> {
        let mut list = self.lists.entry(key.to_string()).or_default();
        list.push_front(value.to_string());
        list.truncate(capacity.max(1));
        Ok(())
    }

    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lists
            .get(key)
            .map(|list| list.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
