//! identity-store: shared per-identity state for the trust engine
//!
//! Every evaluation reads and mutates a handful of keys for the identity it
//! scores: the last observed origin, a windowed request counter, the set of
//! recognised device fingerprints and the most recent score. Decisions are
//! appended to a capped log. This crate models that key space as a small
//! key-value abstraction so the atomicity rules live in one place:
//!
//! - **Windowed counters**: increment, read and first-time expiry arming happen
//!   as one operation. The window is fixed from its first increment; later
//!   increments never push the expiry out.
//! - **Sets**: membership test and insert are a single operation that reports
//!   whether the member was newly added.
//! - **Capped lists**: push-front and trim happen together.
//!
//! Backends:
//!
//! - [`MemoryStore`]: process-local, sharded via `dashmap`
//! - [`RedisStore`]: shared across gateway replicas
//! - [`TimedStore`]: wraps either one and bounds every operation with a timeout
//!
//! # Example
//!
//! ```rust,ignore
//! use identity_store::{IdentityStore, MemoryStore, TimedStore};
//! use std::time::Duration;
//!
//! let store = TimedStore::new(MemoryStore::new(), Duration::from_millis(250));
//! let count = store.incr_window("user:alice:access_count", Duration::from_secs(60)).await?;
//! let first_sight = store.set_add("user:alice:devices", "3f2a...").await?;
//! ```

pub mod memory;
pub mod redis_store;
pub mod timed;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use timed::TimedStore;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error type for store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("corrupt value at {key}: {detail}")]
    Corrupt { key: String, detail: String },
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Key-value operations the trust engine needs from its backing store.
///
/// Implementations must make `incr_window`, `set_add` and `list_push_capped`
/// atomic with respect to concurrent callers on the same key.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Read a plain string value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite a plain string value (last writer wins).
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Increment the counter at `key` and return the post-increment count.
    ///
    /// The first increment of a window arms `window` as the counter's expiry.
    /// Once the expiry lapses the counter starts over at 1.
    async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, StoreError>;

    /// Current value of a windowed counter, 0 if absent or expired.
    async fn counter(&self, key: &str) -> Result<u64, StoreError>;

    /// Add `member` to the set at `key`. Returns `true` if it was not present.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Number of members in the set at `key`.
    async fn set_len(&self, key: &str) -> Result<usize, StoreError>;

    /// Push `value` to the front of the list at `key`, keeping only the
    /// `capacity` most recent entries.
    async fn list_push_capped(
        &self,
        key: &str,
        value: &str,
        capacity: usize,
    ) -> Result<(), StoreError>;

    /// Up to `limit` entries of the list at `key`, newest first.
    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError>;

    /// Liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: IdentityStore + ?Sized> IdentityStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        (**self).incr_window(key, window).await
    }

    async fn counter(&self, key: &str) -> Result<u64, StoreError> {
        (**self).counter(key).await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        (**self).set_add(key, member).await
    }

    async fn set_len(&self, key: &str) -> Result<usize, StoreError> {
        (**self).set_len(key).await
    }

    async fn list_push_capped(
        &self,
        key: &str,
        value: &str,
        capacity: usize,
    ) -> Result<(), StoreError> {
        (**self).list_push_capped(key, value, capacity).await
    }

    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        (**self).list_range(key, limit).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        (**self).ping().await
    }
}

/// Shared, type-erased store handle
pub type SharedStore = Arc<dyn IdentityStore>;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{IdentityStore, MemoryStore, RedisStore, SharedStore, StoreError, TimedStore};
}
