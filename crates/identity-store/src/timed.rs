//! Per-operation timeout decorator
//!
//! Store calls sit on the request path, so a slow or unreachable backend must
//! surface as [`StoreError::Timeout`] rather than stall the caller.

use crate::{IdentityStore, StoreError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Wraps any [`IdentityStore`] and bounds each operation by `timeout`
#[derive(Debug, Clone)]
pub struct TimedStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimedStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, timeout_ms = self.timeout.as_millis() as u64, "Store operation timed out");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl<S: IdentityStore> IdentityStore for TimedStore<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.bounded("set", self.inner.set(key, value)).await
    }

    async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        self.bounded("incr_window", self.inner.incr_window(key, window))
            .await
    }

    async fn counter(&self, key: &str) -> Result<u64, StoreError> {
        self.bounded("counter", self.inner.counter(key)).await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.bounded("set_add", self.inner.set_add(key, member)).await
    }

    async fn set_len(&self, key: &str) -> Result<usize, StoreError> {
        self.bounded("set_len", self.inner.set_len(key)).await
    }

    async fn list_push_capped(
        &self,
        key: &str,
        value: &str,
        capacity: usize,
    ) -> Result<(), StoreError> {
        self.bounded(
            "list_push_capped",
            self.inner.list_push_capped(key, value, capacity),
        )
        .await
    }

    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        self.bounded("list_range", self.inner.list_range(key, limit))
            .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.bounded("ping", self.inner.ping()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    /// Backend that never answers within any reasonable timeout
    struct StalledStore;

    #[async_trait]
    impl IdentityStore for StalledStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
        async fn incr_window(&self, _key: &str, _window: Duration) -> Result<u64, StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(1)
        }
        async fn counter(&self, _key: &str) -> Result<u64, StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(0)
        }
        async fn set_add(&self, _key: &str, _member: &str) -> Result<bool, StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(true)
        }
        async fn set_len(&self, _key: &str) -> Result<usize, StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(0)
        }
        async fn list_push_capped(
            &self,
            _key: &str,
            _value: &str,
            _capacity: usize,
        ) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
        async fn list_range(&self, _key: &str, _limit: usize) -> Result<Vec<String>, StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
        async fn ping(&self) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_backend_times_out() {
        let store = TimedStore::new(StalledStore, Duration::from_millis(250));

        let err = store
            .incr_window("ctr", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Timeout(Duration::from_millis(250)));

        assert!(matches!(
            store.ping().await,
            Err(StoreError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_fast_backend_passes_through() {
        let store = TimedStore::new(MemoryStore::new(), Duration::from_millis(250));

        assert_eq!(
            store
                .incr_window("ctr", Duration::from_secs(60))
                .await
                .unwrap(),
            1
        );
        assert!(store.set_add("devices", "fp").await.unwrap());
        assert!(!store.set_add("devices", "fp").await.unwrap());
        assert_eq!(store.timeout(), Duration::from_millis(250));
    }
}
