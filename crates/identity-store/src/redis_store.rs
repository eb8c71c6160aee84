//! Redis-backed identity store
//!
//! Key layout is owned by the caller; this backend maps each trait operation
//! onto one Redis round trip. The windowed increment runs as a Lua script so
//! INCR and the first-time PEXPIRE cannot interleave with another client.

use crate::{IdentityStore, StoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::time::Duration;
use tracing::debug;

/// Arms the expiry on the first increment of a window. The PTTL guard also
/// repairs a counter left without expiry (e.g. written by an older client).
const INCR_WINDOW_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 or redis.call('PTTL', KEYS[1]) < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

/// [`IdentityStore`] over a shared Redis instance
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    incr_window: Script,
}

impl RedisStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379`)
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        debug!(redis_url = %url, "Connected identity store to Redis");
        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection manager
    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self {
            conn,
            incr_window: Script::new(INCR_WINDOW_SCRIPT),
        }
    }
}

fn window_millis(window: Duration) -> u64 {
    u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl IdentityStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let count: i64 = self
            .incr_window
            .key(key)
            .arg(window_millis(window))
            .invoke_async(&mut conn)
            .await?;
        u64::try_from(count).map_err(|_| StoreError::Corrupt {
            key: key.to_string(),
            detail: format!("negative counter {}", count),
        })
    }

    async fn counter(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            None => Ok(0),
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| StoreError::Corrupt {
                key: key.to_string(),
                detail: format!("not a counter: {:?}", raw),
            }),
        }
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let added: i64 = conn.sadd(key, member).await?;
        Ok(added > 0)
    }

    async fn set_len(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        let len: usize = conn.scard(key).await?;
        Ok(len)
    }

    async fn list_push_capped(
        &self,
        key: &str,
        value: &str,
        capacity: usize,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let stop = isize::try_from(capacity.max(1)).unwrap_or(isize::MAX) - 1;
        let _: () = redis::pipe()
            .atomic()
            .lpush(key, value)
            .ignore()
            .ltrim(key, 0, stop)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let stop = isize::try_from(limit).unwrap_or(isize::MAX) - 1;
        let entries: Vec<String> = conn.lrange(key, 0, stop).await?;
        Ok(entries)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
