//! Redis backend tests; run with `REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored`

use identity_store::{IdentityStore, RedisStore};
use std::time::Duration;

async fn connect() -> RedisStore {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    RedisStore::connect(&url).await.expect("redis reachable")
}

fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("test:{}:{}", prefix, nanos)
}

#[tokio::test]
#[ignore]
async fn test_redis_incr_window_fixed_expiry() {
    let store = connect().await;
    let key = unique("ctr");
    let window = Duration::from_millis(300);

    assert_eq!(store.incr_window(&key, window).await.unwrap(), 1);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(store.incr_window(&key, window).await.unwrap(), 2);

    // Second increment must not have refreshed the expiry
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(store.counter(&key).await.unwrap(), 0);
    assert_eq!(store.incr_window(&key, window).await.unwrap(), 1);
}

#[tokio::test]
#[ignore]
async fn test_redis_set_add_and_capped_list() {
    let store = connect().await;
    let devices = unique("devices");
    let log = unique("log");

    assert!(store.set_add(&devices, "fp-1").await.unwrap());
    assert!(!store.set_add(&devices, "fp-1").await.unwrap());
    assert_eq!(store.set_len(&devices).await.unwrap(), 1);

    for i in 0..7 {
        store
            .list_push_capped(&log, &i.to_string(), 5)
            .await
            .unwrap();
    }
    let entries = store.list_range(&log, 10).await.unwrap();
    assert_eq!(entries, vec!["6", "5", "4", "3", "2"]);
    store.ping().await.unwrap();
}
