use super::*;

#[tokio::test]
async fn get_returns_value_before_expiry() {
    let cache = MemoryTtlCache::new();
    cache.put("k", b"v1".to_vec(), Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap().as_deref(), Some(&b"v1"[..]));
    assert_eq!(cache.put_count(), 1);
}

#[tokio::test]
async fn expired_entry_is_invisible_and_removed() {
    let cache = MemoryTtlCache::new();
    cache.put("k", b"v".to_vec(), Duration::from_millis(20)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(cache.get("k").await.unwrap().is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn put_replaces_whole_value() {
    let cache = MemoryTtlCache::new();
    cache.put("k", b"old".to_vec(), Duration::from_secs(60)).await.unwrap();
    cache.put("k", b"new".to_vec(), Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap().as_deref(), Some(&b"new"[..]));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn sweep_drops_only_expired() {
    let cache = MemoryTtlCache::new();
    cache.put("short", vec![1], Duration::from_millis(10)).await.unwrap();
    cache.put("long", vec![2], Duration::from_secs(60)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(TtlCache::sweep(&cache), 1);
    assert_eq!(cache.len(), 1);
    assert!(cache.get("long").await.unwrap().is_some());
}

#[tokio::test]
async fn failing_put_reports_error() {
    let cache = MemoryTtlCache::new();
    cache.set_fail_puts(true);
    assert!(cache.put("k", vec![], Duration::from_secs(1)).await.is_err());
    assert_eq!(cache.put_count(), 0);
    assert!(cache.get("k").await.unwrap().is_none());
}
