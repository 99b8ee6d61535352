use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::assets::{flatten, AssetRecord, ContentUrls};
use crate::cache::TtlCache;
use crate::error::AppResult;
use crate::remote::RemoteStore;
use crate::tprintln;

/// Cached list of every image asset in the repository.
///
/// One cache entry per index, keyed by the repository identity rather than anything
/// request-specific. A hit never touches the upstream; a miss performs one tree fetch and
/// stores the result in a detached task so the caller does not wait on the cache write.
/// Mutations do not invalidate the entry: readers may lag upstream by up to one TTL.
pub struct TreeIndex {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn TtlCache>,
    urls: ContentUrls,
    key: String,
    ttl: Duration,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl TreeIndex {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        cache: Arc<dyn TtlCache>,
        urls: ContentUrls,
        identity: &str,
        ttl: Duration,
    ) -> Self {
        Self {
            remote,
            cache,
            urls,
            key: format!("imgvault:asset-index:{}", identity),
            ttl,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn cache_key(&self) -> &str { &self.key }

    pub fn urls(&self) -> &ContentUrls { &self.urls }

    pub async fn get_index(&self) -> AppResult<Vec<AssetRecord>> {
        match self.cache.get(&self.key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<AssetRecord>>(&bytes) {
                Ok(records) => {
                    tprintln!("index.hit key={} count={}", self.key, records.len());
                    return Ok(records);
                }
                Err(e) => warn!(target: "imgvault::index", key = %self.key, error = %e, "discarding unreadable cache entry"),
            },
            Ok(None) => {}
            Err(e) => warn!(target: "imgvault::index", key = %self.key, error = %e, "cache read failed; treating as miss"),
        }

        let tree = self.remote.fetch_tree().await?;
        let records = flatten(&tree, &self.urls);
        debug!(target: "imgvault::index", key = %self.key, objects = tree.len(), assets = records.len(), "rebuilt asset index");

        match serde_json::to_vec(&records) {
            Ok(bytes) => self.store_detached(bytes),
            Err(e) => warn!(target: "imgvault::index", error = %e, "index serialization failed; not caching"),
        }
        Ok(records)
    }

    fn store_detached(&self, bytes: Vec<u8>) {
        let cache = Arc::clone(&self.cache);
        let key = self.key.clone();
        let ttl = self.ttl;
        let handle = tokio::spawn(async move {
            if let Err(e) = cache.put(&key, bytes, ttl).await {
                warn!(target: "imgvault::index", key = %key, error = %e, "detached cache write failed");
            }
        });
        let mut pending = self.pending.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for outstanding detached cache writes.
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.pending.lock());
        for h in handles {
            let _ = h.await;
        }
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod index_tests;
