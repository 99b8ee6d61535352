//! TTL-bounded key/value cache used for derived state (the asset index).
//! The cache is injected behind a trait so the server can run against an external store
//! while tests use the in-process map.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppResult;

pub mod memory;

pub use memory::MemoryTtlCache;

#[async_trait]
pub trait TtlCache: Send + Sync {
    /// Return the stored value if present and unexpired.
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>>;

    /// Replace the value under `key`; it becomes invisible once `ttl` elapses.
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> AppResult<()>;

    /// Drop expired entries. Returns the number removed. Stores with native expiry return 0.
    fn sweep(&self) -> usize { 0 }
}
