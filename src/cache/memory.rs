use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::TtlCache;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process TTL map. Expired entries are dropped lazily on read and in bulk by `sweep`.
#[derive(Clone, Default)]
pub struct MemoryTtlCache {
    map: Arc<RwLock<HashMap<String, Entry>>>,
    puts: Arc<AtomicUsize>,
    fail_puts: Arc<AtomicBool>,
}

impl MemoryTtlCache {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.map.read().len() }

    pub fn is_empty(&self) -> bool { self.map.read().is_empty() }

    pub fn delete(&self, key: &str) -> bool { self.map.write().remove(key).is_some() }

    /// Number of successful `put` calls since construction.
    pub fn put_count(&self) -> usize { self.puts.load(Ordering::SeqCst) }

    /// Make subsequent `put` calls fail; used to exercise detached-write error handling.
    pub fn set_fail_puts(&self, fail: bool) { self.fail_puts.store(fail, Ordering::SeqCst); }

    fn get_sync(&self, key: &str) -> Option<Vec<u8>> {
        {
            let r = self.map.read();
            match r.get(key) {
                Some(ent) if Instant::now() < ent.expires_at => return Some(ent.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: re-check under the write lock since a concurrent put may have refreshed it.
        let mut w = self.map.write();
        if let Some(ent) = w.get(key) {
            if Instant::now() >= ent.expires_at { w.remove(key); } else { return Some(ent.value.clone()); }
        }
        None
    }

    fn sweep_sync(&self) -> usize {
        let now = Instant::now();
        let mut w = self.map.write();
        let before = w.len();
        w.retain(|_, ent| now < ent.expires_at);
        before - w.len()
    }
}

#[async_trait]
impl TtlCache for MemoryTtlCache {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        Ok(self.get_sync(key))
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> AppResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(AppError::internal(format!("cache put rejected for key '{}'", key)));
        }
        let ent = Entry { value, expires_at: Instant::now() + ttl };
        self.map.write().insert(key.to_string(), ent);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn sweep(&self) -> usize { self.sweep_sync() }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
