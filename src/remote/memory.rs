use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::backend::{ContentSource, RemoteStore};
use super::types::{sort_entries, DirectoryEntry, EntryKind, TreeItem};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
struct Blob {
    bytes: Vec<u8>,
    sha: String,
}

#[derive(Default)]
struct Counters {
    tree_fetches: AtomicUsize,
    listings: AtomicUsize,
    writes: AtomicUsize,
    deletes: AtomicUsize,
    downloads: AtomicUsize,
}

#[derive(Default)]
struct Faults {
    tree: AtomicBool,
    writes: AtomicBool,
    deletes: AtomicBool,
    downloads: AtomicBool,
}

/// In-process repository. Files live in a sorted map keyed by path; directories are
/// implied by file paths. Also serves raw content under `raw_root`.
#[derive(Clone)]
pub struct MemoryRemote {
    files: Arc<RwLock<BTreeMap<String, Blob>>>,
    raw_root: String,
    counters: Arc<Counters>,
    faults: Arc<Faults>,
}

impl MemoryRemote {
    /// `raw_root` is the absolute URL prefix that `download` resolves paths against.
    pub fn new(raw_root: impl Into<String>) -> Self {
        Self {
            files: Arc::new(RwLock::new(BTreeMap::new())),
            raw_root: raw_root.into().trim_end_matches('/').to_string(),
            counters: Arc::new(Counters::default()),
            faults: Arc::new(Faults::default()),
        }
    }

    pub fn for_config(cfg: &AppConfig) -> Self {
        Self::new(format!("{}/{}/{}", cfg.raw_base, cfg.repo, cfg.branch))
    }

    /// Seed a file directly, bypassing counters. Returns its version token.
    pub fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) -> String {
        let sha = Uuid::new_v4().simple().to_string();
        self.files.write().insert(path.to_string(), Blob { bytes: bytes.into(), sha: sha.clone() });
        sha
    }

    pub fn contains(&self, path: &str) -> bool { self.files.read().contains_key(path) }
    pub fn read(&self, path: &str) -> Option<Vec<u8>> { self.files.read().get(path).map(|b| b.bytes.clone()) }
    pub fn sha_of(&self, path: &str) -> Option<String> { self.files.read().get(path).map(|b| b.sha.clone()) }
    pub fn raw_url(&self, path: &str) -> String { format!("{}/{}", self.raw_root, path) }

    pub fn tree_fetches(&self) -> usize { self.counters.tree_fetches.load(Ordering::SeqCst) }
    pub fn listings(&self) -> usize { self.counters.listings.load(Ordering::SeqCst) }
    pub fn writes(&self) -> usize { self.counters.writes.load(Ordering::SeqCst) }
    pub fn deletes(&self) -> usize { self.counters.deletes.load(Ordering::SeqCst) }
    pub fn downloads(&self) -> usize { self.counters.downloads.load(Ordering::SeqCst) }

    /// Total upstream calls of any kind.
    pub fn calls(&self) -> usize {
        self.tree_fetches() + self.listings() + self.writes() + self.deletes() + self.downloads()
    }

    pub fn fail_tree(&self, on: bool) { self.faults.tree.store(on, Ordering::SeqCst); }
    pub fn fail_writes(&self, on: bool) { self.faults.writes.store(on, Ordering::SeqCst); }
    pub fn fail_deletes(&self, on: bool) { self.faults.deletes.store(on, Ordering::SeqCst); }
    pub fn fail_downloads(&self, on: bool) { self.faults.downloads.store(on, Ordering::SeqCst); }

    fn dirs(files: &BTreeMap<String, Blob>) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for path in files.keys() {
            let mut cur = path.as_str();
            while let Some((parent, _)) = cur.rsplit_once('/') {
                out.insert(parent.to_string());
                cur = parent;
            }
        }
        out
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch_tree(&self) -> AppResult<Vec<TreeItem>> {
        self.counters.tree_fetches.fetch_add(1, Ordering::SeqCst);
        if self.faults.tree.load(Ordering::SeqCst) {
            return Err(AppError::upstream("tree fetch failed: HTTP 503"));
        }
        let files = self.files.read();
        let mut items: Vec<TreeItem> = Self::dirs(&files).into_iter().map(TreeItem::dir).collect();
        items.extend(files.keys().cloned().map(TreeItem::file));
        Ok(items)
    }

    async fn list_directory(&self, path: &str) -> AppResult<Vec<DirectoryEntry>> {
        self.counters.listings.fetch_add(1, Ordering::SeqCst);
        let files = self.files.read();
        let dir = path.trim_matches('/');
        if files.contains_key(dir) {
            return Err(AppError::upstream(format!("'{}' is not a directory", dir)));
        }
        let prefix = if dir.is_empty() { String::new() } else { format!("{}/", dir) };
        let mut seen_dirs = BTreeSet::new();
        let mut entries = Vec::new();
        for (full, blob) in files.range(prefix.clone()..) {
            let Some(rest) = full.strip_prefix(&prefix) else { break };
            match rest.split_once('/') {
                Some((child, _)) => {
                    if seen_dirs.insert(child.to_string()) {
                        entries.push(DirectoryEntry {
                            name: child.to_string(),
                            path: format!("{}{}", prefix, child),
                            kind: EntryKind::Dir,
                            sha: Uuid::new_v5(&Uuid::NAMESPACE_URL, child.as_bytes()).simple().to_string(),
                            download_url: None,
                            url: None,
                        });
                    }
                }
                None => entries.push(DirectoryEntry {
                    name: rest.to_string(),
                    path: full.clone(),
                    kind: EntryKind::File,
                    sha: blob.sha.clone(),
                    download_url: Some(self.raw_url(full)),
                    url: None,
                }),
            }
        }
        if entries.is_empty() && !dir.is_empty() {
            return Err(AppError::upstream(format!("listing '{}' failed: HTTP 404: Not Found", dir)));
        }
        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn write_file(&self, path: &str, bytes: &[u8], _message: &str) -> AppResult<String> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        if self.faults.writes.load(Ordering::SeqCst) {
            return Err(AppError::write_rejected(format!("write '{}' failed: HTTP 422", path)));
        }
        let sha = Uuid::new_v4().simple().to_string();
        self.files.write().insert(path.to_string(), Blob { bytes: bytes.to_vec(), sha: sha.clone() });
        Ok(sha)
    }

    async fn delete_file(&self, path: &str, sha: &str, _message: &str) -> AppResult<()> {
        self.counters.deletes.fetch_add(1, Ordering::SeqCst);
        if self.faults.deletes.load(Ordering::SeqCst) {
            return Err(AppError::write_rejected(format!("delete '{}' failed: HTTP 409", path)));
        }
        let mut files = self.files.write();
        match files.get(path) {
            None => Err(AppError::write_rejected(format!("delete '{}' failed: HTTP 404: Not Found", path))),
            Some(b) if b.sha != sha => {
                Err(AppError::write_rejected(format!("delete '{}' failed: HTTP 409: sha mismatch", path)))
            }
            Some(_) => {
                files.remove(path);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ContentSource for MemoryRemote {
    async fn download(&self, url: &str) -> AppResult<Vec<u8>> {
        self.counters.downloads.fetch_add(1, Ordering::SeqCst);
        if self.faults.downloads.load(Ordering::SeqCst) {
            return Err(AppError::upstream("download failed: HTTP 500"));
        }
        let path = url
            .strip_prefix(&self.raw_root)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| AppError::upstream(format!("download failed: unknown host for '{}'", url)))?;
        let decoded = urlencoding::decode(path).map_err(|e| AppError::upstream(e.to_string()))?;
        self.read(&decoded)
            .ok_or_else(|| AppError::upstream("download failed: HTTP 404: Not Found"))
    }
}
