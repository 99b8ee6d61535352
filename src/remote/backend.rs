use async_trait::async_trait;

use super::types::{DirectoryEntry, TreeItem};
use crate::error::AppResult;

/// Operations against the upstream repository. Concrete impls: `GitHubStore` over HTTP and
/// `MemoryRemote` for tests and local runs.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every object on the configured branch, recursively.
    async fn fetch_tree(&self) -> AppResult<Vec<TreeItem>>;

    /// Immediate children of `path` (empty = repository root), sorted by `sort_entries`.
    async fn list_directory(&self, path: &str) -> AppResult<Vec<DirectoryEntry>>;

    /// Create or overwrite `path`. Returns the new version token.
    async fn write_file(&self, path: &str, bytes: &[u8], message: &str) -> AppResult<String>;

    /// Delete `path` at version `sha`. Not idempotent: deleting a missing file is an error.
    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> AppResult<()>;
}

/// Fetches raw file bytes from an absolute content URL.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn download(&self, url: &str) -> AppResult<Vec<u8>>;
}
