use super::assets::{is_image, ContentUrls};
use super::paths::normalize_dir_path;
use crate::error::AppResult;
use crate::remote::{DirectoryEntry, EntryKind, RemoteStore};

/// Client-side cache directive for folder listings. Nothing is cached server-side, so a
/// listing taken right after a move or delete reflects it.
pub fn folder_cache_control(max_age_secs: u64) -> String {
    format!("private, max-age={}", max_age_secs)
}

/// Immediate children of `path` straight from the upstream, with public URLs on image files.
pub async fn browse(remote: &dyn RemoteStore, urls: &ContentUrls, path: &str) -> AppResult<Vec<DirectoryEntry>> {
    let dir = normalize_dir_path(path)?;
    let mut entries = remote.list_directory(&dir).await?;
    for e in entries.iter_mut() {
        e.url = match e.kind {
            EntryKind::File if is_image(&e.name) => Some(urls.public_url(&e.path)),
            _ => None,
        };
    }
    Ok(entries)
}
