use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::assets::ContentUrls;
use super::paths::{normalize_file_path, same_path};
use crate::error::{AppError, AppResult, RetryDelete};
use crate::remote::{ContentSource, RemoteStore};

/// Progress of a move. The upstream has no rename, so a move is download, write, delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStage {
    /// Nothing written yet. Failure here (fetch or write) leaves the source untouched.
    PendingWrite,
    /// Destination written, source still present. Failure here leaves two copies and is
    /// reported with the source path and version token so the delete alone can be retried.
    Written,
    /// Source deleted; terminal.
    Deleted,
}

/// A move request as submitted by the admin client.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveOperation {
    #[serde(rename = "oldPath")]
    pub source_path: String,
    #[serde(rename = "newPath", default)]
    pub destination_path: String,
    /// Version token of the source, from the listing it was selected in.
    pub sha: String,
    /// Content URL the source is downloaded from.
    #[serde(rename = "fileUrl")]
    pub file_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub stage: MoveStage,
    pub destination_sha: String,
}

pub fn move_message(from: &str, to: &str) -> String { format!("Move {} to {}", from, to) }
pub fn delete_message(path: &str) -> String { format!("Delete {}", path) }

fn require_sha(sha: &str) -> AppResult<&str> {
    let sha = sha.trim();
    if sha.is_empty() {
        return Err(AppError::invalid("sha is required"));
    }
    Ok(sha)
}

/// Run a move to completion or to its first failure. All validation happens before the
/// first upstream call; no step is retried and nothing is rolled back.
pub async fn move_file(
    remote: &dyn RemoteStore,
    content: &dyn ContentSource,
    urls: &ContentUrls,
    op: &MoveOperation,
) -> AppResult<MoveOutcome> {
    let source = normalize_file_path(&op.source_path)?;
    if op.destination_path.trim().is_empty() {
        return Err(AppError::InvalidDestination("Invalid path: destination is empty".into()));
    }
    let destination = normalize_file_path(&op.destination_path)
        .map_err(|e| AppError::InvalidDestination(format!("Invalid path: {}", e)))?;
    if same_path(&source, &destination) {
        return Err(AppError::InvalidDestination(format!("Invalid path: '{}' is the current location", destination)));
    }
    let sha = require_sha(&op.sha)?;
    let fetch_url = urls.resolve_content_url(&op.file_url)?;

    let mut stage = MoveStage::PendingWrite;
    info!(target: "imgvault::move", from = %source, to = %destination, stage = ?stage, "move started");

    let bytes = content.download(&fetch_url).await
        .map_err(|e| AppError::SourceFetchFailed(format!("fetching '{}' failed: {}", source, e)))?;

    let message = move_message(&source, &destination);
    let destination_sha = remote.write_file(&destination, &bytes, &message).await
        .map_err(|e| AppError::DestinationWriteFailed(format!("writing '{}' failed: {}", destination, e)))?;
    stage = MoveStage::Written;
    info!(target: "imgvault::move", to = %destination, bytes = bytes.len(), stage = ?stage, "destination written");

    if let Err(e) = remote.delete_file(&source, sha, &message).await {
        warn!(target: "imgvault::move", from = %source, to = %destination, error = %e, "source delete failed; both copies exist");
        return Err(AppError::SourceDeleteFailed {
            message: format!("'{}' was written but deleting '{}' failed: {}", destination, source, e),
            retry: RetryDelete { path: source, sha: sha.to_string() },
        });
    }
    stage = MoveStage::Deleted;
    info!(target: "imgvault::move", from = %source, to = %destination, stage = ?stage, "move complete");
    Ok(MoveOutcome { stage, destination_sha })
}

/// Delete one file at the given version token.
pub async fn delete_file(remote: &dyn RemoteStore, path: &str, sha: &str) -> AppResult<()> {
    let path = normalize_file_path(path)?;
    let sha = require_sha(sha)?;
    remote.delete_file(&path, sha, &delete_message(&path)).await?;
    info!(target: "imgvault::delete", path = %path, "file deleted");
    Ok(())
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod ops_tests;
