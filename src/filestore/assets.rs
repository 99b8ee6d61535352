use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::paths::validate_repo_path;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::remote::{EntryKind, TreeItem};

static IMAGE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|svg)$").unwrap());

/// True for names with one of the served image extensions (case-insensitive).
pub fn is_image(name: &str) -> bool {
    IMAGE_NAME.is_match(name)
}

/// An image blob from a tree snapshot with its public URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub path: String,
    pub url: String,
}

/// Maps repository paths to public proxy URLs and back to raw-host URLs.
#[derive(Debug, Clone)]
pub struct ContentUrls {
    proxy_prefix: String,
    raw_root: String,
    raw_host: Option<String>,
}

impl ContentUrls {
    pub fn new(proxy_prefix: &str, raw_base: &str, repo: &str, branch: &str) -> Self {
        let raw_base = raw_base.trim_end_matches('/');
        Self {
            proxy_prefix: proxy_prefix.trim_end_matches('/').to_string(),
            raw_root: format!("{}/{}/{}", raw_base, repo, branch),
            raw_host: Url::parse(raw_base).ok().and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase())),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(&cfg.proxy_prefix, &cfg.raw_base, &cfg.repo, &cfg.branch)
    }

    pub fn proxy_prefix(&self) -> &str { &self.proxy_prefix }

    /// Public URL served by the proxy relay for `path`.
    pub fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.proxy_prefix, path)
    }

    /// Raw-host URL for the remainder of a proxied request path (already URL-encoded).
    pub fn raw_url(&self, rest: &str) -> String {
        format!("{}/{}", self.raw_root, rest.trim_start_matches('/'))
    }

    /// Strip the proxy prefix from a request path. `None` when the path is outside it.
    pub fn strip_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(self.proxy_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
    }

    /// Resolve the content URL a move submits into an absolute raw-host URL. Relative URLs and
    /// absolute URLs whose path lies under the proxy prefix are mapped to the raw host;
    /// absolute URLs already on the raw host pass through. Everything else is rejected.
    pub fn resolve_content_url(&self, url: &str) -> AppResult<String> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::invalid("fileUrl is required"));
        }
        if url.starts_with('/') {
            return self.map_public_path(url);
        }
        let parsed = Url::parse(url).map_err(|e| AppError::invalid(format!("invalid fileUrl '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::invalid(format!("unsupported fileUrl scheme '{}'", parsed.scheme())));
        }
        let host = parsed.host_str().map(|h| h.to_ascii_lowercase());
        if host.is_some() && host == self.raw_host {
            if parsed.as_str().starts_with(&format!("{}/", self.raw_root)) {
                return Ok(parsed.to_string());
            }
            return Err(AppError::invalid(format!("fileUrl '{}' is outside the configured repository", url)));
        }
        self.map_public_path(parsed.path())
    }

    fn map_public_path(&self, path: &str) -> AppResult<String> {
        let rest = self
            .strip_prefix(path)
            .ok_or_else(|| AppError::invalid(format!("fileUrl '{}' is outside {}", path, self.proxy_prefix)))?;
        let decoded = urlencoding::decode(rest).map_err(|e| AppError::invalid(e.to_string()))?;
        validate_repo_path(&decoded)?;
        Ok(self.raw_url(rest))
    }
}

/// Image blobs of a tree snapshot as asset records, in snapshot order.
pub fn flatten(tree: &[TreeItem], urls: &ContentUrls) -> Vec<AssetRecord> {
    tree.iter()
        .filter(|it| it.kind == EntryKind::File && is_image(&it.path))
        .map(|it| AssetRecord { path: it.path.clone(), url: urls.public_url(&it.path) })
        .collect()
}
