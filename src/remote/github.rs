use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::backend::{ContentSource, RemoteStore};
use super::types::{sort_entries, DirectoryEntry, EntryKind, TreeItem};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

const ACCEPT_V3: &str = "application/vnd.github.v3+json";
const MAX_ERROR_BODY: usize = 512;

/// Fixed identity header set sent on every upstream API call.
pub fn identity_headers(user_agent: &str, token: &str) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, header_value(user_agent)?);
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V3));
    if !token.is_empty() {
        let mut auth = header_value(&format!("token {}", token))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
    }
    Ok(headers)
}

fn header_value(v: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(v).map_err(|e| AppError::internal(format!("invalid header value: {}", e)))
}

/// Percent-encode each segment of a repository path, keeping `/` separators.
pub fn encode_repo_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

async fn error_detail(resp: Response) -> String {
    let status = resp.status();
    let mut body = resp.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) { cut -= 1; }
        body.truncate(cut);
    }
    format!("HTTP {}: {}", status.as_u16(), body.trim())
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeObject>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeObject {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    download_url: Option<String>,
}

#[derive(Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Deserialize)]
struct WrittenContent {
    sha: String,
}

/// `RemoteStore` over the GitHub REST contents/trees API.
#[derive(Clone)]
pub struct GitHubStore {
    client: Client,
    api_base: String,
    repo: String,
    branch: String,
}

impl GitHubStore {
    pub fn new(cfg: &AppConfig) -> AppResult<Self> {
        let client = Client::builder()
            .default_headers(identity_headers(&cfg.user_agent, &cfg.token)?)
            .build()
            .map_err(|e| AppError::internal(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            repo: cfg.repo.clone(),
            branch: cfg.branch.clone(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        let enc = encode_repo_path(path);
        if enc.is_empty() {
            format!("{}/repos/{}/contents", self.api_base, self.repo)
        } else {
            format!("{}/repos/{}/contents/{}", self.api_base, self.repo, enc)
        }
    }
}

#[async_trait]
impl RemoteStore for GitHubStore {
    async fn fetch_tree(&self) -> AppResult<Vec<TreeItem>> {
        let url = format!(
            "{}/repos/{}/git/trees/{}?recursive=1",
            self.api_base,
            self.repo,
            urlencoding::encode(&self.branch)
        );
        let resp = self.client.get(&url).send().await
            .map_err(|e| AppError::upstream(format!("tree fetch failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(AppError::upstream(format!("tree fetch failed: {}", error_detail(resp).await)));
        }
        let body: TreeResponse = resp.json().await
            .map_err(|e| AppError::upstream(format!("tree fetch returned malformed body: {}", e)))?;
        if body.truncated {
            warn!(target: "imgvault::remote", repo = %self.repo, "tree snapshot truncated by upstream");
        }
        let items: Vec<TreeItem> = body.tree.into_iter()
            .filter_map(|o| match o.kind.as_str() {
                "blob" => Some(TreeItem::file(o.path)),
                "tree" => Some(TreeItem::dir(o.path)),
                _ => None,
            })
            .collect();
        debug!(target: "imgvault::remote", count = items.len(), "fetched tree");
        Ok(items)
    }

    async fn list_directory(&self, path: &str) -> AppResult<Vec<DirectoryEntry>> {
        let resp = self.client.get(self.contents_url(path))
            .query(&[("ref", self.branch.as_str())])
            .send().await
            .map_err(|e| AppError::upstream(format!("listing '{}' failed: {}", path, e)))?;
        if !resp.status().is_success() {
            return Err(AppError::upstream(format!("listing '{}' failed: {}", path, error_detail(resp).await)));
        }
        let body: serde_json::Value = resp.json().await
            .map_err(|e| AppError::upstream(format!("listing '{}' returned malformed body: {}", path, e)))?;
        if !body.is_array() {
            return Err(AppError::upstream(format!("'{}' is not a directory", path)));
        }
        let items: Vec<ContentItem> = serde_json::from_value(body)
            .map_err(|e| AppError::upstream(format!("listing '{}' returned malformed body: {}", path, e)))?;
        let mut entries: Vec<DirectoryEntry> = items.into_iter()
            .filter_map(|it| {
                let kind = match it.kind.as_str() {
                    "dir" => EntryKind::Dir,
                    "file" => EntryKind::File,
                    other => {
                        debug!(target: "imgvault::remote", path = %it.path, kind = other, "skipping non-file entry");
                        return None;
                    }
                };
                Some(DirectoryEntry {
                    name: it.name,
                    path: it.path,
                    kind,
                    sha: it.sha,
                    download_url: it.download_url,
                    url: None,
                })
            })
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn write_file(&self, path: &str, bytes: &[u8], message: &str) -> AppResult<String> {
        let content = base64::engine::general_purpose::STANDARD.encode(bytes);
        let body = json!({ "message": message, "content": content, "branch": self.branch });
        let resp = self.client.put(self.contents_url(path)).json(&body).send().await
            .map_err(|e| AppError::write_rejected(format!("write '{}' failed: {}", path, e)))?;
        if !resp.status().is_success() {
            return Err(AppError::write_rejected(format!("write '{}' failed: {}", path, error_detail(resp).await)));
        }
        let written: WriteResponse = resp.json().await
            .map_err(|e| AppError::write_rejected(format!("write '{}' returned malformed body: {}", path, e)))?;
        Ok(written.content.sha)
    }

    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> AppResult<()> {
        let body = json!({ "message": message, "sha": sha, "branch": self.branch });
        let resp = self.client.delete(self.contents_url(path)).json(&body).send().await
            .map_err(|e| AppError::write_rejected(format!("delete '{}' failed: {}", path, e)))?;
        if !resp.status().is_success() {
            return Err(AppError::write_rejected(format!("delete '{}' failed: {}", path, error_detail(resp).await)));
        }
        Ok(())
    }
}

/// Downloads bytes from the raw-content host.
#[derive(Clone)]
pub struct RawContentClient {
    client: Client,
}

impl RawContentClient {
    pub fn new(cfg: &AppConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(|e| AppError::internal(format!("http client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentSource for RawContentClient {
    async fn download(&self, url: &str) -> AppResult<Vec<u8>> {
        let resp = self.client.get(url).send().await
            .map_err(|e| AppError::upstream(format!("download failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(AppError::upstream(format!("download failed: {}", error_detail(resp).await)));
        }
        let bytes = resp.bytes().await
            .map_err(|e| AppError::upstream(format!("download failed: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_paths_are_encoded_per_segment() {
        assert_eq!(encode_repo_path("a b/c#d.png"), "a%20b/c%23d.png");
        assert_eq!(encode_repo_path(""), "");
        assert_eq!(encode_repo_path("/x//y/"), "x/y");
    }

    #[test]
    fn identity_headers_carry_token_scheme() {
        let h = identity_headers("imgvault", "abc").unwrap();
        assert_eq!(h.get(AUTHORIZATION).unwrap(), "token abc");
        assert_eq!(h.get(ACCEPT).unwrap(), ACCEPT_V3);
        assert_eq!(h.get(USER_AGENT).unwrap(), "imgvault");
        assert!(h.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn contents_url_for_root_and_nested() {
        let store = GitHubStore::new(&AppConfig::for_testing()).unwrap();
        assert_eq!(store.contents_url(""), "https://api.github.com/repos/octo/pics/contents");
        assert_eq!(store.contents_url("img/a.png"), "https://api.github.com/repos/octo/pics/contents/img/a.png");
    }
}
