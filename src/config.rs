//! Server configuration: compiled defaults, overlaid by environment variables, then by
//! command-line flags in the binary.

use std::env;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HTTP_PORT: u16 = 8787;
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_ADMIN_ROUTE: &str = "/admin";
pub const DEFAULT_COOKIE_NAME: &str = "imgvault_session";
pub const DEFAULT_USER_AGENT: &str = "imgvault";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub http_port: u16,

    /// Upstream repository as `owner/name`.
    pub repo: String,
    /// Upstream API token. Never logged.
    #[serde(skip_serializing)]
    pub token: String,
    pub branch: String,
    pub api_base: String,
    pub raw_base: String,
    pub user_agent: String,

    /// Public path prefix served by the proxy relay. Empty means `/{repo}/{branch}`.
    pub proxy_prefix: String,
    pub admin_route: String,

    pub dashboard_ttl_secs: u64,
    pub folder_max_age_secs: u64,
    pub cache_sweep_interval_secs: u64,

    pub session_ttl_secs: u64,
    pub cookie_name: String,
    pub secure_cookie: bool,

    pub admin_user: String,
    #[serde(skip_serializing)]
    pub admin_pass: String,

    pub blocked_regions: Vec<String>,
    pub blocked_ips: Vec<String>,
    /// Read client region and address from CDN edge headers. Only safe when every request
    /// arrives through that edge; otherwise the socket peer is used.
    pub trust_edge_headers: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            repo: String::new(),
            token: String::new(),
            branch: DEFAULT_BRANCH.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            raw_base: DEFAULT_RAW_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy_prefix: String::new(),
            admin_route: DEFAULT_ADMIN_ROUTE.to_string(),
            dashboard_ttl_secs: 300,
            folder_max_age_secs: 60,
            cache_sweep_interval_secs: 30,
            session_ttl_secs: 86_400,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secure_cookie: true,
            admin_user: String::new(),
            admin_pass: String::new(),
            blocked_regions: vec!["KP".into(), "SY".into(), "PK".into(), "CU".into()],
            blocked_ips: vec!["0.0.0.0".into(), "127.0.0.1".into()],
            trust_edge_headers: false,
        }
    }
}

pub fn parse_port_env(name: &str) -> Option<u16> {
    env::var(name).ok().and_then(|v| v.trim().parse::<u16>().ok())
}

pub fn parse_u64_env(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.trim().parse::<u64>().ok())
}

pub fn parse_bool_env(name: &str) -> Option<bool> {
    let v = env::var(name).ok()?;
    parse_bool(&v)
}

pub fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma/semicolon/whitespace separated list, dropping empties.
pub fn parse_list(v: &str) -> Vec<String> {
    v.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Normalize a route prefix to `/segment[/segment..]` with no trailing slash.
pub fn normalize_route(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() { String::new() } else { format!("/{}", trimmed) }
}

impl AppConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    pub fn apply_env(&mut self) {
        if let Some(p) = parse_port_env("IMGVAULT_HTTP_PORT") { self.http_port = p; }
        if let Some(v) = non_empty_env("GH_REPO") { self.repo = v; }
        if let Some(v) = non_empty_env("GH_TOKEN") { self.token = v; }
        if let Some(v) = non_empty_env("GH_BRANCH") { self.branch = v; }
        if let Some(v) = non_empty_env("IMGVAULT_API_BASE") { self.api_base = v; }
        if let Some(v) = non_empty_env("IMGVAULT_RAW_BASE") { self.raw_base = v; }
        if let Some(v) = non_empty_env("IMGVAULT_PROXY_PREFIX") { self.proxy_prefix = v; }
        if let Some(v) = non_empty_env("IMGVAULT_ADMIN_ROUTE") { self.admin_route = v; }
        if let Some(v) = parse_u64_env("IMGVAULT_DASHBOARD_TTL_SECS") { self.dashboard_ttl_secs = v; }
        if let Some(v) = parse_u64_env("IMGVAULT_FOLDER_MAX_AGE_SECS") { self.folder_max_age_secs = v; }
        if let Some(v) = parse_u64_env("IMGVAULT_SESSION_TTL_SECS") { self.session_ttl_secs = v; }
        if let Some(v) = parse_bool_env("IMGVAULT_SECURE_COOKIE") { self.secure_cookie = v; }
        if let Some(v) = non_empty_env("ADMIN_USER") { self.admin_user = v; }
        if let Some(v) = non_empty_env("ADMIN_PASS") { self.admin_pass = v; }
        if let Ok(v) = env::var("IMGVAULT_BLOCKED_REGIONS") { self.blocked_regions = parse_list(&v); }
        if let Ok(v) = env::var("IMGVAULT_BLOCKED_IPS") { self.blocked_ips = parse_list(&v); }
        if let Some(v) = parse_bool_env("IMGVAULT_TRUST_EDGE_HEADERS") { self.trust_edge_headers = v; }
    }

    /// Fill derived values and normalize route prefixes. Idempotent.
    pub fn finalize(mut self) -> Self {
        self.admin_route = normalize_route(&self.admin_route);
        if self.admin_route.is_empty() { self.admin_route = DEFAULT_ADMIN_ROUTE.to_string(); }
        self.proxy_prefix = normalize_route(&self.proxy_prefix);
        if self.proxy_prefix.is_empty() {
            self.proxy_prefix = normalize_route(&format!("{}/{}", self.repo, self.branch));
        }
        self.api_base = self.api_base.trim_end_matches('/').to_string();
        self.raw_base = self.raw_base.trim_end_matches('/').to_string();
        self.blocked_regions = self.blocked_regions.iter().map(|r| r.to_ascii_uppercase()).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.repo.is_empty() || !self.repo.contains('/') {
            bail!("GH_REPO must be set to 'owner/name' (got '{}')", self.repo);
        }
        if self.token.is_empty() { bail!("GH_TOKEN must be set"); }
        if self.admin_user.is_empty() || self.admin_pass.is_empty() {
            bail!("ADMIN_USER and ADMIN_PASS must be set");
        }
        if self.admin_route == self.proxy_prefix {
            bail!("admin route and proxy prefix must differ ({})", self.admin_route);
        }
        Ok(())
    }

    pub fn dashboard_ttl(&self) -> Duration { Duration::from_secs(self.dashboard_ttl_secs) }
    pub fn session_ttl(&self) -> Duration { Duration::from_secs(self.session_ttl_secs) }
    pub fn cache_sweep_interval(&self) -> Duration { Duration::from_secs(self.cache_sweep_interval_secs.max(1)) }

    /// Prefix under which authenticated JSON endpoints live.
    pub fn admin_api_prefix(&self) -> String { format!("{}/api", self.admin_route) }

    /// Configuration suitable for unit and integration tests.
    pub fn for_testing() -> Self {
        Self {
            repo: "octo/pics".into(),
            token: "test-token".into(),
            admin_user: "admin".into(),
            admin_pass: "secret".into(),
            secure_cookie: false,
            blocked_ips: vec!["0.0.0.0".into()],
            trust_edge_headers: true,
            ..Self::default()
        }
        .finalize()
    }
}
