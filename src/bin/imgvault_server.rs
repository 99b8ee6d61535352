//!
//! imgvault server binary
//! ----------------------
//! Command-line entry point. Configuration layers: compiled defaults, then environment
//! variables, then the flags below.

use anyhow::Result;
use std::env;

use imgvault::config::{parse_bool, AppConfig};

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn parse_port_arg(args: &[String], flag: &str) -> Option<u16> {
    arg_value(args, flag).and_then(|v| v.parse::<u16>().ok())
}

fn parse_u64_arg(args: &[String], flag: &str) -> Option<u64> {
    arg_value(args, flag).and_then(|v| v.parse::<u64>().ok())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

const USAGE: &str = "imgvault server

USAGE:
  imgvault_server [--http-port N] [--repo OWNER/NAME] [--branch NAME] [--proxy-prefix PATH]
                  [--admin-route PATH] [--dashboard-ttl SECS] [--folder-max-age SECS]
                  [--secure-cookie BOOL] [--trust-edge-headers BOOL]

OPTIONS:
  --http-port N           HTTP port (env: IMGVAULT_HTTP_PORT, default 8787)
  --repo OWNER/NAME       Upstream repository (env: GH_REPO)
  --branch NAME           Branch (env: GH_BRANCH, default main)
  --proxy-prefix PATH     Public asset prefix (env: IMGVAULT_PROXY_PREFIX, default /{repo}/{branch})
  --admin-route PATH      Admin route (env: IMGVAULT_ADMIN_ROUTE, default /admin)
  --dashboard-ttl SECS    Asset index TTL (env: IMGVAULT_DASHBOARD_TTL_SECS, default 300)
  --folder-max-age SECS   Browse max-age hint (env: IMGVAULT_FOLDER_MAX_AGE_SECS, default 60)
  --secure-cookie BOOL    Mark the session cookie Secure (env: IMGVAULT_SECURE_COOKIE, default true)
  --trust-edge-headers BOOL
                          Take client region/IP from CDN edge headers (env: IMGVAULT_TRUST_EDGE_HEADERS, default false)

SECRETS (environment only):
  GH_TOKEN, ADMIN_USER, ADMIN_PASS
";

fn apply_args(cfg: &mut AppConfig, args: &[String]) {
    if let Some(p) = parse_port_arg(args, "--http-port") { cfg.http_port = p; }
    if let Some(v) = arg_value(args, "--repo") { cfg.repo = v; }
    if let Some(v) = arg_value(args, "--branch") { cfg.branch = v; }
    if let Some(v) = arg_value(args, "--proxy-prefix") { cfg.proxy_prefix = v; }
    if let Some(v) = arg_value(args, "--admin-route") { cfg.admin_route = v; }
    if let Some(v) = parse_u64_arg(args, "--dashboard-ttl") { cfg.dashboard_ttl_secs = v; }
    if let Some(v) = parse_u64_arg(args, "--folder-max-age") { cfg.folder_max_age_secs = v; }
    if let Some(v) = arg_value(args, "--secure-cookie").and_then(|v| parse_bool(&v)) { cfg.secure_cookie = v; }
    if let Some(v) = arg_value(args, "--trust-edge-headers").and_then(|v| parse_bool(&v)) { cfg.trust_edge_headers = v; }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber with env filter if provided
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    // CLI arguments override environment
    let mut cfg = AppConfig::from_env();
    apply_args(&mut cfg, &args);

    imgvault::server::run_with_config(cfg).await
}
