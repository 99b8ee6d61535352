use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::info;

use super::AppState;
use crate::config::AppConfig;

pub const UNKNOWN_REGION: &str = "XX";
pub const UNKNOWN_IP: &str = "0.0.0.0";

/// Network attributes of the requester as reported by the edge, falling back to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOrigin {
    pub region: String,
    pub ip: String,
}

/// Allow/deny decision per request.
pub trait AccessGate: Send + Sync {
    fn allows(&self, origin: &ClientOrigin) -> bool;
}

/// Denies configured region codes and exact client IPs.
#[derive(Debug, Clone, Default)]
pub struct BlocklistGate {
    regions: HashSet<String>,
    ips: HashSet<String>,
}

impl BlocklistGate {
    pub fn new<R, I>(regions: R, ips: I) -> Self
    where
        R: IntoIterator<Item = String>,
        I: IntoIterator<Item = String>,
    {
        Self {
            regions: regions.into_iter().map(|r| r.to_ascii_uppercase()).collect(),
            ips: ips.into_iter().collect(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.blocked_regions.iter().cloned(), cfg.blocked_ips.iter().cloned())
    }
}

impl AccessGate for BlocklistGate {
    fn allows(&self, origin: &ClientOrigin) -> bool {
        !self.regions.contains(&origin.region) && !self.ips.contains(&origin.ip)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|s| !s.is_empty())
}

/// With `trust_edge`: region from `cf-ipcountry`; IP from `cf-connecting-ip`, then the first
/// `x-forwarded-for` hop, then the socket peer. Without it only the socket peer counts and the
/// region is unknown.
pub fn client_origin(headers: &HeaderMap, peer: Option<IpAddr>, trust_edge: bool) -> ClientOrigin {
    if !trust_edge {
        return ClientOrigin {
            region: UNKNOWN_REGION.to_string(),
            ip: peer.map(|p| p.to_string()).unwrap_or_else(|| UNKNOWN_IP.to_string()),
        };
    }
    let region = header_str(headers, "cf-ipcountry")
        .map(|r| r.to_ascii_uppercase())
        .unwrap_or_else(|| UNKNOWN_REGION.to_string());
    let ip = header_str(headers, "cf-connecting-ip")
        .map(str::to_string)
        .or_else(|| {
            header_str(headers, "x-forwarded-for")
                .and_then(|v| v.split(',').next())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .or_else(|| peer.map(|p| p.to_string()))
        .unwrap_or_else(|| UNKNOWN_IP.to_string());
    ClientOrigin { region, ip }
}

pub async fn enforce(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0.ip());
    let origin = client_origin(req.headers(), peer, state.config.trust_edge_headers);
    if !state.gate.allows(&origin) {
        info!(target: "imgvault::gate", region = %origin.region, ip = %origin.ip, path = %req.uri().path(), "request denied");
        return (StatusCode::FORBIDDEN, "Access denied").into_response();
    }
    next.run(req).await
}
