//! Real client address determination

use axum::extract::ConnectInfo;
use http::{HeaderMap, Request};
use std::net::{IpAddr, SocketAddr};

/// Address recorded when nothing usable is available
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// Ordered list of trusted proxy headers, falling back to the socket peer.
///
/// For list-valued headers such as `X-Forwarded-For` the first (left-most)
/// entry is the original client. Header values that do not parse as an IP
/// address are ignored and the next source is tried.
#[derive(Debug, Clone, Default)]
pub struct ClientAddressPolicy {
    trusted_headers: Vec<String>,
}

impl ClientAddressPolicy {
    pub fn new<I, S>(trusted_headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            trusted_headers: trusted_headers
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Only trust the socket peer
    pub fn peer_only() -> Self {
        Self::default()
    }

    pub fn trusted_headers(&self) -> &[String] {
        &self.trusted_headers
    }

    pub fn from_headers(&self, headers: &HeaderMap) -> Option<IpAddr> {
        self.trusted_headers.iter().find_map(|name| {
            headers
                .get_all(name.as_str())
                .iter()
                .filter_map(|value| value.to_str().ok())
                .flat_map(|value| value.split(','))
                .next()
                .and_then(parse_address)
        })
    }

    /// Resolve the client address of a request
    pub fn client_address<B>(&self, request: &Request<B>) -> String {
        self.from_headers(request.headers())
            .or_else(|| {
                request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(peer)| peer.ip())
            })
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
    }
}

fn parse_address(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|s| s.ip()))
}
