use std::net::SocketAddr;

use axum::http::HeaderMap;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Best-effort voter deduplication key: the client IP address. Spoofable,
/// and shared by everyone behind one NAT.
pub fn voter_key(headers: &HeaderMap, peer: SocketAddr, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get(FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        if let Some(client) = forwarded {
            return client.to_string();
        }
    }

    peer.ip().to_string()
}
