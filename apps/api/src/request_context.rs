use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use rantboard_domain::UNKNOWN_CLIENT_ADDRESS;
use subtle::ConstantTimeEq;

/// Header that lets trusted internal callers skip submission throttling.
pub const BYPASS_HEADER: &str = "x-bypass-rate-limit";

/// Best-effort network address of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientAddress {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(client_address(
            &parts.headers,
            parts.extensions.get::<ConnectInfo<SocketAddr>>(),
        )))
    }
}

/// First `x-forwarded-for` entry, else the peer address, else `unknown`.
pub fn client_address(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| peer.map(|ConnectInfo(address)| address.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT_ADDRESS.to_owned())
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Whether the request carries the configured bypass token. Always false
/// when no token is configured.
pub fn bypass_granted(configured: Option<&str>, headers: &HeaderMap) -> bool {
    let (Some(expected), Some(provided)) = (configured, headers.get(BYPASS_HEADER)) else {
        return false;
    };

    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
