use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::{convert::Infallible, net::SocketAddr};

/// Caller address and agent, recorded with audit entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// `X-Forwarded-For` (first hop), then `X-Real-IP`, then the socket peer.
    pub fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let ip_address = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
            .or_else(|| peer.map(|addr| addr.ip().to_string()));

        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self {
            ip_address,
            user_agent,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_parts(&parts.headers, peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.2"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        headers.insert("user-agent", HeaderValue::from_static("tablet/1.0"));

        let info = ClientInfo::from_parts(&headers, None);
        assert_eq!(info.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(info.user_agent.as_deref(), Some("tablet/1.0"));
    }

    #[test]
    fn falls_back_to_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        let info = ClientInfo::from_parts(&headers, None);
        assert_eq!(info.ip_address.as_deref(), Some("10.0.0.9"));

        let peer: SocketAddr = "192.168.1.20:5555".parse().unwrap();
        let info = ClientInfo::from_parts(&HeaderMap::new(), Some(peer));
        assert_eq!(info.ip_address.as_deref(), Some("192.168.1.20"));
        assert_eq!(info.user_agent, None);
    }
}
