//! Header rewriting for forwarded requests and relayed responses.
//!
//! Hop-by-hop headers describe a single connection and are dropped in both
//! directions. Forwarded requests gain `X-Forwarded-For`, `X-Forwarded-Host`
//! and `X-Forwarded-Proto`.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::http::request::RequestContext;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
];

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    for name in named.iter().map(String::as_str).chain(HOP_BY_HOP.iter().copied()) {
        headers.remove(name);
    }
}

/// Annotate the outbound request with the original client and transport.
pub fn set_forwarded(headers: &mut HeaderMap, ctx: &RequestContext) {
    if let Some(peer) = ctx.peer {
        let prior: Vec<&str> = headers
            .get_all(&X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();

        let chain = if prior.is_empty() {
            peer.ip().to_string()
        } else {
            format!("{}, {}", prior.join(", "), peer.ip())
        };

        if let Ok(value) = HeaderValue::from_str(&chain) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    if let Some(value) = ctx.host.as_deref().and_then(|h| HeaderValue::from_str(h).ok()) {
        headers.insert(X_FORWARDED_HOST, value);
    }

    headers.insert(
        X_FORWARDED_PROTO,
        HeaderValue::from_static(ctx.transport.scheme()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Transport;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::Request;
    use std::net::SocketAddr;

    fn context(peer: &str, transport: Transport) -> RequestContext {
        let mut request = Request::builder()
            .uri("/")
            .header("host", "front.example.com")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        RequestContext::from_request(&request, transport)
    }

    #[test]
    fn strips_standard_and_connection_named_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("keep-alive, X-Session"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session", HeaderValue::from_static("abc"));
        headers.insert("upgrade", HeaderValue::from_static("h2c"));
        headers.insert("accept", HeaderValue::from_static("*/*"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers["accept"], "*/*");
    }

    #[test]
    fn forwarded_for_appends_to_existing_chain() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("192.0.2.1"));

        set_forwarded(&mut headers, &context("10.0.0.7:40000", Transport::Http));

        assert_eq!(headers[&X_FORWARDED_FOR], "192.0.2.1, 10.0.0.7");
        assert_eq!(headers[&X_FORWARDED_HOST], "front.example.com");
        assert_eq!(headers[&X_FORWARDED_PROTO], "http");
    }

    #[test]
    fn tls_transport_is_annotated_as_https() {
        let mut headers = HeaderMap::new();
        set_forwarded(&mut headers, &context("10.0.0.7:40000", Transport::Https));
        assert_eq!(headers[&X_FORWARDED_PROTO], "https");
        assert_eq!(headers[&X_FORWARDED_FOR], "10.0.0.7");
    }
}
