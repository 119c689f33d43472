//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Two tiers: a strict limiter for credential endpoints and a relaxed one
//! for the rest of the API. Keys on the client IP, reading proxy headers
//! via `SmartIpKeyExtractor`.

use std::sync::Arc;

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Limiter for signup/login: ~10 requests per minute per IP.
///
/// # Panics
///
/// Does not panic; `per_second(6)` and `burst_size(5)` are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Limiter for the general API: ~100 requests per minute per IP.
///
/// # Panics
///
/// Does not panic; `per_second(1)` and `burst_size(50)` are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::SocketAddr;

    use axum::Router;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;

    async fn handler() -> &'static str {
        "ok"
    }

    // Serving with connect info puts the peer address into request
    // extensions, which is what these requests simulate.
    fn request_with_peer(addr: &str) -> Request<Body> {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let peer: SocketAddr = addr.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        request
    }

    #[tokio::test]
    async fn test_direct_connection_keys_on_peer_address() {
        let app = Router::new()
            .route("/", get(handler))
            .layer(api_rate_limiter());

        let response = app
            .oneshot(request_with_peer("10.0.0.1:55000"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_proxied_connection_keys_on_forwarded_header() {
        let app = Router::new()
            .route("/", get(handler))
            .layer(api_rate_limiter());

        let request = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_auth_limiter_throttles_a_burst() {
        let app = Router::new()
            .route("/", get(handler))
            .layer(auth_rate_limiter());

        let mut last = StatusCode::OK;
        for _ in 0..20 {
            last = app
                .clone()
                .oneshot(request_with_peer("10.0.0.2:55000"))
                .await
                .unwrap()
                .status();
            if last == StatusCode::TOO_MANY_REQUESTS {
                break;
            }
        }
        assert_eq!(last, StatusCode::TOO_MANY_REQUESTS);
    }
}
