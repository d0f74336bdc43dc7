//! Transport hardening applied to every route, inside the admission chain.
//!
//! Responsibility:
//! - Request body size limit
//! - Security-related response headers for browser clients (clickjacking, MIME
//!   sniffing, referrer leakage, browser features)

use axum::Router;
use axum::http::header::{HeaderName, HeaderValue};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;

const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-frame-options", "DENY"),
    ("content-security-policy", "frame-ancestors 'none'"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "no-referrer"),
    ("permissions-policy", "camera=(), microphone=(), geolocation=()"),
];

pub fn apply(router: Router, body_limit_bytes: usize) -> Router {
    let router = router.layer(RequestBodyLimitLayer::new(body_limit_bytes));

    SECURITY_HEADERS
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        })
}
