//! CORS policy for browser clients.
//!
//! Note:
//! - CORS is enforced by browsers. Native apps and server-to-server calls are not
//!   restricted by it.
//! - Preflight (`OPTIONS`) is answered here with 204 and an empty body, before rate
//!   limiting and authentication.
//!
//! Policy:
//! - Development: `Access-Control-Allow-Origin: *`, without credentials.
//! - Production: exact-match allowlist from Config. Other origins get no CORS headers.

use axum::body::Body;
use axum::http::{HeaderValue, Method, StatusCode, header, request::Parts};
use axum::response::Response;

use super::chain::{Flow, Interceptor};
use super::context::RequestContext;
use crate::config::Config;

const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "authorization, content-type, accept, x-request-id";
const EXPOSE_HEADERS: &str = "x-request-id, retry-after, x-ratelimit-limit, x-ratelimit-remaining";
const MAX_AGE_SECS: &str = "600";

#[derive(Debug, Clone)]
pub enum AllowedOrigins {
    Any,
    List(Vec<HeaderValue>),
}

#[derive(Debug, Clone)]
pub struct Cors {
    origins: AllowedOrigins,
}

impl Cors {
    pub fn new(origins: AllowedOrigins) -> Self {
        Self { origins }
    }

    pub fn from_config(config: &Config) -> Self {
        if config.app_env.is_production() {
            // An empty allowlist allows nothing.
            let allowed = config
                .cors_allowed_origins
                .iter()
                .filter_map(|s| HeaderValue::from_str(s).ok())
                .collect();
            Self::new(AllowedOrigins::List(allowed))
        } else {
            Self::new(AllowedOrigins::Any)
        }
    }

    fn allow_origin(&self, origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        match &self.origins {
            AllowedOrigins::Any => Some(HeaderValue::from_static("*")),
            AllowedOrigins::List(allowed) => {
                origin.filter(|o| allowed.iter().any(|a| a == *o)).cloned()
            }
        }
    }
}

impl Interceptor for Cors {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn before(&self, _ctx: &mut RequestContext, parts: &mut Parts) -> Flow {
        if parts.method != Method::OPTIONS {
            return Flow::Continue;
        }

        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE_SECS),
        );

        Flow::Terminate(response)
    }

    fn after(&self, ctx: &RequestContext, response: &mut Response) {
        let Some(allow) = self.allow_origin(ctx.origin.as_ref()) else {
            return;
        };

        let headers = response.headers_mut();
        if matches!(self.origins, AllowedOrigins::List(_)) {
            headers.append(header::VARY, HeaderValue::from_static("origin"));
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow);
        headers.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static(EXPOSE_HEADERS),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::context::ContextSettings;
    use axum::http::Request;
    use std::time::Duration;

    fn ctx_and_parts(method: Method, origin: Option<&str>) -> (RequestContext, Parts) {
        let mut builder = Request::builder().method(method).uri("/api/v1/alerts");
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        let ctx = RequestContext::new(
            &parts,
            ContextSettings {
                request_deadline: Duration::from_secs(1),
                trust_proxy_headers: false,
            },
        );
        (ctx, parts)
    }

    #[test]
    fn test_preflight_terminates_with_204() {
        let (mut ctx, mut parts) = ctx_and_parts(Method::OPTIONS, Some("https://app.example"));
        let Flow::Terminate(response) = Cors::new(AllowedOrigins::Any).before(&mut ctx, &mut parts)
        else {
            panic!("preflight should terminate");
        };

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }

    #[test]
    fn test_non_preflight_continues() {
        let (mut ctx, mut parts) = ctx_and_parts(Method::GET, None);
        assert!(matches!(
            Cors::new(AllowedOrigins::Any).before(&mut ctx, &mut parts),
            Flow::Continue
        ));
    }

    #[test]
    fn test_allowlist_echoes_only_listed_origins() {
        let cors = Cors::new(AllowedOrigins::List(vec![HeaderValue::from_static(
            "https://app.example",
        )]));

        let (ctx, _) = ctx_and_parts(Method::GET, Some("https://app.example"));
        let mut allowed = Response::new(Body::empty());
        cors.after(&ctx, &mut allowed);
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example"
        );

        let (ctx, _) = ctx_and_parts(Method::GET, Some("https://evil.example"));
        let mut denied = Response::new(Body::empty());
        cors.after(&ctx, &mut denied);
        assert!(!denied.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
