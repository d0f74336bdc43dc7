//! Request correlation: honour a caller's `X-Request-ID`, otherwise mint one.

use axum::http::{HeaderName, HeaderValue, request::Parts};
use axum::response::Response;
use uuid::Uuid;

use super::chain::{Flow, Interceptor};
use super::context::RequestContext;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Debug, Default)]
pub struct Correlation;

impl Interceptor for Correlation {
    fn name(&self) -> &'static str {
        "correlation"
    }

    fn before(&self, ctx: &mut RequestContext, parts: &mut Parts) -> Flow {
        let supplied = parts
            .headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string);

        ctx.request_id = match supplied {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                if let Ok(value) = HeaderValue::from_str(&id) {
                    parts.headers.insert(X_REQUEST_ID, value);
                }
                id
            }
        };

        Flow::Continue
    }

    fn after(&self, ctx: &RequestContext, response: &mut Response) {
        if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
    }
}
