//! Refuses new requests once the server has started draining.

use axum::http::request::Parts;

use super::chain::{Flow, Interceptor};
use super::context::RequestContext;
use crate::error::AppError;
use crate::lifecycle::Lifecycle;

#[derive(Debug, Clone)]
pub struct DrainGuard {
    lifecycle: Lifecycle,
}

impl DrainGuard {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }
}

impl Interceptor for DrainGuard {
    fn name(&self) -> &'static str {
        "drain_guard"
    }

    fn before(&self, _ctx: &mut RequestContext, _parts: &mut Parts) -> Flow {
        if self.lifecycle.is_admitting() {
            Flow::Continue
        } else {
            Flow::reject(AppError::Draining)
        }
    }
}
