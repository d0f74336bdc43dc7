/*
 * Responsibility
 * - One structured log line per request (including rejected ones)
 * - Request counters, latency histogram, in-flight gauge
 */
use std::sync::Arc;

use axum::http::request::Parts;
use axum::response::Response;
use tracing::{error, info, warn};

use super::chain::{Flow, Interceptor};
use super::context::RequestContext;
use crate::services::metrics::GatewayMetrics;

#[derive(Debug, Clone)]
pub struct AccessLog {
    metrics: Arc<GatewayMetrics>,
}

impl AccessLog {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self { metrics }
    }
}

impl Interceptor for AccessLog {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn before(&self, _ctx: &mut RequestContext, _parts: &mut Parts) -> Flow {
        self.metrics.request_started();
        Flow::Continue
    }

    fn after(&self, ctx: &RequestContext, response: &mut Response) {
        let elapsed = ctx.received_at.elapsed();
        let status = response.status();
        self.metrics
            .request_finished(ctx.method.as_str(), status.as_u16(), elapsed);

        let latency_ms = elapsed.as_secs_f64() * 1000.0;
        let subject = ctx.subject().map(|s| s.to_string());
        let subject = subject.as_deref().unwrap_or("-");
        let rejected_by = ctx.rejected_by.unwrap_or("-");

        macro_rules! access_event {
            ($level:ident, $message:literal) => {
                $level!(
                    request_id = %ctx.request_id,
                    method = %ctx.method,
                    path = %ctx.path,
                    status = status.as_u16(),
                    latency_ms,
                    subject,
                    rejected_by,
                    $message
                )
            };
        }

        if status.is_server_error() {
            access_event!(error, "request failed");
        } else if status.is_client_error() {
            access_event!(warn, "request rejected");
        } else {
            access_event!(info, "request completed");
        }
    }
}
