//! Prometheus metrics for the gateway.
//!
//! Each gateway instance owns its registry so tests can build as many routers as
//! they like without tripping over duplicate registrations.

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

pub struct GatewayMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    in_flight: IntGauge,
    rate_limited_total: IntCounter,
    auth_failures_total: IntCounterVec,
    ws_connections: IntGauge,
}

impl std::fmt::Debug for GatewayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMetrics")
            .field("in_flight", &self.in_flight.get())
            .field("ws_connections", &self.ws_connections.get())
            .finish()
    }
}

impl GatewayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("gateway_requests_total", "HTTP requests by method and status"),
            &["method", "status"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "gateway_request_duration_seconds",
                "Time from admission to response",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method"],
        )?;
        let in_flight = IntGauge::new("gateway_requests_in_flight", "Requests being served")?;
        let rate_limited_total = IntCounter::new(
            "gateway_rate_limited_total",
            "Requests refused by the rate limiter",
        )?;
        let auth_failures_total = IntCounterVec::new(
            Opts::new("gateway_auth_failures_total", "Rejected bearer credentials"),
            &["reason"],
        )?;
        let ws_connections = IntGauge::new("gateway_ws_connections", "Open WebSocket streams")?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;
        registry.register(Box::new(rate_limited_total.clone()))?;
        registry.register(Box::new(auth_failures_total.clone()))?;
        registry.register(Box::new(ws_connections.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            in_flight,
            rate_limited_total,
            auth_failures_total,
            ws_connections,
        })
    }

    pub fn request_started(&self) {
        self.in_flight.inc();
    }

    pub fn request_finished(&self, method: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        self.in_flight.dec();
        self.requests_total
            .with_label_values(&[method, status.as_str()])
            .inc();
        self.request_duration
            .with_label_values(&[method])
            .observe(elapsed.as_secs_f64());
    }

    pub fn rate_limited(&self) {
        self.rate_limited_total.inc();
    }

    pub fn auth_failed(&self, reason: &str) {
        self.auth_failures_total.with_label_values(&[reason]).inc();
    }

    pub fn ws_opened(&self) {
        self.ws_connections.inc();
    }

    pub fn ws_closed(&self) {
        self.ws_connections.dec();
    }

    pub fn in_flight(&self) -> i64 {
        self.in_flight.get()
    }

    /// Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
