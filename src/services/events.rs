//! In-process fan-out of gateway events to WebSocket clients and GraphQL subscriptions.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::services::collaborators::model::{Alert, FirewallRule, MonitoringStatus};

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayEvent {
    AlertCreated(Alert),
    FirewallRuleAdded(FirewallRule),
    MonitoringChanged(MonitoringStatus),
}

impl GatewayEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayEvent::AlertCreated(_) => "alert_created",
            GatewayEvent::FirewallRuleAdded(_) => "firewall_rule_added",
            GatewayEvent::MonitoringChanged(_) => "monitoring_changed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<GatewayEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    /// Fire and forget; having no subscribers is normal.
    pub fn publish(&self, event: GatewayEvent) {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(receivers) => trace!(kind, receivers, "event published"),
            Err(_) => trace!(kind, "event dropped; no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
