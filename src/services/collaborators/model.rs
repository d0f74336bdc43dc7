//! Records exchanged with collaborators.
//!
//! The same types back the REST payloads (serde, snake_case) and the GraphQL
//! schema (async-graphql derives, camelCase).

use std::{fmt, str::FromStr};

use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::auth::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl FromStr for Severity {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err("severity must be one of: low, medium, high, critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl FromStr for AlertStatus {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AlertStatus::Active),
            "acknowledged" => Ok(AlertStatus::Acknowledged),
            "resolved" => Ok(AlertStatus::Resolved),
            _ => Err("status must be one of: active, acknowledged, resolved"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum ThreatStatus {
    Active,
    Investigating,
    Mitigated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Block,
    Log,
}

impl FromStr for RuleAction {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(RuleAction::Allow),
            "block" | "deny" => Ok(RuleAction::Block),
            "log" => Ok(RuleAction::Log),
            _ => Err("action must be one of: allow, block, log"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct Alert {
    pub id: Uuid,
    pub severity: Severity,
    #[serde(rename = "type")]
    #[graphql(name = "type")]
    pub kind: String,
    pub source_ip: String,
    pub destination_ip: Option<String>,
    pub description: String,
    pub status: AlertStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct Threat {
    pub id: Uuid,
    pub name: String,
    pub severity: Severity,
    pub status: ThreatStatus,
    pub source_ip: String,
    pub description: String,
    pub confidence: f64,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct FirewallRule {
    pub id: Uuid,
    pub action: RuleAction,
    pub source_ip: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct NetworkInterface {
    pub name: String,
    pub addresses: Vec<String>,
    pub is_up: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct NetworkStats {
    pub packets_processed: u64,
    pub bytes_processed: u64,
    pub active_connections: u64,
    pub packets_per_second: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct MonitoringStatus {
    pub is_running: bool,
    pub interface: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Counters owned by the data store; the dashboard adds network numbers on top.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreCounters {
    pub total_alerts: u64,
    pub active_alerts: u64,
    pub critical_alerts: u64,
    pub active_threats: u64,
    pub firewall_rules: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct DashboardStats {
    pub total_alerts: u64,
    pub active_alerts: u64,
    pub critical_alerts: u64,
    pub active_threats: u64,
    pub firewall_rules: u64,
    pub packets_processed: u64,
    pub monitoring: bool,
}

impl DashboardStats {
    pub fn compose(counters: StoreCounters, network: &NetworkStats, monitoring: bool) -> Self {
        Self {
            total_alerts: counters.total_alerts,
            active_alerts: counters.active_alerts,
            critical_alerts: counters.critical_alerts,
            active_threats: counters.active_threats,
            firewall_rules: counters.firewall_rules,
            packets_processed: network.packets_processed,
            monitoring,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub kind: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Payload submitted for threat analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub data: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Handle for an analysis that completes asynchronously in the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisHandle {
    pub analysis_id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub severity: Severity,
    pub kind: String,
    pub source_ip: String,
    pub destination_ip: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertPatch {
    pub status: Option<AlertStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlertFilter {
    pub severity: Option<Severity>,
    pub status: Option<AlertStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFirewallRule {
    pub action: RuleAction,
    pub source_ip: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
}

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// 1-based page request; out-of-range values are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }

    /// Slice an already ordered collection.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(self.offset())
            .take(self.limit as usize)
            .collect();
        Page {
            items,
            total,
            request: *self,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.request.offset() + self.items.len() < self.total
    }

    pub fn has_previous(&self) -> bool {
        self.request.page > 1
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(
            PageRequest::new(None, Some(1000)),
            PageRequest { page: 1, limit: MAX_PAGE_LIMIT }
        );
    }

    #[test]
    fn test_page_apply_slices_and_reports_neighbours() {
        let page = PageRequest::new(Some(2), Some(3)).apply((0..8).collect::<Vec<_>>());

        assert_eq!(page.items, vec![3, 4, 5]);
        assert_eq!(page.total, 8);
        assert!(page.has_next());
        assert!(page.has_previous());
    }

    #[test]
    fn test_alert_serializes_kind_as_type() {
        let now = Utc::now();
        let alert = Alert {
            id: Uuid::nil(),
            severity: Severity::High,
            kind: "port_scan".into(),
            source_ip: "10.0.0.1".into(),
            destination_ip: None,
            description: "scan".into(),
            status: AlertStatus::Active,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&alert).unwrap();

        assert_eq!(json["type"], "port_scan");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["status"], "active");
    }
}
