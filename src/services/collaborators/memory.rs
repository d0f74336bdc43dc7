use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use super::model::{
    Activity, Alert, AlertFilter, AlertPatch, AlertStatus, AnalysisHandle, FirewallRule,
    MonitoringStatus, NetworkInterface, NetworkStats, NewAlert, NewFirewallRule, NewUser, Page,
    PageRequest, RuleAction, Sample, Severity, StoreCounters, Threat, ThreatStatus, User,
    UserPatch,
};
use super::{AnalysisEngine, CaptureEngine, CollaboratorError, CollaboratorResult, DataStore};
use crate::services::auth::password::{hash_password_blocking, verify_password_blocking};

const ACTIVITY_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct StoreState {
    alerts: HashMap<Uuid, Alert>,
    threats: HashMap<Uuid, Threat>,
    rules: HashMap<Uuid, FirewallRule>,
    users: HashMap<Uuid, StoredUser>,
    activity: VecDeque<Activity>,
}

impl StoreState {
    fn record(&mut self, kind: &str, message: String, at: DateTime<Utc>) {
        if self.activity.len() == ACTIVITY_CAPACITY {
            self.activity.pop_back();
        }
        self.activity.push_front(Activity {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            message,
            at,
        });
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.user.email.eq_ignore_ascii_case(email) && Some(u.user.id) != except)
    }
}

/// In-process data store. Lists are returned newest first.
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    state: RwLock<StoreState>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with a handful of alerts, threats and firewall rules.
    pub fn seeded() -> Self {
        let store = Self::new();
        let now = Utc::now();
        {
            let mut state = store.state.write();

            for (minutes_ago, severity, kind, source_ip, description) in [
                (5, Severity::High, "port_scan", "192.168.1.100", "Port scan detected from suspicious IP"),
                (42, Severity::Critical, "brute_force", "203.0.113.7", "Repeated SSH login failures"),
                (180, Severity::Low, "policy", "10.0.0.23", "Outbound traffic on unusual port"),
            ] {
                let at = now - ChronoDuration::minutes(minutes_ago);
                let alert = Alert {
                    id: Uuid::new_v4(),
                    severity,
                    kind: kind.to_string(),
                    source_ip: source_ip.to_string(),
                    destination_ip: None,
                    description: description.to_string(),
                    status: AlertStatus::Active,
                    notes: None,
                    created_at: at,
                    updated_at: at,
                };
                state.alerts.insert(alert.id, alert);
            }

            let threat = Threat {
                id: Uuid::new_v4(),
                name: "Trojan.Generic.12345".to_string(),
                severity: Severity::Critical,
                status: ThreatStatus::Active,
                source_ip: "192.168.1.50".to_string(),
                description: "Malware signature matched in captured payload".to_string(),
                confidence: 0.93,
                detected_at: now - ChronoDuration::minutes(30),
            };
            state.threats.insert(threat.id, threat);

            let rule = FirewallRule {
                id: Uuid::new_v4(),
                action: RuleAction::Block,
                source_ip: Some("192.168.1.100".to_string()),
                port: Some(22),
                protocol: Some("tcp".to_string()),
                description: Some("Block SSH from suspicious IP".to_string()),
                created_at: now - ChronoDuration::minutes(4),
            };
            state.rules.insert(rule.id, rule);

            state.record("alert", "Port scan detected".to_string(), now - ChronoDuration::minutes(5));
            state.record("firewall", "IP 192.168.1.100 blocked".to_string(), now - ChronoDuration::minutes(4));
        }
        store
    }
}

fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items
}

fn hashing_failed(e: impl std::fmt::Display) -> CollaboratorError {
    warn!(error = %e, "password hashing failed");
    CollaboratorError::unavailable("data_store", "password hashing failed")
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn list_alerts(
        &self,
        filter: AlertFilter,
        page: PageRequest,
    ) -> CollaboratorResult<Page<Alert>> {
        let alerts = self
            .state
            .read()
            .alerts
            .values()
            .filter(|a| filter.severity.is_none_or(|s| a.severity == s))
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .cloned()
            .collect::<Vec<_>>();

        Ok(page.apply(newest_first(alerts, |a| a.created_at)))
    }

    async fn get_alert(&self, id: Uuid) -> CollaboratorResult<Option<Alert>> {
        Ok(self.state.read().alerts.get(&id).cloned())
    }

    async fn create_alert(&self, alert: NewAlert) -> CollaboratorResult<Alert> {
        let now = Utc::now();
        let alert = Alert {
            id: Uuid::new_v4(),
            severity: alert.severity,
            kind: alert.kind,
            source_ip: alert.source_ip,
            destination_ip: alert.destination_ip,
            description: alert.description,
            status: AlertStatus::Active,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.write();
        state.record("alert", format!("{} alert from {}", alert.kind, alert.source_ip), now);
        state.alerts.insert(alert.id, alert.clone());
        Ok(alert)
    }

    async fn update_alert(&self, id: Uuid, patch: AlertPatch) -> CollaboratorResult<Option<Alert>> {
        let mut state = self.state.write();
        let Some(alert) = state.alerts.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(status) = patch.status {
            alert.status = status;
        }
        if let Some(notes) = patch.notes {
            alert.notes = Some(notes);
        }
        alert.updated_at = Utc::now();
        Ok(Some(alert.clone()))
    }

    async fn delete_alert(&self, id: Uuid) -> CollaboratorResult<bool> {
        Ok(self.state.write().alerts.remove(&id).is_some())
    }

    async fn list_threats(&self, page: PageRequest) -> CollaboratorResult<Page<Threat>> {
        let threats = self.state.read().threats.values().cloned().collect::<Vec<_>>();
        Ok(page.apply(newest_first(threats, |t: &Threat| t.detected_at)))
    }

    async fn get_threat(&self, id: Uuid) -> CollaboratorResult<Option<Threat>> {
        Ok(self.state.read().threats.get(&id).cloned())
    }

    async fn list_firewall_rules(
        &self,
        page: PageRequest,
    ) -> CollaboratorResult<Page<FirewallRule>> {
        let rules = self.state.read().rules.values().cloned().collect::<Vec<_>>();
        Ok(page.apply(newest_first(rules, |r: &FirewallRule| r.created_at)))
    }

    async fn add_firewall_rule(&self, rule: NewFirewallRule) -> CollaboratorResult<FirewallRule> {
        let now = Utc::now();
        let rule = FirewallRule {
            id: Uuid::new_v4(),
            action: rule.action,
            source_ip: rule.source_ip,
            port: rule.port,
            protocol: rule.protocol,
            description: rule.description,
            created_at: now,
        };

        let mut state = self.state.write();
        let target = rule.source_ip.as_deref().unwrap_or("any source");
        state.record("firewall", format!("{:?} rule added for {target}", rule.action), now);
        state.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    async fn delete_firewall_rule(&self, id: Uuid) -> CollaboratorResult<bool> {
        Ok(self.state.write().rules.remove(&id).is_some())
    }

    async fn list_users(&self, page: PageRequest) -> CollaboratorResult<Page<User>> {
        let users = self
            .state
            .read()
            .users
            .values()
            .map(|u| u.user.clone())
            .collect::<Vec<_>>();
        Ok(page.apply(newest_first(users, |u: &User| u.created_at)))
    }

    async fn get_user(&self, id: Uuid) -> CollaboratorResult<Option<User>> {
        Ok(self.state.read().users.get(&id).map(|u| u.user.clone()))
    }

    async fn create_user(&self, user: NewUser) -> CollaboratorResult<User> {
        if self.state.read().email_taken(&user.email, None) {
            return Err(CollaboratorError::Conflict("email already registered".into()));
        }

        let password_hash = hash_password_blocking(user.password)
            .await
            .map_err(hashing_failed)?;

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: now,
        };

        let mut state = self.state.write();
        // Re-check: another registration may have raced us while hashing.
        if state.email_taken(&created.email, None) {
            return Err(CollaboratorError::Conflict("email already registered".into()));
        }
        state.record("user", format!("user {} registered", created.email), now);
        state.users.insert(
            created.id,
            StoredUser {
                user: created.clone(),
                password_hash,
            },
        );
        Ok(created)
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> CollaboratorResult<Option<User>> {
        let mut state = self.state.write();
        if let Some(email) = &patch.email
            && state.email_taken(email, Some(id))
        {
            return Err(CollaboratorError::Conflict("email already registered".into()));
        }

        let Some(stored) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = patch.email {
            stored.user.email = email;
        }
        if let Some(name) = patch.name {
            stored.user.name = name;
        }
        if let Some(role) = patch.role {
            stored.user.role = role;
        }
        Ok(Some(stored.user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> CollaboratorResult<bool> {
        Ok(self.state.write().users.remove(&id).is_some())
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> CollaboratorResult<Option<User>> {
        let found = self
            .state
            .read()
            .users
            .values()
            .find(|u| u.user.email.eq_ignore_ascii_case(email))
            .cloned();

        let Some(stored) = found else {
            debug!("login for unknown email");
            return Ok(None);
        };

        let ok = verify_password_blocking(password.to_string(), stored.password_hash)
            .await
            .map_err(hashing_failed)?;

        Ok(ok.then_some(stored.user))
    }

    async fn counters(&self) -> CollaboratorResult<StoreCounters> {
        let state = self.state.read();
        let active = |a: &&Alert| a.status == AlertStatus::Active;

        Ok(StoreCounters {
            total_alerts: state.alerts.len() as u64,
            active_alerts: state.alerts.values().filter(active).count() as u64,
            critical_alerts: state
                .alerts
                .values()
                .filter(active)
                .filter(|a| a.severity == Severity::Critical)
                .count() as u64,
            active_threats: state
                .threats
                .values()
                .filter(|t| t.status != ThreatStatus::Mitigated)
                .count() as u64,
            firewall_rules: state.rules.len() as u64,
        })
    }

    async fn recent_activity(&self, limit: usize) -> CollaboratorResult<Vec<Activity>> {
        Ok(self
            .state
            .read()
            .activity
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn probe(&self) -> CollaboratorResult<()> {
        Ok(())
    }
}

/// Stand-in for the packet capture engine. Counters advance while monitoring.
#[derive(Debug)]
pub struct MemoryCaptureEngine {
    status: Mutex<MonitoringStatus>,
    interfaces: Vec<NetworkInterface>,
}

impl Default for MemoryCaptureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCaptureEngine {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(MonitoringStatus::default()),
            interfaces: vec![
                NetworkInterface {
                    name: "eth0".to_string(),
                    addresses: vec!["192.168.1.10".to_string()],
                    is_up: true,
                },
                NetworkInterface {
                    name: "lo".to_string(),
                    addresses: vec!["127.0.0.1".to_string()],
                    is_up: true,
                },
            ],
        }
    }
}

#[async_trait]
impl CaptureEngine for MemoryCaptureEngine {
    async fn interfaces(&self) -> CollaboratorResult<Vec<NetworkInterface>> {
        Ok(self.interfaces.clone())
    }

    async fn stats(&self) -> CollaboratorResult<NetworkStats> {
        let status = self.status.lock().clone();
        let Some(started_at) = status.started_at.filter(|_| status.is_running) else {
            return Ok(NetworkStats::default());
        };

        let seconds = (Utc::now() - started_at).num_seconds().max(0) as u64;
        let packets = seconds * 1_200;
        Ok(NetworkStats {
            packets_processed: packets,
            bytes_processed: packets * 512,
            active_connections: 12,
            packets_per_second: 1_200.0,
        })
    }

    async fn monitoring_status(&self) -> CollaboratorResult<MonitoringStatus> {
        Ok(self.status.lock().clone())
    }

    async fn start_monitoring(&self, interface: &str) -> CollaboratorResult<MonitoringStatus> {
        if !self.interfaces.iter().any(|i| i.name == interface) {
            return Err(CollaboratorError::Rejected(format!(
                "unknown interface: {interface}"
            )));
        }

        let mut status = self.status.lock();
        if status.is_running && status.interface.as_deref() == Some(interface) {
            return Ok(status.clone());
        }
        *status = MonitoringStatus {
            is_running: true,
            interface: Some(interface.to_string()),
            started_at: Some(Utc::now()),
        };
        Ok(status.clone())
    }

    async fn stop_monitoring(&self) -> CollaboratorResult<MonitoringStatus> {
        let mut status = self.status.lock();
        *status = MonitoringStatus::default();
        Ok(status.clone())
    }

    async fn probe(&self) -> CollaboratorResult<()> {
        Ok(())
    }
}

/// Accepts samples and hands back a handle; nothing is analysed.
#[derive(Debug, Default)]
pub struct MemoryAnalysisEngine {
    submitted: Mutex<Vec<(String, Sample)>>,
}

impl MemoryAnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> usize {
        self.submitted.lock().len()
    }
}

#[async_trait]
impl AnalysisEngine for MemoryAnalysisEngine {
    async fn submit(&self, sample: Sample) -> CollaboratorResult<AnalysisHandle> {
        let analysis_id = format!("analysis_{}", Uuid::new_v4().simple());
        self.submitted.lock().push((analysis_id.clone(), sample));
        Ok(AnalysisHandle {
            analysis_id,
            status: "processing".to_string(),
        })
    }

    async fn probe(&self) -> CollaboratorResult<()> {
        Ok(())
    }
}
