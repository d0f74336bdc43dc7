use serde::Deserialize;

use crate::services::collaborators::model::{NewFirewallRule, RuleAction};

const PROTOCOLS: [&str; 4] = ["tcp", "udp", "icmp", "any"];

#[derive(Debug, Deserialize)]
pub struct AddFirewallRuleRequest {
    pub action: String,
    pub source_ip: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub description: Option<String>,
}

impl AddFirewallRuleRequest {
    pub fn into_new_rule(self) -> Result<NewFirewallRule, &'static str> {
        let action = self.action.parse::<RuleAction>()?;
        if self.port == Some(0) {
            return Err("port must be between 1 and 65535");
        }
        let protocol = self.protocol.map(|p| p.trim().to_ascii_lowercase());
        if let Some(p) = &protocol
            && !PROTOCOLS.contains(&p.as_str())
        {
            return Err("protocol must be one of: tcp, udp, icmp, any");
        }

        Ok(NewFirewallRule {
            action,
            source_ip: self.source_ip.filter(|s| !s.trim().is_empty()),
            port: self.port,
            protocol,
            description: self.description,
        })
    }
}
