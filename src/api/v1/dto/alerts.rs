use serde::Deserialize;

use crate::services::collaborators::model::{
    AlertFilter, AlertPatch, AlertStatus, NewAlert, PageRequest, Severity,
};

#[derive(Debug, Default, Deserialize)]
pub struct AlertListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub severity: Option<String>,
    pub status: Option<String>,
}

impl AlertListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn filter(&self) -> Result<AlertFilter, &'static str> {
        let severity = match self.severity.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => Some(s.parse::<Severity>()?),
            None => None,
        };
        let status = match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => Some(s.parse::<AlertStatus>()?),
            None => None,
        };
        Ok(AlertFilter { severity, status })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub severity: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source_ip: String,
    pub destination_ip: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl CreateAlertRequest {
    pub fn into_new_alert(self) -> Result<NewAlert, &'static str> {
        let severity = self.severity.parse::<Severity>()?;
        if self.kind.trim().is_empty() {
            return Err("type is required");
        }
        if self.source_ip.trim().is_empty() {
            return Err("source_ip is required");
        }

        Ok(NewAlert {
            severity,
            kind: self.kind.trim().to_string(),
            source_ip: self.source_ip.trim().to_string(),
            destination_ip: self.destination_ip,
            description: self.description,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAlertRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl UpdateAlertRequest {
    pub fn into_patch(self) -> Result<AlertPatch, &'static str> {
        let status = match self.status.as_deref() {
            Some(s) => Some(s.parse::<AlertStatus>()?),
            None => None,
        };
        if status.is_none() && self.notes.is_none() {
            return Err("nothing to update");
        }
        Ok(AlertPatch {
            status,
            notes: self.notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_severity_is_rejected() {
        let req = CreateAlertRequest {
            severity: "urgent".into(),
            kind: "port_scan".into(),
            source_ip: "10.0.0.1".into(),
            destination_ip: None,
            description: String::new(),
        };
        assert!(req.into_new_alert().is_err());
    }

    #[test]
    fn test_empty_update_is_rejected() {
        let req = UpdateAlertRequest {
            status: None,
            notes: None,
        };
        assert_eq!(req.into_patch(), Err("nothing to update"));
    }
}
