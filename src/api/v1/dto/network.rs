use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct StartMonitoringRequest {
    pub interface: String,
}

impl StartMonitoringRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.interface.trim().is_empty() {
            return Err("interface is required");
        }
        Ok(())
    }
}
