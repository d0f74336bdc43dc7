use serde::Deserialize;

use crate::services::collaborators::model::Sample;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub data: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl AnalyzeRequest {
    pub fn into_sample(self) -> Result<Sample, &'static str> {
        if self.data.is_empty() {
            return Err("data is required");
        }
        Ok(Sample {
            data: self.data,
            kind: self.kind,
        })
    }
}
