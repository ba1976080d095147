use crate::runner::state::Report;
use serde::{Deserialize, Serialize};

/// Saved results of one checklist run, the input of every report format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistResults {
    pub run_id: String,
    pub checklist: String,
    pub backend: String,
    pub report: Report,
    pub generated_at: String,
}

impl ChecklistResults {
    pub fn new(checklist: &str, backend: &str, report: Report) -> Self {
        Self {
            run_id: report.run_id().to_string(),
            checklist: checklist.to_string(),
            backend: backend.to_string(),
            report,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
