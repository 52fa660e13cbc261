//! Response bodies of the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{RowVerdict, RunSummary};
use crate::parser::SheetInfo;
use crate::pipeline::CheckResult;

/// Result of `POST /api/check`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub job_id: String,
    /// "ready" when every row passed, "warning" otherwise.
    pub status: CheckStatus,
    pub file_name: Option<String>,
    pub checked_at: DateTime<Utc>,
    pub sheet: SheetInfo,
    pub summary: RunSummary,
    pub rows: Vec<RowVerdict>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ready,
    Warning,
}

impl CheckResponse {
    pub fn new(result: CheckResult, file_name: Option<String>) -> Self {
        let status = if result.has_failures() {
            CheckStatus::Warning
        } else {
            CheckStatus::Ready
        };

        Self {
            job_id: Uuid::new_v4().to_string(),
            status,
            file_name,
            checked_at: Utc::now(),
            sheet: result.sheet_info,
            summary: result.summary,
            rows: result.verdicts,
        }
    }
}

/// JSON body for a failed request.
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_csv_str, IngestOptions};
    use crate::pipeline::check_sheet;
    use crate::rules::RuleConfig;

    #[test]
    fn test_check_response_shape() {
        let sheet = parse_csv_str("a;b\n1;2", ';', IngestOptions { skip_rows: 0 }).unwrap();
        let result = check_sheet(&sheet, &RuleConfig::default()).unwrap();
        let response = CheckResponse::new(result, Some("export.csv".into()));

        // every rule fails on a sheet without the expected columns
        assert_eq!(response.status, CheckStatus::Warning);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "warning");
        assert_eq!(value["fileName"], "export.csv");
        assert!(value["jobId"].as_str().is_some());
        assert!(value["checkedAt"].is_string());
        assert_eq!(value["sheet"]["rowCount"], 1);
        assert_eq!(value["summary"]["totalRows"], 1);
        assert_eq!(value["rows"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_error_response() {
        let value = error_response("No file provided");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "No file provided");
        assert!(Uuid::parse_str(value["jobId"].as_str().unwrap()).is_ok());
    }
}
