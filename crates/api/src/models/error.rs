use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    IllegalArgument,
    IllegalState,
    NotFound,
    NotPermitted,
    PermaIdFormat,
    ReviewContentTooLarge,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IllegalArgument => "IllegalArgument",
            ErrorCode::IllegalState => "IllegalState",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::NotPermitted => "NotPermitted",
            ErrorCode::PermaIdFormat => "PermaIdFormat",
            ErrorCode::ReviewContentTooLarge => "ReviewContentTooLarge",
            ErrorCode::Unknown => "Unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ErrorCode::Unknown)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic error document returned for failed requests.
///
/// Fields other than `code` and `message` are kept in `details`, so richer
/// bodies (such as a [`ReviewError`]) survive unchanged. An `Unknown` code is
/// not written back out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "ErrorCode::is_unknown")]
    pub code: ErrorCode,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Map::new(),
        }
    }
}

/// Conflict document for refused review state transitions (HTTP 409).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewError {
    #[serde(default)]
    pub review_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub failed_conditions: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conflict_body_serializes_as_received() {
        let body = json!({
            "reviewId": "CR-1",
            "message": "blocked",
            "failedConditions": [{"kind": "openDefects"}]
        });
        let error: ErrorBody = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(error.code, ErrorCode::Unknown);
        assert_eq!(serde_json::to_value(&error).unwrap(), body);
    }

    #[test]
    fn test_known_code_is_serialized() {
        let body = json!({"code": "NotFound", "message": "gone"});
        let error: ErrorBody = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(serde_json::to_value(&error).unwrap(), body);
    }
}
