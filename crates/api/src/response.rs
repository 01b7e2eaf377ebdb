use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::models::{ErrorBody, ErrorCode};

/// Status code and decoded body of one completed HTTP exchange.
///
/// The envelope never judges the status; callers state which code they
/// expect when extracting the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    status: StatusCode,
    body: Option<Value>,
    raw: Option<String>,
}

/// Result of matching an envelope against an expected status.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure(Failure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl Failure {
    pub fn error(&self, fallback_message: &str) -> ErrorBody {
        error_from_body(self.body.as_ref(), fallback_message)
    }

    pub fn extract<T: DeserializeOwned>(&self, expected: StatusCode) -> Option<T> {
        if self.status != expected {
            return None;
        }
        decode(self.body.as_ref())
    }
}

impl ResponseEnvelope {
    pub fn new(status: StatusCode, body: Option<Value>) -> Self {
        let body = body.filter(|value| !value.is_null());
        Self {
            status,
            body,
            raw: None,
        }
    }

    /// Decodes raw response bytes: empty means no body, invalid JSON is kept
    /// as a string value so error pages still reach the caller.
    pub fn from_bytes(status: StatusCode, bytes: &[u8]) -> Self {
        Self::new(status, decode_body(bytes))
    }

    /// Keeps the undecoded body text next to the decoded value.
    pub fn with_raw_text(mut self, text: impl Into<String>) -> Self {
        self.raw = Some(text.into());
        self
    }

    /// Body text exactly as received, for envelopes built from raw downloads.
    pub fn raw_text(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn is(&self, status: StatusCode) -> bool {
        self.status == status
    }

    /// The payload typed as `T`, only when the status is `expected` and a
    /// body that decodes as `T` is present.
    pub fn extract<T: DeserializeOwned>(&self, expected: StatusCode) -> Option<T> {
        if self.status != expected {
            return None;
        }
        decode(self.body.as_ref())
    }

    /// Reinterprets the body as an error document. Never fails: without a
    /// usable body the result carries `ErrorCode::Unknown` and the fallback.
    pub fn extract_error(&self, fallback_message: &str) -> ErrorBody {
        error_from_body(self.body.as_ref(), fallback_message)
    }

    pub fn into_outcome<T: DeserializeOwned>(self, expected: StatusCode) -> Outcome<T> {
        match self.extract(expected) {
            Some(payload) => Outcome::Success(payload),
            None => Outcome::Failure(Failure {
                status: self.status,
                body: self.body,
            }),
        }
    }
}

fn decode<T: DeserializeOwned>(body: Option<&Value>) -> Option<T> {
    body.and_then(|value| serde_json::from_value(value.clone()).ok())
}

fn decode_body(bytes: &[u8]) -> Option<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

fn error_from_body(body: Option<&Value>, fallback_message: &str) -> ErrorBody {
    let mut error = match body {
        Some(Value::Object(_)) => decode(body)
            .unwrap_or_else(|| ErrorBody::new(ErrorCode::Unknown, fallback_message)),
        Some(Value::String(text)) if !text.trim().is_empty() => {
            ErrorBody::new(ErrorCode::Unknown, text.trim())
        }
        _ => ErrorBody::new(ErrorCode::Unknown, fallback_message),
    };
    if error.message.is_empty() {
        error.message = fallback_message.to_string();
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReviewError, User};
    use serde_json::json;

    #[test]
    fn test_extract_matching_status() {
        let envelope = ResponseEnvelope::new(StatusCode::OK, Some(json!({"userName": "bob"})));
        let user: User = envelope.extract(StatusCode::OK).unwrap();
        assert_eq!(user.user_name, "bob");
    }

    #[test]
    fn test_extract_mismatched_status_is_none() {
        let envelope = ResponseEnvelope::new(StatusCode::CREATED, Some(json!({"userName": "bob"})));
        assert!(envelope.extract::<User>(StatusCode::OK).is_none());
    }

    #[test]
    fn test_extract_without_body_is_none() {
        for body in [None, Some(Value::Null)] {
            let envelope = ResponseEnvelope::new(StatusCode::OK, body);
            assert!(envelope.extract::<Value>(StatusCode::OK).is_none());
            assert!(envelope.body().is_none());
        }
    }

    #[test]
    fn test_extract_all_status_and_presence_combinations() {
        let statuses = [
            StatusCode::OK,
            StatusCode::NO_CONTENT,
            StatusCode::NOT_FOUND,
            StatusCode::CONFLICT,
        ];
        for actual in statuses {
            for expected in statuses {
                for body in [None, Some(json!({"k": 1}))] {
                    let present = body.is_some();
                    let envelope = ResponseEnvelope::new(actual, body);
                    let extracted = envelope.extract::<Value>(expected);
                    assert_eq!(extracted.is_some(), present && actual == expected);
                }
            }
        }
    }

    #[test]
    fn test_conflict_body_preserved_by_extract_error() {
        let body = json!({"reviewId": "CR-1", "message": "blocked", "failedConditions": []});
        let envelope = ResponseEnvelope::new(StatusCode::CONFLICT, Some(body.clone()));

        assert!(envelope.extract::<Value>(StatusCode::OK).is_none());

        let error = envelope.extract_error("fallback");
        assert_eq!(error.code, ErrorCode::Unknown);
        assert_eq!(error.message, "blocked");
        assert_eq!(error.details["reviewId"], "CR-1");
        assert_eq!(error.details["failedConditions"], json!([]));

        let conflict: ReviewError = envelope.extract(StatusCode::CONFLICT).unwrap();
        assert_eq!(conflict.review_id, "CR-1");
    }

    #[test]
    fn test_extract_error_without_body_uses_fallback() {
        let envelope = ResponseEnvelope::new(StatusCode::INTERNAL_SERVER_ERROR, None);
        let error = envelope.extract_error("Request failed");
        assert_eq!(error.code, ErrorCode::Unknown);
        assert_eq!(error.message, "Request failed");
    }

    #[test]
    fn test_extract_error_reads_code() {
        let envelope = ResponseEnvelope::new(
            StatusCode::NOT_FOUND,
            Some(json!({"code": "NotFound", "message": "Review CR-9 not found"})),
        );
        let error = envelope.extract_error("unused");
        assert_eq!(error.code, ErrorCode::NotFound);
        assert_eq!(error.message, "Review CR-9 not found");
        assert!(error.details.is_empty());
    }

    #[test]
    fn test_extract_error_with_unexpected_shapes() {
        let array = ResponseEnvelope::new(StatusCode::BAD_REQUEST, Some(json!([1, 2])));
        assert_eq!(array.extract_error("fallback").message, "fallback");

        let text = ResponseEnvelope::from_bytes(StatusCode::BAD_GATEWAY, b"<html>Bad gateway</html>");
        assert_eq!(text.extract_error("fallback").message, "<html>Bad gateway</html>");

        let no_message = ResponseEnvelope::new(StatusCode::BAD_REQUEST, Some(json!({"code": "IllegalState"})));
        let error = no_message.extract_error("fallback");
        assert_eq!(error.code, ErrorCode::IllegalState);
        assert_eq!(error.message, "fallback");
    }

    #[test]
    fn test_from_bytes_decoding() {
        assert!(ResponseEnvelope::from_bytes(StatusCode::OK, b"").body().is_none());
        assert!(ResponseEnvelope::from_bytes(StatusCode::OK, b"  \n").body().is_none());
        assert_eq!(
            ResponseEnvelope::from_bytes(StatusCode::OK, b"{\"a\":1}").body(),
            Some(&json!({"a": 1}))
        );
        assert_eq!(
            ResponseEnvelope::from_bytes(StatusCode::OK, b"plain text").body(),
            Some(&json!("plain text"))
        );
    }

    #[test]
    fn test_raw_text_survives_decoding() {
        let pretty = "{\n  \"name\": \"x\"\n}\n";
        let envelope = ResponseEnvelope::from_bytes(StatusCode::OK, pretty.as_bytes())
            .with_raw_text(pretty);
        assert_eq!(envelope.body(), Some(&json!({"name": "x"})));
        assert_eq!(envelope.raw_text(), Some(pretty));

        let null = ResponseEnvelope::from_bytes(StatusCode::OK, b"null").with_raw_text("null");
        assert!(null.body().is_none());
        assert_eq!(null.raw_text(), Some("null"));

        assert!(ResponseEnvelope::new(StatusCode::OK, None).raw_text().is_none());
    }

    #[test]
    fn test_into_outcome() {
        let ok = ResponseEnvelope::new(StatusCode::OK, Some(json!({"userName": "amy"})));
        match ok.into_outcome::<User>(StatusCode::OK) {
            Outcome::Success(user) => assert_eq!(user.user_name, "amy"),
            Outcome::Failure(_) => panic!("expected success"),
        }

        let missing = ResponseEnvelope::new(StatusCode::NOT_FOUND, Some(json!({"message": "gone"})));
        match missing.into_outcome::<User>(StatusCode::OK) {
            Outcome::Success(_) => panic!("expected failure"),
            Outcome::Failure(failure) => {
                assert_eq!(failure.status, StatusCode::NOT_FOUND);
                assert_eq!(failure.error("x").message, "gone");
            }
        }
    }
}
