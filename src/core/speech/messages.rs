//! Message types for the batch transcription REST API.
//!
//! - `POST <endpoint>` returns [`SubmitResponse`] (`{"id": "..."}`)
//! - `GET <endpoint>/<id>` returns [`RecognizeResponse`]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// =============================================================================
// Result Id
// =============================================================================

/// Opaque handle identifying a submitted job.
///
/// Persist it to resume polling later with
/// [`RestClient::receive_result`](super::RestClient::receive_result).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultId(String);

impl ResultId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ResultId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ResultId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for ResultId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Job Status
// =============================================================================

/// Job status reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultStatus {
    /// Still running (non-terminal).
    Transcribing,
    /// Finished; the response carries results.
    Completed,
    /// The job failed on the server.
    Failed,
    /// Anything else, including a missing or `null` status. Never sent by a
    /// well-behaved server.
    Unrecognized(String),
}

impl Default for ResultStatus {
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

impl ResultStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Transcribing => "transcribing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unrecognized(s) => s,
        }
    }

    /// `true` unless the job is still transcribing.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Transcribing)
    }
}

impl From<&str> for ResultStatus {
    fn from(s: &str) -> Self {
        match s {
            "transcribing" => Self::Transcribing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResultStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResultStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.as_deref().map(Self::from).unwrap_or_default())
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Body of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: ResultId,
}

/// Snapshot of a job, as returned by one status fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizeResponse {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub status: ResultStatus,

    /// Present once the job has completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<RecognizeResults>,

    /// Fields this client does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecognizeResponse {
    /// Recognized utterances, empty until completed.
    pub fn utterances(&self) -> &[Utterance] {
        self.results
            .as_ref()
            .map(|r| r.utterances.as_slice())
            .unwrap_or_default()
    }

    /// All utterance texts joined with single spaces.
    pub fn transcript(&self) -> String {
        self.utterances()
            .iter()
            .map(|u| u.msg.trim())
            .filter(|m| !m.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Results of a completed job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizeResults {
    #[serde(default)]
    pub utterances: Vec<Utterance>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

/// One recognized utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Start offset in milliseconds.
    #[serde(default)]
    pub start_at: u64,

    /// Duration in milliseconds.
    #[serde(default)]
    pub duration: u64,

    /// Recognized text.
    #[serde(default)]
    pub msg: String,

    /// Speaker index (when diarization is enabled).
    #[serde(default)]
    pub spk: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Utterance {
    /// End offset in milliseconds.
    pub fn end_at(&self) -> u64 {
        self.start_at.saturating_add(self.duration)
    }
}

/// Error body the API returns alongside non-200 statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    #[serde(default)]
    pub msg: String,
}

impl ErrorResponse {
    /// Parse an error body, `None` when it is not the API's JSON error shape.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(ResultStatus::from("transcribing"), ResultStatus::Transcribing);
        assert_eq!(ResultStatus::from("completed"), ResultStatus::Completed);
        assert_eq!(ResultStatus::from("failed"), ResultStatus::Failed);
        assert_eq!(
            ResultStatus::from("weird"),
            ResultStatus::Unrecognized("weird".to_string())
        );
        assert!(!ResultStatus::Transcribing.is_terminal());
        assert!(ResultStatus::Failed.is_terminal());
    }

    #[test]
    fn test_completed_response_parsing() {
        let json = r#"{
            "id": "job-1",
            "status": "completed",
            "results": {
                "utterances": [
                    {"start_at": 0, "duration": 1200, "msg": "hello", "spk": 0, "lang": "ko"},
                    {"start_at": 1300, "duration": 800, "msg": " world ", "spk": 1}
                ],
                "verified": true
            }
        }"#;

        let response: RecognizeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.id, "job-1");
        assert_eq!(response.status, ResultStatus::Completed);
        assert_eq!(response.utterances().len(), 2);
        assert_eq!(response.utterances()[0].end_at(), 1200);
        assert_eq!(response.utterances()[1].lang, None);
        assert_eq!(response.transcript(), "hello world");
    }

    #[test]
    fn test_missing_or_null_status_is_unrecognized() {
        let missing: RecognizeResponse = serde_json::from_str(r#"{"id":"job-1"}"#).unwrap();
        assert_eq!(missing.status, ResultStatus::Unrecognized(String::new()));
        assert!(missing.status.is_terminal());

        let null: RecognizeResponse =
            serde_json::from_str(r#"{"id":"job-1","status":null}"#).unwrap();
        assert_eq!(null.status, ResultStatus::Unrecognized(String::new()));
    }

    #[test]
    fn test_end_at_saturates() {
        let utterance = Utterance {
            start_at: u64::MAX - 10,
            duration: 500,
            ..Utterance::default()
        };
        assert_eq!(utterance.end_at(), u64::MAX);
    }

    #[test]
    fn test_error_response_parsing() {
        assert_eq!(
            ErrorResponse::parse(r#"{"code":"H0002","msg":"invalid token"}"#),
            Some(ErrorResponse {
                code: "H0002".to_string(),
                msg: "invalid token".to_string(),
            })
        );
        assert_eq!(
            ErrorResponse::parse(r#"{"code":"A0001"}"#).map(|e| e.msg),
            Some(String::new())
        );
        assert_eq!(ErrorResponse::parse("<html>bad gateway</html>"), None);
        assert_eq!(ErrorResponse::parse(r#"{"msg":"no code"}"#), None);
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let json = r#"{"id":"job-2","status":"transcribing","progress":42}"#;
        let response: RecognizeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.extra.get("progress"), Some(&Value::from(42)));
        assert!(response.utterances().is_empty());
        assert_eq!(response.transcript(), "");
    }

    #[test]
    fn test_submit_response_ignores_extra_fields() {
        let response: SubmitResponse =
            serde_json::from_str(r#"{"id":"abc","queued_at":123}"#).unwrap();
        assert_eq!(response.id, ResultId::new("abc"));
    }

    #[test]
    fn test_result_id_is_transparent() {
        let id = ResultId::from("job-9");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"job-9\"");
        assert_eq!(id.to_string(), "job-9");
    }
}
