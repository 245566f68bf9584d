//! Error taxonomy for the speech client.

use thiserror::Error;

use super::messages::ErrorResponse;
use crate::transport::TransportError;

/// Result type for speech operations
pub type SpeechResult<T> = Result<T, SpeechError>;

/// Every failure a speech operation can report.
///
/// `NotFinished` is a control signal rather than a failure: the job exists
/// and is still transcribing. Match on it instead of comparing messages.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// The audio source is missing or ambiguous. Raised before any I/O.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Reading the local audio file failed while streaming it.
    #[error("Audio I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The recognition config could not be serialized.
    #[error("Failed to encode recognition config: {0}")]
    Encode(#[source] serde_json::Error),

    /// The HTTP exchange itself failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-200 status.
    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// The response body was not the expected JSON.
    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The response decoded but broke the protocol (unknown job status,
    /// missing job id).
    #[error("Protocol error ({reason}): {body}")]
    Protocol { reason: String, body: String },

    /// The job is still transcribing; poll again later.
    #[error("Result is not complete yet")]
    NotFinished,

    /// The server reported that the job failed.
    #[error("Recognition job {id} failed")]
    Failed { id: String },

    /// The caller's cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,
}

impl SpeechError {
    /// `true` for the "poll again later" signal.
    pub fn is_not_finished(&self) -> bool {
        matches!(self, SpeechError::NotFinished)
    }

    /// `true` for failures a caller might reasonably retry (network errors and 5xx).
    /// The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            SpeechError::Transport(TransportError::Auth(_)) => false,
            SpeechError::Transport(_) => true,
            SpeechError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status for `Server` errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SpeechError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The API's `{code, msg}` error body for `Server` errors, when present.
    pub fn error_response(&self) -> Option<ErrorResponse> {
        match self {
            SpeechError::Server { body, .. } => ErrorResponse::parse(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_finished_is_distinguishable() {
        assert!(SpeechError::NotFinished.is_not_finished());
        assert!(!SpeechError::Failed { id: "x".into() }.is_not_finished());
        assert!(!SpeechError::Cancelled.is_not_finished());
    }

    #[test]
    fn test_retryable_classification() {
        let server = |status| SpeechError::Server {
            status,
            body: String::new(),
        };
        assert!(server(503).is_retryable());
        assert!(!server(400).is_retryable());
        assert!(SpeechError::Transport(TransportError::Timeout("slow".into())).is_retryable());
        assert!(!SpeechError::Validation("bad".into()).is_retryable());
        assert!(!SpeechError::NotFinished.is_retryable());
    }

    #[test]
    fn test_server_error_display_contains_body() {
        let err = SpeechError::Server {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.status_code(), Some(500));
        assert!(err.to_string().contains("boom"));
        assert!(err.to_string().contains("500"));
        assert_eq!(err.error_response(), None);
    }

    #[test]
    fn test_error_response_from_server_body() {
        let err = SpeechError::Server {
            status: 401,
            body: r#"{"code":"H0002","msg":"invalid token"}"#.to_string(),
        };
        let detail = err.error_response().unwrap();
        assert_eq!(detail.code, "H0002");
        assert_eq!(detail.msg, "invalid token");
        assert_eq!(SpeechError::NotFinished.error_response(), None);
    }
}
