//! Batch speech recognition over the VITO REST API.
//!
//! A job is submitted as one streaming `multipart/form-data` POST (recognition
//! config first, then the audio) and its transcript is fetched later by id.
//!
//! # Architecture
//!
//! The module is organized into focused submodules:
//!
//! - [`config`]: Request types (`AudioSource`, `RecognitionConfig`, `RecognizeRequest`)
//! - [`messages`]: Response types for the submit and status endpoints
//! - `multipart`: The streaming `reqwest` form and the writer that feeds its audio part
//! - `client`: The `RestClient` submission pipeline and result polling
//!
//! # Job lifecycle
//!
//! ```text
//! recognize_async ──▶ id ──▶ receive_result ──▶ transcribing ─┐
//!                                  ▲                          │ wait interval
//!                                  └──────────────────────────┘
//!                            completed → Ok(response)
//!                            failed    → Err(Failed)
//!                            other     → Err(Protocol)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use vito_speech::{AudioSource, ClientConfig, RecognitionConfig, RecognizeRequest, RestClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RestClient::new(ClientConfig::from_env()?)?;
//!     let cancel = CancellationToken::new();
//!
//!     let request = RecognizeRequest::new(
//!         RecognitionConfig::default().with_diarization(2),
//!         AudioSource::from_bytes(std::fs::read("call.wav")?),
//!     );
//!
//!     // Submit now, collect later
//!     let id = client.recognize_async(&request, &cancel).await?;
//!     let response = client
//!         .receive_result_with_polling(&id, Duration::from_secs(2), &cancel)
//!         .await?;
//!
//!     for utterance in response.utterances() {
//!         println!("[{}] {}", utterance.spk, utterance.msg);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
pub mod config;
mod error;
pub mod messages;
mod multipart;


pub use client::{DEFAULT_POLLING_INTERVAL, RestClient};
pub use config::{
    AudioSource, DEFAULT_AUDIO_FILE_NAME, DiarizationConfig, ParagraphSplitterConfig,
    RecognitionConfig, RecognizeRequest,
};
pub use error::{SpeechError, SpeechResult};
pub use messages::{
    ErrorResponse, RecognizeResponse, RecognizeResults, ResultId, ResultStatus, SubmitResponse,
    Utterance,
};
pub use multipart::{CONFIG_FIELD, FILE_FIELD};
