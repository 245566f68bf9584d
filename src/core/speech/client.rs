//! Batch speech-recognition REST client.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐  bounded mpsc  ┌──────────────────┐   POST   ┌─────────┐
//! │ AudioWriter        │───────────────▶│ multipart Form   │─────────▶│ server  │
//! │ (spawned task)     │ (backpressure) │ (HttpTransport)  │          │         │
//! └────────────────────┘                └──────────────────┘          └────┬────┘
//!          │ Result<BodyOutcome, _>               │ TransportResponse      │
//!          └──────────────┬───────────────────────┘                        │
//!                         ▼                                                │
//!                  both settled ──▶ ResultId ──▶ GET <endpoint>/<id> ◀──────┘
//!                                               (single fetch or polling)
//! ```
//!
//! Submission joins the writer task and the HTTP exchange, and a writer
//! failure wins over whatever the server answered to the truncated body. A
//! success status for a body the transport never finished reading is also
//! a failure.
//! Every wait (the join, each fetch, each polling delay) races the caller's
//! [`CancellationToken`]. Uploads carry no request deadline of their own, so
//! the token is the only bound on how long a large file may take to send.

use http::StatusCode;
use http::header::CONTENT_TYPE;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::RecognizeRequest;
use super::error::{SpeechError, SpeechResult};
use super::messages::{
    ErrorResponse, RecognizeResponse, ResultId, ResultStatus, SubmitResponse,
};
use super::multipart::{AudioPayload, BodyOutcome, prepare_upload};
use crate::auth::{AuthenticatedTransport, TokenSource};
use crate::config::{
    ClientConfig, ConfigError, DEFAULT_CHUNK_SIZE, DEFAULT_PIPE_CAPACITY,
    DEFAULT_POLLING_INTERVAL_MS,
};
use crate::transport::{
    HttpTransport, ReqwestTransport, RequestBody, TransportRequest, TransportResponse,
};

/// Polling interval used when none is configured.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(DEFAULT_POLLING_INTERVAL_MS);

/// Client for the batch transcription API.
///
/// The client holds no per-job state: the [`ResultId`] returned by
/// [`recognize_async`](Self::recognize_async) is the only handoff to
/// [`receive_result`](Self::receive_result). One instance can serve any
/// number of concurrent callers; the transport (and its connection pool) is
/// shared.
///
/// # Example
///
/// ```rust,no_run
/// use vito_speech::{AudioSource, ClientConfig, RecognitionConfig, RecognizeRequest, RestClient};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = RestClient::new(ClientConfig::from_env()?)?;
///     let request = RecognizeRequest::new(
///         RecognitionConfig::default().with_model("sommers"),
///         AudioSource::from_path("meeting.wav"),
///     );
///
///     let cancel = CancellationToken::new();
///     let response = client.recognize(&request, &cancel).await?;
///     println!("{}", response.transcript());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RestClient {
    endpoint: String,
    transport: Arc<dyn HttpTransport>,
    polling_interval: Duration,
    pipe_capacity: usize,
    chunk_size: usize,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("endpoint", &self.endpoint)
            .field("polling_interval", &self.polling_interval)
            .field("pipe_capacity", &self.pipe_capacity)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl RestClient {
    /// Build a client from configuration.
    ///
    /// Requests go through a pooled `reqwest` transport, wrapped in an
    /// authenticating transport when credentials are configured.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let http = ReqwestTransport::new(config.request_timeout, config.connect_timeout)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let transport: Arc<dyn HttpTransport> = match &config.credentials {
            Some(credentials) => Arc::new(AuthenticatedTransport::new(
                http,
                TokenSource::new(&config.api_base, credentials.clone()),
            )),
            None => Arc::new(http),
        };

        Ok(Self {
            endpoint: config.rest_endpoint(),
            transport,
            polling_interval: config.polling_interval,
            pipe_capacity: config.pipe_capacity,
            chunk_size: config.chunk_size,
        })
    }

    /// Build a client over a caller-supplied transport.
    pub fn with_transport(endpoint: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            transport,
            polling_interval: DEFAULT_POLLING_INTERVAL,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    /// Bound the number of body chunks buffered ahead of the transport.
    pub fn with_pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = capacity.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    // =========================================================================
    // Blocking recognition
    // =========================================================================

    /// Submit a job and poll until it reaches a terminal state.
    ///
    /// There is no attempt limit or deadline; cancel `cancel` (or drop the
    /// future) to bound the total wait.
    pub async fn recognize(
        &self,
        request: &RecognizeRequest,
        cancel: &CancellationToken,
    ) -> SpeechResult<RecognizeResponse> {
        let id = self.recognize_async(request, cancel).await?;
        self.receive_result_with_polling(&id, self.polling_interval, cancel)
            .await
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit a job and return its id without waiting for the transcript.
    pub async fn recognize_async(
        &self,
        request: &RecognizeRequest,
        cancel: &CancellationToken,
    ) -> SpeechResult<ResultId> {
        if cancel.is_cancelled() {
            return Err(SpeechError::Cancelled);
        }

        let audio = AudioPayload::from(request.audio_source.input()?);

        let (upload, writer) = prepare_upload(
            &request.config,
            audio.file_name(),
            self.pipe_capacity,
            self.chunk_size,
        )?;
        let http_request = TransportRequest::post(&self.endpoint)
            .with_header(CONTENT_TYPE, &upload.content_type)?
            .with_body(RequestBody::Stream(upload.stream));

        info!(
            "Submitting recognition job to {} ({})",
            self.endpoint,
            match &audio {
                AudioPayload::File(path) => format!("file {}", path.display()),
                AudioPayload::Buffer(bytes) => format!("{} byte buffer", bytes.len()),
            }
        );

        let producer = tokio::spawn(writer.write(audio));
        let abort_producer = producer.abort_handle();
        let exchange = self.transport.execute(http_request);

        let (produced, exchanged) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                abort_producer.abort();
                debug!("Submission cancelled before completion");
                return Err(SpeechError::Cancelled);
            }
            settled = async { tokio::join!(producer, exchange) } => settled,
        };

        let body_outcome = match produced {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!("Failed to stream request body: {}", e);
                return Err(e);
            }
            Err(join_error) => {
                error!("Audio writer task failed: {}", join_error);
                return Err(SpeechError::Io(io::Error::other(format!(
                    "audio writer task failed: {join_error}"
                ))));
            }
        };

        let response = exchanged?;
        if response.status == StatusCode::OK && body_outcome == BodyOutcome::Abandoned {
            // Accepted without reading the whole form: the audio was not delivered.
            warn!("Server answered before the request body was fully sent");
            return Err(SpeechError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "request body was not fully sent",
            )));
        }
        let submitted: SubmitResponse = decode_ok(&response)?;

        if submitted.id.as_str().is_empty() {
            return Err(SpeechError::Protocol {
                reason: "empty job id".to_string(),
                body: response.body_text(),
            });
        }

        info!("Recognition job submitted: {}", submitted.id);
        Ok(submitted.id)
    }

    // =========================================================================
    // Retrieval
    // =========================================================================

    /// Fetch the job's status once.
    ///
    /// Returns the response when completed, [`SpeechError::NotFinished`] while
    /// transcribing, [`SpeechError::Failed`] when the job failed, and
    /// [`SpeechError::Protocol`] for any other status.
    pub async fn receive_result(
        &self,
        id: &ResultId,
        cancel: &CancellationToken,
    ) -> SpeechResult<RecognizeResponse> {
        let url = format!("{}/{}", self.endpoint, id);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SpeechError::Cancelled),
            response = self.transport.execute(TransportRequest::get(url)) => response?,
        };

        let result: RecognizeResponse = decode_ok(&response)?;

        match &result.status {
            ResultStatus::Completed => {
                debug!(
                    "Job {} completed with {} utterances",
                    id,
                    result.utterances().len()
                );
                Ok(result)
            }
            ResultStatus::Transcribing => Err(SpeechError::NotFinished),
            ResultStatus::Failed => {
                warn!("Job {} reported failure", id);
                Err(SpeechError::Failed { id: id.to_string() })
            }
            ResultStatus::Unrecognized(status) => {
                let reason = if status.is_empty() {
                    "missing job status".to_string()
                } else {
                    format!("unknown job status '{status}'")
                };
                warn!("Job {}: {}", id, reason);
                Err(SpeechError::Protocol {
                    reason,
                    body: response.body_text(),
                })
            }
        }
    }

    /// Wait `interval`, fetch, and repeat while the job is transcribing.
    ///
    /// Any error other than [`SpeechError::NotFinished`] ends polling.
    pub async fn receive_result_with_polling(
        &self,
        id: &ResultId,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> SpeechResult<RecognizeResponse> {
        let mut attempt: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Polling for job {} cancelled after {} attempts", id, attempt);
                    return Err(SpeechError::Cancelled);
                }
                _ = tokio::time::sleep(interval) => {}
            }

            attempt += 1;
            match self.receive_result(id, cancel).await {
                Err(SpeechError::NotFinished) => {
                    debug!("Job {} still transcribing (attempt {})", id, attempt);
                }
                outcome => return outcome,
            }
        }
    }
}

/// Check for HTTP 200 and decode the JSON body.
fn decode_ok<T: serde::de::DeserializeOwned>(response: &TransportResponse) -> SpeechResult<T> {
    if response.status != StatusCode::OK {
        let body = response.body_text();
        match ErrorResponse::parse(&body) {
            Some(detail) => warn!(
                "Server returned {} [{}]: {}",
                response.status, detail.code, detail.msg
            ),
            None => warn!("Server returned {}: {}", response.status, body),
        }
        return Err(SpeechError::Server {
            status: response.status.as_u16(),
            body,
        });
    }

    serde_json::from_slice(&response.body).map_err(SpeechError::Decode)
}
