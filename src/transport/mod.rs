//! HTTP transport seam.
//!
//! The speech client never talks to `reqwest` directly. Every exchange goes
//! through an [`HttpTransport`], which takes a method, URL, headers and a
//! (possibly streaming) body and returns the status code plus the fully read
//! response body. Authentication lives in a decorator around this trait
//! (see [`crate::auth::AuthenticatedTransport`]), and tests substitute an
//! in-process stub.

mod http_client;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use http::{HeaderMap, Method, StatusCode};
use std::fmt;
use std::io;
use thiserror::Error;

pub use http_client::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, ReqwestTransport};

/// Streaming request body chunk.
pub type BodyChunk = Result<Bytes, io::Error>;

// =============================================================================
// Error Types
// =============================================================================

/// Network-level failure while performing an HTTP exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be built (bad URL, invalid header).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Connecting, sending or receiving failed.
    #[error("Request failed: {0}")]
    Request(String),

    /// The request did not finish within the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// Credentials could not be attached to the request.
    #[error("Authentication failed: {0}")]
    Auth(#[from] crate::auth::AuthError),
}

// =============================================================================
// Request / Response
// =============================================================================

/// Body of an outgoing request.
#[derive(Default)]
pub enum RequestBody {
    /// No body (GET requests).
    #[default]
    Empty,
    /// In-memory body, sent as-is.
    Bytes(Bytes),
    /// Body produced incrementally by another task. The transport pulls
    /// chunks as it writes them to the socket, so the producer is
    /// back-pressured by the network.
    Stream(BoxStream<'static, BodyChunk>),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "Empty"),
            RequestBody::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            RequestBody::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// An outgoing HTTP request.
#[derive(Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl TransportRequest {
    /// Create a request with no headers and an empty body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set the request body.
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Add a header, rejecting values that are not valid header text.
    pub fn with_header(
        mut self,
        name: http::header::HeaderName,
        value: &str,
    ) -> Result<Self, TransportError> {
        let value = http::HeaderValue::from_str(value).map_err(|e| {
            TransportError::InvalidRequest(format!("Invalid {name} header value: {e}"))
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    /// Response body as lossy UTF-8, for diagnostics.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// =============================================================================
// Transport Trait
// =============================================================================

/// Anything that can perform an HTTP exchange.
///
/// Implementations must be safe to share between concurrent calls; the
/// client keeps one instance behind an `Arc` for its whole lifetime.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one request and read the whole response body.
    async fn execute(&self, request: TransportRequest)
    -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        (**self).execute(request).await
    }
}
