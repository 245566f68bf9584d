//! `reqwest`-backed transport.

use async_trait::async_trait;
use reqwest::{Body, Client};
use std::time::Duration;
use tracing::debug;

use super::{HttpTransport, RequestBody, TransportError, TransportRequest, TransportResponse};

// =============================================================================
// Constants
// =============================================================================

/// Default timeout in seconds for requests with a buffered body.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// User-Agent header value for API requests.
const USER_AGENT: &str = concat!("vito-speech-rust/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// ReqwestTransport
// =============================================================================

/// HTTP transport over a pooled `reqwest::Client`.
///
/// The request timeout covers the whole exchange for empty and buffered
/// bodies (status fetches, token requests). Streaming uploads get no overall
/// deadline: reqwest's timer includes the time spent sending the body, and
/// an audio file may legitimately take longer than any fixed limit. Bound
/// those with the caller's cancellation token instead.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    request_timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Build a transport with the given timeouts.
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                TransportError::InvalidRequest(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            request_timeout: Some(timeout),
        })
    }

    /// Wrap an existing client (for callers that configure TLS or proxies themselves).
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            request_timeout: None,
        }
    }

    fn classify(e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self {
            client: Client::new(),
            request_timeout: None,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
        } = request;

        debug!("{} {}", method, url);

        let mut builder = self.client.request(method, &url).headers(headers);
        let streaming = matches!(body, RequestBody::Stream(_));
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Bytes(bytes) => builder.body(bytes),
            RequestBody::Stream(stream) => builder.body(Body::wrap_stream(stream)),
        };
        if let (Some(timeout), false) = (self.request_timeout, streaming) {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(Self::classify)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        debug!("{} -> {} ({} bytes)", url, status, body.len());

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_transport_builds_with_timeouts() {
        let transport = ReqwestTransport::new(
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        );
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_is_classified() {
        let transport = ReqwestTransport::default();
        let result = transport
            .execute(TransportRequest::get("not a url"))
            .await;

        match result {
            Err(TransportError::InvalidRequest(_)) | Err(TransportError::Request(_)) => {}
            other => panic!("Expected request error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_streaming_upload_outlives_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let transport =
            ReqwestTransport::new(Duration::from_millis(200), Duration::from_secs(5)).unwrap();

        // Eight slow chunks take well past the 200 ms request timeout to send.
        let slow_body = futures::stream::iter(0..8u8)
            .then(|i| async move {
                tokio::time::sleep(Duration::from_millis(75)).await;
                Ok::<_, std::io::Error>(Bytes::from(vec![i; 1024]))
            })
            .boxed();

        let response = transport
            .execute(
                TransportRequest::post(format!("{}/upload", server.uri()))
                    .with_body(RequestBody::Stream(slow_body)),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        let received = server.received_requests().await.unwrap();
        assert_eq!(received[0].body.len(), 8 * 1024);
    }

    #[tokio::test]
    async fn test_buffered_request_honours_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let transport =
            ReqwestTransport::new(Duration::from_millis(200), Duration::from_secs(5)).unwrap();
        let result = transport
            .execute(TransportRequest::get(format!("{}/slow", server.uri())))
            .await;

        match result {
            Err(TransportError::Timeout(_)) => {}
            other => panic!("Expected timeout, got {other:?}"),
        }
    }
}
