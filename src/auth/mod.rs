//! Authentication for the speech REST API.
//!
//! The service issues short-lived bearer tokens in exchange for a client id
//! and secret. [`TokenSource`] fetches and caches those tokens, and
//! [`AuthenticatedTransport`] attaches them to every request sent through an
//! inner [`HttpTransport`](crate::transport::HttpTransport).

mod token;

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::transport::{HttpTransport, TransportError, TransportRequest, TransportResponse};

pub use token::{AccessToken, TokenSource, TOKEN_REFRESH_MARGIN};

/// Errors raised while obtaining an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token endpoint could not be reached.
    #[error("Failed to request access token: {0}")]
    Request(String),

    /// The token endpoint rejected the credentials.
    #[error("Token request failed ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The token response was not the expected JSON.
    #[error("Failed to parse access token: {0}")]
    InvalidResponse(String),
}

/// Client credentials issued by the developer console.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Clear the secret from memory when the credentials are dropped.
impl Drop for Credentials {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.client_secret.zeroize();
    }
}

/// Transport decorator that adds `Authorization: Bearer <token>`.
pub struct AuthenticatedTransport<T> {
    inner: T,
    tokens: TokenSource,
}

impl<T: HttpTransport> AuthenticatedTransport<T> {
    pub fn new(inner: T, tokens: TokenSource) -> Self {
        Self { inner, tokens }
    }

    /// The token cache used by this transport.
    pub fn token_source(&self) -> &TokenSource {
        &self.tokens
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for AuthenticatedTransport<T> {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let token = self.tokens.access_token(&self.inner).await?;
        debug!("Attaching bearer token to {} {}", request.method, request.url);
        let request = request.with_header(AUTHORIZATION, &format!("Bearer {token}"))?;
        self.inner.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("my-id", "super-secret");
        let printed = format!("{creds:?}");
        assert!(printed.contains("my-id"));
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn test_auth_error_display() {
        let err = AuthError::Rejected {
            status: 401,
            body: "invalid client".to_string(),
        };
        assert_eq!(err.to_string(), "Token request failed (401): invalid client");
    }
}
