//! Access token acquisition and caching.

use http::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::form_urlencoded;

use super::{AuthError, Credentials};
use crate::transport::{HttpTransport, RequestBody, TransportError, TransportRequest};

/// Tokens are refreshed this long before their reported expiry.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Path of the token endpoint, relative to the API base.
const AUTHENTICATE_PATH: &str = "/v1/authenticate";

/// Bearer token with its expiry (Unix seconds).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expire_at: u64,
}

impl AccessToken {
    /// Expired, or expiring within [`TOKEN_REFRESH_MARGIN`].
    pub fn is_expired(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.expire_at <= now + TOKEN_REFRESH_MARGIN.as_secs()
    }
}

/// Fetches access tokens and caches the current one.
#[derive(Debug)]
pub struct TokenSource {
    auth_url: String,
    credentials: Credentials,
    cached: RwLock<Option<AccessToken>>,
}

impl TokenSource {
    /// Create a token source for the given API base (e.g. `https://openapi.vito.ai`).
    pub fn new(api_base: &str, credentials: Credentials) -> Self {
        Self {
            auth_url: format!("{}{}", api_base.trim_end_matches('/'), AUTHENTICATE_PATH),
            credentials,
            cached: RwLock::new(None),
        }
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// Return the cached token, fetching a new one through `transport` if
    /// none is cached or it is about to expire.
    pub async fn access_token<T: HttpTransport + ?Sized>(
        &self,
        transport: &T,
    ) -> Result<String, AuthError> {
        {
            let guard = self.cached.read().await;
            if let Some(token) = guard.as_ref()
                && !token.is_expired()
            {
                return Ok(token.access_token.clone());
            }
        }

        let mut guard = self.cached.write().await;
        // Another caller may have refreshed while we waited for the write lock.
        if let Some(token) = guard.as_ref()
            && !token.is_expired()
        {
            return Ok(token.access_token.clone());
        }

        debug!("Requesting new access token from {}", self.auth_url);
        let token = self.fetch(transport).await?;
        info!("Obtained access token (expires at {})", token.expire_at);
        let access_token = token.access_token.clone();
        *guard = Some(token);

        Ok(access_token)
    }

    /// Drop the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn fetch<T: HttpTransport + ?Sized>(
        &self,
        transport: &T,
    ) -> Result<AccessToken, AuthError> {
        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("client_secret", &self.credentials.client_secret)
            .finish();

        let request = TransportRequest::post(&self.auth_url)
            .with_header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .map_err(|e| AuthError::Request(e.to_string()))?
            .with_body(RequestBody::Bytes(form.into()));

        let response = transport
            .execute(request)
            .await
            .map_err(|e: TransportError| AuthError::Request(e.to_string()))?;

        if !response.status.is_success() {
            return Err(AuthError::Rejected {
                status: response.status.as_u16(),
                body: response.body_text(),
            });
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }
}
