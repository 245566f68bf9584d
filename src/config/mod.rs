//! Client configuration
//!
//! Configuration comes from built-in defaults, environment variables (a `.env`
//! file is loaded into the environment by the application at startup), and an
//! optional YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use vito_speech::config::ClientConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ClientConfig::from_env()?;
//!
//! // Load from YAML file with environment variables as the base
//! let config = ClientConfig::from_file(&PathBuf::from("vito.yaml"))?;
//!
//! println!("Submitting to {}", config.rest_endpoint());
//! # Ok(())
//! # }
//! ```

use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod yaml;

pub use yaml::YamlConfig;

use crate::auth::Credentials;
use crate::transport::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};

// =============================================================================
// Constants
// =============================================================================

/// Default API host.
pub const DEFAULT_API_BASE: &str = "https://openapi.vito.ai";

/// Path of the batch transcription resource, relative to the API base.
pub const TRANSCRIBE_PATH: &str = "/v1/transcribe";

/// Interval between status fetches while waiting for a job to finish.
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 4000;

/// Audio chunks buffered between the writer task and the HTTP body.
pub const DEFAULT_PIPE_CAPACITY: usize = 8;

/// Size of each audio chunk read from disk.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

pub const ENV_API_BASE: &str = "VITO_API_BASE";
pub const ENV_REST_ENDPOINT: &str = "VITO_REST_ENDPOINT";
pub const ENV_CLIENT_ID: &str = "VITO_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "VITO_CLIENT_SECRET";
pub const ENV_POLLING_INTERVAL_MS: &str = "VITO_POLLING_INTERVAL_MS";

// =============================================================================
// Errors
// =============================================================================

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Settings for [`RestClient`](crate::RestClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API host, e.g. `https://openapi.vito.ai`. Also used for token requests.
    pub api_base: String,
    /// Overrides the transcription endpoint derived from `api_base`.
    pub rest_endpoint_override: Option<String>,
    /// Client credentials. When absent, requests are sent unauthenticated.
    pub credentials: Option<Credentials>,
    /// Delay before each status fetch in [`RestClient::recognize`](crate::RestClient::recognize).
    pub polling_interval: Duration,
    /// Deadline for status fetches and token requests. Audio uploads are
    /// bounded only by the caller's cancellation token.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Maximum number of audio chunks queued ahead of the HTTP body.
    pub pipe_capacity: usize,
    /// Read size for file-backed audio.
    pub chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            rest_endpoint_override: None,
            credentials: None,
            polling_interval: Duration::from_millis(DEFAULT_POLLING_INTERVAL_MS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables over built-in defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(base) = read_env(ENV_API_BASE) {
            config.api_base = base;
        }
        config.rest_endpoint_override = read_env(ENV_REST_ENDPOINT);

        config.credentials = match (read_env(ENV_CLIENT_ID), read_env(ENV_CLIENT_SECRET)) {
            (Some(id), Some(secret)) => Some(Credentials::new(id, secret)),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "{ENV_CLIENT_ID} and {ENV_CLIENT_SECRET} must be set together"
                )));
            }
        };

        if let Some(raw) = read_env(ENV_POLLING_INTERVAL_MS) {
            let ms = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: ENV_POLLING_INTERVAL_MS.to_string(),
                value: raw.clone(),
            })?;
            config.polling_interval = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, using environment variables as the base.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = YamlConfig::from_file(path)?;
        let mut config = Self::from_env()?;
        config.apply_yaml(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_yaml(&mut self, yaml: YamlConfig) -> Result<(), ConfigError> {
        if let Some(api) = yaml.api {
            if let Some(base) = api.base_url {
                self.api_base = base;
            }
            if let Some(endpoint) = api.rest_endpoint {
                self.rest_endpoint_override = Some(endpoint);
            }
        }

        if let Some(auth) = yaml.auth {
            match (auth.client_id, auth.client_secret) {
                (Some(id), Some(secret)) => self.credentials = Some(Credentials::new(id, secret)),
                (None, None) => {}
                _ => {
                    return Err(ConfigError::Invalid(
                        "auth.client_id and auth.client_secret must be set together".to_string(),
                    ));
                }
            }
        }

        if let Some(ms) = yaml.polling.and_then(|p| p.interval_ms) {
            self.polling_interval = Duration::from_millis(ms);
        }

        if let Some(http) = yaml.http {
            if let Some(secs) = http.timeout_seconds {
                self.request_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = http.connect_timeout_seconds {
                self.connect_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(upload) = yaml.upload {
            if let Some(capacity) = upload.pipe_capacity {
                self.pipe_capacity = capacity;
            }
            if let Some(size) = upload.chunk_size {
                self.chunk_size = size;
            }
        }

        Ok(())
    }

    /// Endpoint jobs are submitted to; results live at `<endpoint>/<id>`.
    pub fn rest_endpoint(&self) -> String {
        match &self.rest_endpoint_override {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("{}{}", self.api_base.trim_end_matches('/'), TRANSCRIBE_PATH),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    pub fn with_rest_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.rest_endpoint_override = Some(endpoint.into());
        self
    }

    /// Check the configuration for values the client cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base.trim().is_empty() {
            return Err(ConfigError::Invalid("API base URL is required".to_string()));
        }

        let endpoint = self.rest_endpoint();
        url::Url::parse(&endpoint).map_err(|e| ConfigError::InvalidValue {
            name: "rest_endpoint".to_string(),
            value: format!("{endpoint} ({e})"),
        })?;

        if self.polling_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "Polling interval must be greater than zero".to_string(),
            ));
        }

        if self.pipe_capacity == 0 {
            return Err(ConfigError::Invalid(
                "Pipe capacity must be at least 1".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "Chunk size must be greater than zero".to_string(),
            ));
        }

        if let Some(creds) = &self.credentials
            && (creds.client_id.is_empty() || creds.client_secret.is_empty())
        {
            return Err(ConfigError::Invalid(
                "Client id and client secret must both be non-empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn read_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
