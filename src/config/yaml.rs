use serde::Deserialize;
use std::path::Path;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration; anything left out
/// falls back to environment variables and then to built-in defaults.
///
/// # Example YAML structure
/// ```yaml
/// api:
///   base_url: "https://openapi.vito.ai"
///   rest_endpoint: "https://openapi.vito.ai/v1/transcribe"
///
/// auth:
///   client_id: "your-client-id"
///   client_secret: "your-client-secret"
///
/// polling:
///   interval_ms: 4000
///
/// http:
///   timeout_seconds: 120
///   connect_timeout_seconds: 30
///
/// upload:
///   pipe_capacity: 8
///   chunk_size: 32768
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub api: Option<ApiYaml>,
    pub auth: Option<AuthYaml>,
    pub polling: Option<PollingYaml>,
    pub http: Option<HttpYaml>,
    pub upload: Option<UploadYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ApiYaml {
    pub base_url: Option<String>,
    pub rest_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthYaml {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PollingYaml {
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HttpYaml {
    pub timeout_seconds: Option<u64>,
    pub connect_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct UploadYaml {
    pub pipe_capacity: Option<usize>,
    pub chunk_size: Option<usize>,
}

impl YamlConfig {
    /// Load YAML configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&contents)
    }

    /// Parse YAML configuration from a string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
polling:
  interval_ms: 1500
"#;
        let config = YamlConfig::parse(yaml).unwrap();
        assert_eq!(config.polling.unwrap().interval_ms, Some(1500));
        assert!(config.api.is_none());
        assert!(config.auth.is_none());
    }

    #[test]
    fn test_parse_empty_yaml() {
        let config = YamlConfig::parse("{}").unwrap();
        assert!(config.upload.is_none());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = YamlConfig::parse("polling: [unterminated");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
