//! Request types for batch recognition.
//!
//! - [`AudioSource`]: where the audio comes from (a file or a buffer)
//! - [`RecognitionConfig`]: recognition options, sent verbatim as JSON
//! - [`RecognizeRequest`]: both of the above

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::SpeechError;

/// Part file name used for in-memory audio.
pub const DEFAULT_AUDIO_FILE_NAME: &str = "vito-default-audiofile";

// =============================================================================
// Audio Source
// =============================================================================

/// Audio payload for a recognition job.
///
/// Exactly one of `file_path` and `content` must be set. An empty path counts
/// as unset; an empty buffer is a valid (if degenerate) payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioSource {
    /// Local file, streamed chunk by chunk during upload.
    pub file_path: Option<PathBuf>,
    /// In-memory audio.
    pub content: Option<Bytes>,
}

/// Validated view of an [`AudioSource`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum AudioInput<'a> {
    File(&'a Path),
    Buffer(&'a Bytes),
}

impl AudioSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(path.into()),
            content: None,
        }
    }

    pub fn from_bytes(content: impl Into<Bytes>) -> Self {
        Self {
            file_path: None,
            content: Some(content.into()),
        }
    }

    fn path(&self) -> Option<&Path> {
        self.file_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Check that exactly one source is set.
    pub fn validate(&self) -> Result<(), SpeechError> {
        self.input().map(|_| ())
    }

    pub(crate) fn input(&self) -> Result<AudioInput<'_>, SpeechError> {
        match (self.path(), self.content.as_ref()) {
            (Some(path), None) => Ok(AudioInput::File(path)),
            (None, Some(content)) => Ok(AudioInput::Buffer(content)),
            (Some(_), Some(_)) => Err(SpeechError::Validation(
                "audio source must set either a file path or content, not both".to_string(),
            )),
            (None, None) => Err(SpeechError::Validation(
                "audio source requires a file path or content".to_string(),
            )),
        }
    }
}

impl From<PathBuf> for AudioSource {
    fn from(path: PathBuf) -> Self {
        Self::from_path(path)
    }
}

impl From<Vec<u8>> for AudioSource {
    fn from(content: Vec<u8>) -> Self {
        Self::from_bytes(content)
    }
}

impl From<Bytes> for AudioSource {
    fn from(content: Bytes) -> Self {
        Self::from_bytes(content)
    }
}

// =============================================================================
// Recognition Config
// =============================================================================

/// Speaker diarization options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiarizationConfig {
    /// Expected number of speakers; 0 lets the server decide.
    #[serde(default)]
    pub spk_count: u32,
}

/// Paragraph splitting options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphSplitterConfig {
    /// Maximum characters per paragraph.
    #[serde(default)]
    pub max: u32,
}

/// Recognition options, serialized as the `config` form field.
///
/// The client does not interpret these; unset fields are omitted so the
/// server applies its own defaults.
///
/// # Example
///
/// ```rust
/// use vito_speech::RecognitionConfig;
///
/// let config = RecognitionConfig::default()
///     .with_model("sommers")
///     .with_diarization(2)
///     .with_keywords(["VITO", "RTZR"]);
/// assert_eq!(config.diarization.unwrap().spk_count, 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    /// Language code, e.g. `ko`, `ja`, or `detect`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_diarization: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diarization: Option<DiarizationConfig>,

    /// Inverse text normalization (numbers, units).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_itn: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_disfluency_filter: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_profanity_filter: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_paragraph_splitter: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_splitter: Option<ParagraphSplitterConfig>,

    /// Recognition domain, e.g. `GENERAL` or `CALL`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_word_timestamp: Option<bool>,

    /// Boosted keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl RecognitionConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Enable diarization with the expected speaker count.
    pub fn with_diarization(mut self, spk_count: u32) -> Self {
        self.use_diarization = Some(true);
        self.diarization = Some(DiarizationConfig { spk_count });
        self
    }

    /// Enable paragraph splitting with a maximum paragraph length.
    pub fn with_paragraph_splitter(mut self, max: u32) -> Self {
        self.use_paragraph_splitter = Some(true);
        self.paragraph_splitter = Some(ParagraphSplitterConfig { max });
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

// =============================================================================
// Recognize Request
// =============================================================================

/// Everything needed to submit one recognition job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognizeRequest {
    pub config: RecognitionConfig,
    pub audio_source: AudioSource,
}

impl RecognizeRequest {
    pub fn new(config: RecognitionConfig, audio_source: impl Into<AudioSource>) -> Self {
        Self {
            config,
            audio_source: audio_source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_source_is_valid() {
        assert!(AudioSource::from_path("/tmp/audio.wav").validate().is_ok());
    }

    #[test]
    fn test_buffer_source_is_valid() {
        assert!(AudioSource::from_bytes(vec![1u8, 2, 3]).validate().is_ok());
    }

    #[test]
    fn test_empty_buffer_is_valid() {
        assert!(AudioSource::from_bytes(Vec::new()).validate().is_ok());
    }

    #[test]
    fn test_neither_set_fails() {
        let err = AudioSource::default().validate().unwrap_err();
        assert!(matches!(err, SpeechError::Validation(_)));
    }

    #[test]
    fn test_both_set_fails() {
        let source = AudioSource {
            file_path: Some(PathBuf::from("/tmp/audio.wav")),
            content: Some(Bytes::from_static(b"abc")),
        };
        assert!(matches!(
            source.validate(),
            Err(SpeechError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_path_counts_as_unset() {
        let source = AudioSource {
            file_path: Some(PathBuf::new()),
            content: None,
        };
        assert!(source.validate().is_err());

        let source = AudioSource {
            file_path: Some(PathBuf::new()),
            content: Some(Bytes::from_static(b"abc")),
        };
        assert!(matches!(source.input(), Ok(AudioInput::Buffer(_))));
    }

    #[test]
    fn test_config_omits_unset_fields() {
        let json = serde_json::to_string(&RecognitionConfig::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_config_serialization() {
        let config = RecognitionConfig::default()
            .with_model("sommers")
            .with_diarization(2)
            .with_keywords(["alpha", "beta"]);
        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(value["model_name"], "sommers");
        assert_eq!(value["use_diarization"], true);
        assert_eq!(value["diarization"]["spk_count"], 2);
        assert_eq!(value["keywords"][1], "beta");
        assert!(value.get("use_itn").is_none());
    }
}
