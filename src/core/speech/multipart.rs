//! Streaming `multipart/form-data` request body.
//!
//! The form is a `reqwest::multipart::Form` with a `config` text part followed
//! by a `file` part. The file part's body is the receiving half of a bounded
//! channel fed by an [`AudioWriter`] running on its own task. When the channel
//! is full the writer waits, so at most `capacity` chunks of audio are held in
//! memory no matter how large the file is.

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Body;
use reqwest::multipart::{Form, Part};
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::config::{AudioInput, DEFAULT_AUDIO_FILE_NAME, RecognitionConfig};
use super::error::SpeechError;
use crate::transport::BodyChunk;

/// Form field carrying the recognition config.
pub const CONFIG_FIELD: &str = "config";

/// Form field carrying the audio.
pub const FILE_FIELD: &str = "file";

const AUDIO_CONTENT_TYPE: &str = "application/octet-stream";

/// Owned audio payload handed to the writer task.
#[derive(Debug, Clone)]
pub(crate) enum AudioPayload {
    File(PathBuf),
    Buffer(Bytes),
}

impl AudioPayload {
    /// Part file name: the base name for files, a fixed name for buffers.
    pub(crate) fn file_name(&self) -> String {
        match self {
            AudioPayload::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_AUDIO_FILE_NAME.to_string()),
            AudioPayload::Buffer(_) => DEFAULT_AUDIO_FILE_NAME.to_string(),
        }
    }
}

impl From<AudioInput<'_>> for AudioPayload {
    fn from(input: AudioInput<'_>) -> Self {
        match input {
            AudioInput::File(path) => AudioPayload::File(path.to_path_buf()),
            AudioInput::Buffer(bytes) => AudioPayload::Buffer(bytes.clone()),
        }
    }
}

/// Encoded form, ready to hand to the transport.
pub(crate) struct UploadBody {
    /// `multipart/form-data; boundary=...`
    pub content_type: String,
    pub stream: BoxStream<'static, BodyChunk>,
}

/// How far the writer got before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyOutcome {
    /// Every audio chunk was handed to the transport.
    Complete,
    /// The transport dropped the body before the audio was finished.
    Abandoned,
}

/// Build the form for one submission.
///
/// Returns the body to send and the writer that must run concurrently to
/// feed the `file` part.
pub(crate) fn prepare_upload(
    config: &RecognitionConfig,
    file_name: String,
    capacity: usize,
    chunk_size: usize,
) -> Result<(UploadBody, AudioWriter), SpeechError> {
    let config_json = serde_json::to_string(config).map_err(SpeechError::Encode)?;

    let (tx, mut rx) = mpsc::channel::<BodyChunk>(capacity.max(1));
    let audio = futures::stream::poll_fn(move |cx| rx.poll_recv(cx));

    let file_part = Part::stream(Body::wrap_stream(audio))
        .file_name(file_name)
        .mime_str(AUDIO_CONTENT_TYPE)
        .map_err(|e| SpeechError::Io(io::Error::other(e)))?;

    let form = Form::new()
        .text(CONFIG_FIELD, config_json)
        .part(FILE_FIELD, file_part);

    let content_type = format!("multipart/form-data; boundary={}", form.boundary());
    let stream = form
        .into_stream()
        .map(|chunk| chunk.map_err(io::Error::other))
        .boxed();

    Ok((
        UploadBody {
            content_type,
            stream,
        },
        AudioWriter {
            tx,
            chunk_size: chunk_size.max(1),
            bytes_written: 0,
        },
    ))
}

/// Outcome of a send into the audio channel.
enum Sent {
    Ok,
    /// The body was dropped (the HTTP exchange ended or was cancelled).
    ReceiverGone,
}

/// Feeds audio chunks into the `file` part of the form.
pub(crate) struct AudioWriter {
    tx: mpsc::Sender<BodyChunk>,
    chunk_size: usize,
    bytes_written: u64,
}

impl AudioWriter {
    /// Stream the whole payload, then close the part.
    ///
    /// On failure the error is also pushed into the body so the HTTP client
    /// aborts the upload instead of sending a truncated form. A body dropped
    /// by the transport is not an error here; the caller decides based on the
    /// HTTP outcome.
    pub(crate) async fn write(mut self, audio: AudioPayload) -> Result<BodyOutcome, SpeechError> {
        let result = match audio {
            AudioPayload::File(path) => self.write_file(&path).await,
            AudioPayload::Buffer(content) => Ok(self.write_buffer(content).await),
        };

        match result {
            Ok(Sent::Ok) => {
                debug!("Audio part complete: {} bytes", self.bytes_written);
                Ok(BodyOutcome::Complete)
            }
            Ok(Sent::ReceiverGone) => Ok(BodyOutcome::Abandoned),
            Err(e) => {
                let _ = self.tx.send(Err(io::Error::other(e.to_string()))).await;
                Err(e)
            }
        }
    }

    async fn write_buffer(&mut self, content: Bytes) -> Sent {
        for offset in (0..content.len()).step_by(self.chunk_size) {
            let end = (offset + self.chunk_size).min(content.len());
            if let Sent::ReceiverGone = self.send(content.slice(offset..end)).await {
                return Sent::ReceiverGone;
            }
        }
        Sent::Ok
    }

    async fn write_file(&mut self, path: &Path) -> Result<Sent, SpeechError> {
        let file = tokio::fs::File::open(path).await?;
        debug!("Streaming audio file {}", path.display());

        let mut chunks = ReaderStream::with_capacity(file, self.chunk_size);
        while let Some(chunk) = chunks.next().await {
            if let Sent::ReceiverGone = self.send(chunk?).await {
                return Ok(Sent::ReceiverGone);
            }
        }
        Ok(Sent::Ok)
    }

    async fn send(&mut self, chunk: Bytes) -> Sent {
        let len = chunk.len() as u64;
        if self.tx.send(Ok(chunk)).await.is_err() {
            debug!(
                "Request body dropped after {} audio bytes; stopping writer",
                self.bytes_written
            );
            return Sent::ReceiverGone;
        }
        self.bytes_written += len;
        Sent::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn collect(mut stream: BoxStream<'static, BodyChunk>) -> Result<Vec<u8>, io::Error> {
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(body)
    }

    async fn encode(
        config: RecognitionConfig,
        audio: AudioPayload,
        capacity: usize,
        chunk_size: usize,
    ) -> (String, Result<BodyOutcome, SpeechError>, Result<Vec<u8>, io::Error>) {
        let (upload, writer) =
            prepare_upload(&config, audio.file_name(), capacity, chunk_size).unwrap();
        let producer = tokio::spawn(writer.write(audio));
        let body = collect(upload.stream).await;
        (upload.content_type, producer.await.unwrap(), body)
    }

    fn boundary_of(content_type: &str) -> &str {
        content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap()
    }

    #[tokio::test]
    async fn test_buffer_body_layout() {
        let config = RecognitionConfig::default().with_model("sommers");
        let (content_type, result, body) = encode(
            config,
            AudioPayload::Buffer(Bytes::from_static(b"RIFFdata")),
            2,
            3,
        )
        .await;

        assert_eq!(result.unwrap(), BodyOutcome::Complete);
        let boundary = boundary_of(&content_type);
        let body = String::from_utf8(body.unwrap()).unwrap();
        let expected = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"config\"\r\n\r\n\
             {{\"model_name\":\"sommers\"}}\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; \
             filename=\"vito-default-audiofile\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             RIFFdata\r\n\
             --{boundary}--\r\n"
        );
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn test_empty_buffer_produces_well_formed_body() {
        let (content_type, result, body) = encode(
            RecognitionConfig::default(),
            AudioPayload::Buffer(Bytes::new()),
            1,
            16,
        )
        .await;

        assert_eq!(result.unwrap(), BodyOutcome::Complete);
        let boundary = boundary_of(&content_type);
        let body = String::from_utf8(body.unwrap()).unwrap();
        assert!(body.starts_with(&format!("--{boundary}\r\n")));
        assert!(body.contains("filename=\"vito-default-audiofile\""));
        assert!(body.ends_with(&format!(
            "application/octet-stream\r\n\r\n\r\n--{boundary}--\r\n"
        )));
    }

    #[tokio::test]
    async fn test_file_body_streams_contents_and_uses_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meeting.wav");
        let audio: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&audio)
            .unwrap();

        let (_, result, body) = encode(
            RecognitionConfig::default(),
            AudioPayload::File(path),
            2,
            1024,
        )
        .await;

        assert_eq!(result.unwrap(), BodyOutcome::Complete);
        let body = body.unwrap();
        let text = String::from_utf8_lossy(&body);
        let config_at = text.find("name=\"config\"").unwrap();
        let file_at = text.find("filename=\"meeting.wav\"").unwrap();
        assert!(config_at < file_at);

        let header_end = body[file_at..]
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .unwrap()
            + file_at
            + 4;
        assert_eq!(&body[header_end..header_end + audio.len()], audio.as_slice());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error_and_aborts_body() {
        let (_, result, body) = encode(
            RecognitionConfig::default(),
            AudioPayload::File(PathBuf::from("/definitely/not/here.wav")),
            4,
            16,
        )
        .await;

        match result {
            Err(SpeechError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("Expected Io error, got {other:?}"),
        }
        assert!(body.is_err());
    }

    #[tokio::test]
    async fn test_dropped_body_stops_writer_quietly() {
        let (upload, writer) =
            prepare_upload(&RecognitionConfig::default(), "a.wav".to_string(), 1, 4).unwrap();
        drop(upload);

        let result = writer
            .write(AudioPayload::Buffer(Bytes::from(vec![0u8; 64])))
            .await;
        assert_eq!(result.unwrap(), BodyOutcome::Abandoned);
    }

    #[test]
    fn test_file_name_for_payloads() {
        assert_eq!(
            AudioPayload::File(PathBuf::from("/audio/call-01.m4a")).file_name(),
            "call-01.m4a"
        );
        assert_eq!(
            AudioPayload::Buffer(Bytes::new()).file_name(),
            DEFAULT_AUDIO_FILE_NAME
        );
        assert_eq!(
            AudioPayload::File(PathBuf::from("/")).file_name(),
            DEFAULT_AUDIO_FILE_NAME
        );
    }
}
