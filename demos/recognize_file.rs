//! Transcribe a local audio file.
//!
//! ```text
//! VITO_CLIENT_ID=... VITO_CLIENT_SECRET=... \
//!     cargo run --example recognize_file -- meeting.wav --speakers 2
//! ```
//!
//! Ctrl-C cancels the upload or the polling wait.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vito_speech::{
    AudioSource, ClientConfig, RecognitionConfig, RecognizeRequest, RestClient, SpeechError,
};

/// Batch-transcribe an audio file with the VITO API
#[derive(Parser, Debug)]
#[command(name = "recognize_file")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Audio file to transcribe
    audio: PathBuf,

    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Recognition model
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Enable diarization with this many expected speakers (0 = auto)
    #[arg(short = 's', long = "speakers")]
    speakers: Option<u32>,

    /// Polling interval in milliseconds
    #[arg(long = "poll-ms")]
    poll_ms: Option<u64>,

    /// Submit only and print the job id
    #[arg(long = "no-wait")]
    no_wait: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClientConfig::from_env()?,
    };
    if let Some(ms) = cli.poll_ms {
        config = config.with_polling_interval(Duration::from_millis(ms));
    }

    let client = RestClient::new(config)?;

    let mut recognition = RecognitionConfig::default();
    if let Some(model) = cli.model {
        recognition = recognition.with_model(model);
    }
    if let Some(speakers) = cli.speakers {
        recognition = recognition.with_diarization(speakers);
    }
    let request = RecognizeRequest::new(recognition, AudioSource::from_path(cli.audio));

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            on_ctrl_c.cancel();
        }
    });

    if cli.no_wait {
        let id = client.recognize_async(&request, &cancel).await?;
        println!("{id}");
        return Ok(());
    }

    match client.recognize(&request, &cancel).await {
        Ok(response) => {
            for utterance in response.utterances() {
                println!(
                    "[{:>7.2}s] spk{}: {}",
                    utterance.start_at as f64 / 1000.0,
                    utterance.spk,
                    utterance.msg
                );
            }
            Ok(())
        }
        Err(SpeechError::Cancelled) => {
            eprintln!("cancelled");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
