//! doc-audiobook - Convert DOCX and PDF documents to audiobooks using a remote TTS queue

mod audio;
mod config;
mod document;
mod fetch;
mod session;
mod text;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::AudiobookConfig;
use fetch::{Fetcher, format_bytes};
use indicatif::{ProgressBar, ProgressStyle};
use session::{
    Deliverable, Session, SessionEvent, SessionOptions, SessionOutcome, SessionReport, Stage,
};
use speech_client::{Voice, VoiceCategory};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "doc-audiobook")]
#[command(about = "Convert DOCX and PDF documents to audiobooks using a remote TTS queue", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the DOCX or PDF file
    document: Option<PathBuf>,

    /// Voice to use (see `doc-audiobook voices`)
    #[arg(long)]
    voice: Option<String>,

    /// Maximum chunk size in characters (500-2000)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Output format: mp3 or wav
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Title used for output file names (default: document file name)
    #[arg(long)]
    title: Option<String>,

    /// Directory to write the audiobook to (default: next to the document)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available voices
    Voices,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default voice
    SetVoice {
        /// Voice id, e.g. af_heart
        voice: String,
    },
    /// Set default chunk size
    SetChunkSize {
        /// Characters per chunk (500-2000)
        value: usize,
    },
    /// Set default output format
    SetFormat {
        /// mp3 or wav
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // A missing .env file is fine; load it first so RUST_LOG can come from it
    let _ = dotenvy::dotenv();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    // Handle subcommands
    match &args.command {
        Some(Commands::Voices) => {
            print_voices();
            return Ok(());
        }
        Some(Commands::Config { action }) => {
            return handle_config_command(action);
        }
        None => {}
    }

    let document_path = args.document.clone().ok_or_else(|| {
        anyhow::anyhow!("Document path is required. Run 'doc-audiobook --help' for usage.")
    })?;

    if !document_path.exists() {
        anyhow::bail!("Document not found: {}", document_path.display());
    }

    // Reject unsupported formats before touching the network
    document::DocumentKind::from_path(&document_path)?;

    let config = AudiobookConfig::load().context("Failed to load configuration")?;

    let voice = match &args.voice {
        Some(v) => Voice::parse(v)?,
        None => config.voice().context("Invalid voice in configuration")?,
    };
    let chunk_size = config::clamp_chunk_size(args.chunk_size.unwrap_or(config.chunk_size));
    let output_format = args.format.unwrap_or(config.output_format);
    let title = args.title.clone().unwrap_or_else(|| {
        document_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audiobook".to_string())
    });
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .or_else(|| document_path.parent().map(Path::to_path_buf))
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."));

    let provider = speech_client::get_provider(&config.synthesis)
        .context("Failed to initialize speech provider")?;
    provider
        .is_available()
        .context("Speech provider is not usable")?;

    let transcoder = audio::detect_transcoder(config.ffmpeg_path.as_deref());
    let fetcher = Fetcher::new(Duration::from_secs(config.download_timeout_secs))
        .context("Failed to create download client")?;

    if args.debug {
        eprintln!("Document: {}", document_path.display());
        eprintln!("Output dir: {}", output_dir.display());
        eprintln!("Voice: {}", voice);
        eprintln!("Chunk size: {}", chunk_size);
        eprintln!("Format: {}", output_format);
        eprintln!("Provider: {}", provider.name());
        eprintln!("Transcoder: {}", transcoder.describe());
    }

    if output_format == OutputFormat::Mp3 && !transcoder.is_available() {
        eprintln!(
            "Warning: ffmpeg not available ({}); output will be WAV",
            transcoder.describe()
        );
    }

    // Extract text
    eprintln!("Reading document: {}", document_path.display());
    let doc = document::extract_document(&document_path).context("Failed to read document")?;

    let options = SessionOptions {
        voice,
        chunk_size,
        output_format,
        title,
        work_root: None,
    };
    let session = Session::new(provider.as_ref(), &fetcher, transcoder.as_ref(), options);

    let planned = session.plan(&doc.text).len();
    eprintln!(
        "Document length: {} characters, ~{} words",
        doc.char_len(),
        doc.total_words()
    );
    eprintln!("Chunks: {} (max {} characters each)", planned, chunk_size);

    let outcome = run_with_progress(&session, &doc.text, planned).await?;

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    write_outputs(&outcome, &output_dir)?;

    Ok(())
}

/// Run the session with a progress bar driven by session events.
async fn run_with_progress(
    session: &Session<'_>,
    text: &str,
    total: usize,
) -> Result<SessionOutcome> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = session
        .run(text, |event| match event {
            SessionEvent::StageEntered(Stage::Combining) => {
                pb.set_message("Combining audio...");
            }
            SessionEvent::StageEntered(Stage::Transcoding) => {
                pb.set_message("Converting to MP3...");
            }
            SessionEvent::StageEntered(_) => {}
            SessionEvent::ChunkStarted { number, total } => {
                pb.set_message(format!("Chunk {}/{}: synthesizing", number, total));
            }
            SessionEvent::Queued { number, position } => match position {
                Some(p) => pb.set_message(format!("Chunk {}: queued at position {}", number, p)),
                None => pb.set_message(format!("Chunk {}: queued", number)),
            },
            SessionEvent::SynthesisLog { number, message } => {
                pb.set_message(format!("Chunk {}: {}", number, message));
            }
            SessionEvent::Downloading { number } => {
                pb.set_message(format!("Chunk {}: downloading", number));
            }
            SessionEvent::ChunkSucceeded { .. } => pb.inc(1),
            SessionEvent::ChunkFailed(failure) => {
                pb.println(format!(
                    "  Chunk {} failed during {}: {}",
                    failure.chunk_number, failure.stage, failure.message
                ));
                pb.inc(1);
            }
            SessionEvent::TranscodeFallback { reason } => {
                pb.println(format!("  MP3 conversion failed, providing WAV: {}", reason));
            }
            SessionEvent::CombineFailed { reason } => {
                pb.println(format!(
                    "  Combining failed, packaging chunks as ZIP: {}",
                    reason
                ));
            }
        })
        .await;

    match result {
        Ok(outcome) => {
            pb.finish_with_message("Audio generation complete!");
            Ok(outcome)
        }
        Err(e) => {
            pb.abandon_with_message("Audio generation failed");
            Err(e.into())
        }
    }
}

/// Write the deliverable and URL list, then print a summary.
fn write_outputs(outcome: &SessionOutcome, output_dir: &Path) -> Result<()> {
    let deliverable = &outcome.deliverable;
    let output_path = output_dir.join(deliverable.filename());
    std::fs::write(&output_path, deliverable.bytes())
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    let report = &outcome.report;
    eprintln!("\n{}", summary_line(report));
    for failure in &report.failures {
        eprintln!(
            "  chunk {} ({}): {}",
            failure.chunk_number, failure.stage, failure.message
        );
    }

    match deliverable {
        Deliverable::Audio(audio) => {
            if audio.format != report.requested_format {
                eprintln!(
                    "Requested {} but produced {}{}",
                    report.requested_format,
                    audio.format,
                    report
                        .transcode_fallback
                        .as_deref()
                        .map(|r| format!(" ({})", r))
                        .unwrap_or_default()
                );
            }
            if let Some(ms) = report.duration_ms {
                eprintln!("Duration: {}", format_duration(ms));
            }
        }
        Deliverable::Archive { .. } => {
            eprintln!(
                "Audio could not be combined{}; individual chunks are in the ZIP archive",
                report
                    .combine_error
                    .as_deref()
                    .map(|r| format!(" ({})", r))
                    .unwrap_or_default()
            );
        }
    }

    eprintln!(
        "Output: {} ({}, {})",
        output_path.display(),
        deliverable.mime_type(),
        format_bytes(deliverable.bytes().len() as u64)
    );

    if !outcome.audio_urls.is_empty() {
        let urls_path = output_dir.join("audio_urls.txt");
        std::fs::write(&urls_path, outcome.audio_urls_text())
            .with_context(|| format!("Failed to write {}", urls_path.display()))?;
        eprintln!("Audio URLs: {}", urls_path.display());
    }

    Ok(())
}

fn summary_line(report: &SessionReport) -> String {
    format!(
        "Chunks: {}, Completed: {}, Failed: {}",
        report.total_chunks,
        report.succeeded.len(),
        report.failures.len()
    )
}

fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

fn print_voices() {
    for category in VoiceCategory::ALL {
        println!("{}:", category.label());
        for voice in Voice::all().filter(|v| v.category() == category) {
            let marker = if voice == Voice::default() { " (default)" } else { "" };
            println!("  {}{}", voice, marker);
        }
    }
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = AudiobookConfig::load()?;
            println!("Configuration file: {:?}", AudiobookConfig::config_path()?);
            println!();
            println!("voice = \"{}\"", config.voice);
            println!("chunk_size = {}", config.chunk_size);
            println!("output_format = \"{}\"", config.output_format.extension());
            if let Some(dir) = &config.output_dir {
                println!("output_dir = \"{}\"", dir.display());
            } else {
                println!("output_dir = (next to document)");
            }
            if let Some(ffmpeg) = &config.ffmpeg_path {
                println!("ffmpeg_path = \"{}\"", ffmpeg.display());
            } else {
                println!("ffmpeg_path = (PATH lookup)");
            }
            println!("download_timeout_secs = {}", config.download_timeout_secs);
            println!();
            println!("[synthesis]");
            println!("provider = \"{}\"", config.synthesis.provider);
            println!("endpoint = \"{}\"", config.synthesis.endpoint);
            println!("queue_url = \"{}\"", config.synthesis.queue_url);
            println!("poll_interval_ms = {}", config.synthesis.poll_interval_ms);
            println!(
                "request_timeout_secs = {}",
                config.synthesis.request_timeout_secs
            );
            let key_source = if config.synthesis.api_key.is_some() {
                "config file"
            } else if std::env::var(speech_client::API_KEY_ENV).is_ok() {
                "environment"
            } else {
                "(not set)"
            };
            println!("api_key = {}", key_source);
        }
        ConfigAction::SetVoice { voice } => {
            let voice = Voice::parse(voice)?;
            let mut config = AudiobookConfig::load()?;
            config.voice = voice.id().to_string();
            config.save()?;
            println!("Default voice set to: {}", voice);
        }
        ConfigAction::SetChunkSize { value } => {
            let mut config = AudiobookConfig::load()?;
            config.chunk_size = config::clamp_chunk_size(*value);
            config.save()?;
            println!("Default chunk size set to: {}", config.chunk_size);
        }
        ConfigAction::SetFormat { format } => {
            let mut config = AudiobookConfig::load()?;
            config.output_format = *format;
            config.save()?;
            println!("Default output format set to: {}", format);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00:00");
        assert_eq!(format_duration(61_500), "0:01:01");
        assert_eq!(format_duration(3_723_000), "1:02:03");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "doc-audiobook",
            "book.docx",
            "--voice",
            "am_adam",
            "--format",
            "wav",
            "--chunk-size",
            "800",
        ])
        .unwrap();
        assert_eq!(args.document, Some(PathBuf::from("book.docx")));
        assert_eq!(args.voice.as_deref(), Some("am_adam"));
        assert_eq!(args.format, Some(OutputFormat::Wav));
        assert_eq!(args.chunk_size, Some(800));
    }

    #[test]
    fn test_config_subcommand_parse() {
        let args =
            Args::try_parse_from(["doc-audiobook", "config", "set-format", "mp3"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::Config {
                action: ConfigAction::SetFormat {
                    format: OutputFormat::Mp3
                }
            })
        ));
    }

    #[test]
    fn test_summary_line_counts_all_chunks() {
        let report = SessionReport {
            total_chunks: 3,
            succeeded: vec![1, 3],
            failures: vec![session::types::ChunkFailure {
                chunk_number: 2,
                stage: session::types::FailureStage::Download,
                message: "HTTP error: 404".to_string(),
            }],
            ..Default::default()
        };
        assert_eq!(summary_line(&report), "Chunks: 3, Completed: 2, Failed: 1");
    }

    #[test]
    fn test_write_outputs() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let outcome = SessionOutcome {
            deliverable: Deliverable::Archive {
                bytes: b"PK".to_vec(),
                filename: "Book_audio_chunks.zip".to_string(),
            },
            audio_urls: vec!["https://a/1.wav".to_string(), "https://a/2.wav".to_string()],
            report: Default::default(),
        };

        write_outputs(&outcome, temp_dir.path()).unwrap();

        let zip = std::fs::read(temp_dir.path().join("Book_audio_chunks.zip")).unwrap();
        assert_eq!(zip, b"PK");
        let urls = std::fs::read_to_string(temp_dir.path().join("audio_urls.txt")).unwrap();
        assert_eq!(urls, "https://a/1.wav\nhttps://a/2.wav");
    }
}
