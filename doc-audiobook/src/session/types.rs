//! Session data types for audiobook generation.

use crate::audio::OutputFormat;
use speech_client::Voice;
use std::fmt;
use std::path::PathBuf;

/// Settings for one conversion run, fixed before it starts.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Voice used for every chunk
    pub voice: Voice,
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Requested container for the final audiobook
    pub output_format: OutputFormat,
    /// Title used to derive output file names (sanitized before use)
    pub title: String,
    /// Directory to create the temporary working directory in
    pub work_root: Option<PathBuf>,
}

/// Replace every character that is not alphanumeric with `_`.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Stage of a run, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Chunking,
    Synthesis,
    Combining,
    Transcoding,
    Delivering,
    Cleanup,
}

/// Where a chunk failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Synthesis,
    Download,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synthesis => f.write_str("synthesis"),
            Self::Download => f.write_str("download"),
        }
    }
}

/// A chunk that produced no usable audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    /// 1-based chunk number
    pub chunk_number: usize,
    pub stage: FailureStage,
    pub message: String,
}

/// Audio produced for one text chunk.
#[derive(Debug, Clone)]
pub struct AudioFragment {
    /// Index of the source chunk
    pub chunk_index: usize,
    /// Remote URL returned by synthesis
    pub audio_url: Option<String>,
    /// Local copy inside the working directory
    pub local_path: Option<PathBuf>,
    /// Set when synthesis or download failed
    pub failure: Option<ChunkFailure>,
}

impl AudioFragment {
    pub fn new(chunk_index: usize) -> Self {
        Self {
            chunk_index,
            audio_url: None,
            local_path: None,
            failure: None,
        }
    }

    /// Whether the fragment is ready to be combined.
    pub fn succeeded(&self) -> bool {
        self.local_path.is_some() && self.failure.is_none()
    }

    pub fn mark_failed(&mut self, stage: FailureStage, message: String) {
        self.local_path = None;
        self.failure = Some(ChunkFailure {
            chunk_number: self.chunk_index + 1,
            stage,
            message,
        });
    }
}

/// The merged audiobook.
#[derive(Debug, Clone)]
pub struct CombinedAudio {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub filename: String,
}

/// What the user receives at the end of a run.
#[derive(Debug, Clone)]
pub enum Deliverable {
    /// A single WAV or MP3 file
    Audio(CombinedAudio),
    /// ZIP of the individual fragments, when merging failed
    Archive { bytes: Vec<u8>, filename: String },
}

impl Deliverable {
    pub fn filename(&self) -> &str {
        match self {
            Self::Audio(audio) => &audio.filename,
            Self::Archive { filename, .. } => filename,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Audio(audio) => &audio.bytes,
            Self::Archive { bytes, .. } => bytes,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Audio(audio) => audio.format.mime_type(),
            Self::Archive { .. } => "application/zip",
        }
    }
}

/// Summary of how a run went.
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub total_chunks: usize,
    /// Format asked for; the deliverable says what was produced
    pub requested_format: OutputFormat,
    /// 1-based numbers of chunks whose audio made it into the deliverable
    pub succeeded: Vec<usize>,
    pub failures: Vec<ChunkFailure>,
    /// Why MP3 output was replaced by WAV
    pub transcode_fallback: Option<String>,
    /// Why the fragments were archived instead of merged
    pub combine_error: Option<String>,
    /// Merged duration, when a merge happened
    pub duration_ms: Option<u64>,
}

/// Result of a run that produced something.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub deliverable: Deliverable,
    /// Remote audio URLs in chunk order, for manual recovery
    pub audio_urls: Vec<String>,
    pub report: SessionReport,
}

impl SessionOutcome {
    /// The URL list as a plain text file body.
    pub fn audio_urls_text(&self) -> String {
        self.audio_urls.join("\n")
    }
}

/// Progress notifications for whatever is displaying the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StageEntered(Stage),
    ChunkStarted { number: usize, total: usize },
    Queued { number: usize, position: Option<u32> },
    SynthesisLog { number: usize, message: String },
    Downloading { number: usize },
    ChunkSucceeded { number: usize },
    ChunkFailed(ChunkFailure),
    TranscodeFallback { reason: String },
    CombineFailed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("My Book: Part 2!"), "My_Book__Part_2_");
        assert_eq!(sanitize_title("Ünïcode"), "Ünïcode");
        assert_eq!(sanitize_title("a/b\\c.d"), "a_b_c_d");
    }

    #[test]
    fn test_fragment_lifecycle() {
        let mut fragment = AudioFragment::new(4);
        assert!(!fragment.succeeded());

        fragment.audio_url = Some("http://x/5.wav".to_string());
        fragment.local_path = Some(PathBuf::from("/tmp/chunk_005.wav"));
        assert!(fragment.succeeded());

        fragment.mark_failed(FailureStage::Download, "HTTP 404".to_string());
        assert!(!fragment.succeeded());
        assert!(fragment.local_path.is_none());
        let failure = fragment.failure.unwrap();
        assert_eq!(failure.chunk_number, 5);
        assert_eq!(failure.stage, FailureStage::Download);
    }

    #[test]
    fn test_deliverable_accessors() {
        let audio = Deliverable::Audio(CombinedAudio {
            bytes: vec![1, 2, 3],
            format: OutputFormat::Wav,
            filename: "T_audiobook.wav".to_string(),
        });
        assert_eq!(audio.filename(), "T_audiobook.wav");
        assert_eq!(audio.mime_type(), "audio/wav");
        assert_eq!(audio.bytes(), &[1, 2, 3]);

        let archive = Deliverable::Archive {
            bytes: vec![],
            filename: "T_audio_chunks.zip".to_string(),
        };
        assert_eq!(archive.mime_type(), "application/zip");
    }
}
