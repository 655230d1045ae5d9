//! Audio combining: WAV frame concatenation, MP3 transcoding and the
//! archive fallback.

pub mod archive;
pub mod assembler;
pub mod transcode;

pub use archive::build_zip_archive;
pub use assembler::concatenate_wav_files;
pub use transcode::{Transcoder, detect_transcoder};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Combine-related errors.
#[derive(Debug, Error)]
pub enum CombineError {
    #[error("No audio files provided")]
    NoInputs,

    #[error("{path} has {found}, expected {expected} like the first fragment")]
    FormatMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("Invalid WAV file {path}: {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Transcoder not available: {0}")]
    ToolUnavailable(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Failed to build archive: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Container format of the final audiobook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Wav,
    #[default]
    Mp3,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mp3",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_uppercase())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            other => Err(format!("Unknown output format '{}'. Use wav or mp3.", other)),
        }
    }
}
