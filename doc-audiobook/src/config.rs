//! doc-audiobook configuration management.

use crate::audio::OutputFormat;
use crate::text::chunker::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use speech_client::{DEFAULT_VOICE, SynthesisConfig, Voice};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudiobookConfig {
    /// Default voice id
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Maximum chunk size in characters (500-2000)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Output container (mp3 or wav)
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Where to write results. None means next to the input document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Explicit ffmpeg binary. None means look it up on PATH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,

    /// Timeout for downloading one audio fragment
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Remote synthesis settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

impl Default for AudiobookConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            chunk_size: default_chunk_size(),
            output_format: OutputFormat::default(),
            output_dir: None,
            ffmpeg_path: None,
            download_timeout_secs: default_download_timeout_secs(),
            synthesis: SynthesisConfig::default(),
        }
    }
}

/// Keep a chunk size inside the selectable range.
pub fn clamp_chunk_size(size: usize) -> usize {
    size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
}

impl AudiobookConfig {
    /// Get the config file path: ~/.config/cli-programs/doc-audiobook.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("doc-audiobook.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let mut config: AudiobookConfig = toml::from_str(&content)?;
        config.chunk_size = clamp_chunk_size(config.chunk_size);
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// The configured voice, checked against the catalog.
    pub fn voice(&self) -> Result<Voice> {
        Ok(Voice::parse(&self.voice)?)
    }
}
