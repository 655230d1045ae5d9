//! MP3 transcoding through an external FFmpeg binary.
//!
//! The binary is probed once; callers get either a working transcoder or one
//! that reports the tool as unavailable, so fallback paths behave the same
//! whether or not FFmpeg is installed.

use super::CombineError;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Capability to encode an ordered list of audio files into one MP3.
pub trait Transcoder: Send + Sync {
    /// Whether the underlying tool can be invoked at all.
    fn is_available(&self) -> bool;

    /// Human-readable description for diagnostics.
    fn describe(&self) -> String;

    /// Encode every file listed in the concat manifest, in order, to `output_path`.
    fn concat_to_mp3(&self, manifest: &Path, output_path: &Path) -> Result<(), CombineError>;
}

/// FFmpeg found and responding to `-version`.
pub struct FfmpegTranscoder {
    program: PathBuf,
    version: String,
}

impl FfmpegTranscoder {
    /// Probe `program` and return a transcoder if it runs.
    pub fn probe(program: impl Into<PathBuf>) -> Option<Self> {
        let program = program.into();
        let output = Command::new(&program).arg("-version").output().ok()?;
        if !output.status.success() {
            return None;
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("unknown")
            .to_string();

        Some(Self { program, version })
    }
}

impl Transcoder for FfmpegTranscoder {
    fn is_available(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.program.display(), self.version)
    }

    fn concat_to_mp3(&self, manifest: &Path, output_path: &Path) -> Result<(), CombineError> {
        let output = Command::new(&self.program)
            .args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(manifest)
            .args(["-c:a", "libmp3lame", "-q:a", "2"])
            .arg(output_path)
            .output()
            .map_err(|e| CombineError::ToolUnavailable(format!("{}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            return Err(CombineError::Transcode(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                tail.join(" | ")
            )));
        }

        if !output_path.exists() {
            return Err(CombineError::Transcode(
                "ffmpeg reported success but produced no output".to_string(),
            ));
        }

        Ok(())
    }
}

/// Stand-in used when no FFmpeg binary could be found.
pub struct MissingTranscoder {
    reason: String,
}

impl MissingTranscoder {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Transcoder for MissingTranscoder {
    fn is_available(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        format!("unavailable ({})", self.reason)
    }

    fn concat_to_mp3(&self, _manifest: &Path, _output_path: &Path) -> Result<(), CombineError> {
        Err(CombineError::ToolUnavailable(self.reason.clone()))
    }
}

/// Find a usable FFmpeg, preferring an explicitly configured binary.
pub fn detect_transcoder(configured: Option<&Path>) -> Box<dyn Transcoder> {
    if let Some(path) = configured {
        return match FfmpegTranscoder::probe(path) {
            Some(t) => Box::new(t),
            None => Box::new(MissingTranscoder::new(format!(
                "configured ffmpeg at {} did not run",
                path.display()
            ))),
        };
    }

    match FfmpegTranscoder::probe("ffmpeg") {
        Some(t) => Box::new(t),
        None => Box::new(MissingTranscoder::new("ffmpeg is not installed or not in PATH")),
    }
}

/// Write an FFmpeg concat-demuxer manifest listing `audio_files` in order.
pub fn write_concat_manifest(audio_files: &[&Path], manifest_path: &Path) -> std::io::Result<()> {
    let mut list_content = String::new();
    for path in audio_files {
        // Escape single quotes in path
        let path_str = path.to_string_lossy().replace('\'', "'\\''");
        list_content.push_str(&format!("file '{}'\n", path_str));
    }
    std::fs::write(manifest_path, list_content)
}
