//! Drives one conversion: chunk, synthesize and download each chunk in
//! order, combine, then pick the deliverable.

use super::types::{
    AudioFragment, CombinedAudio, Deliverable, FailureStage, SessionEvent, SessionOptions,
    SessionOutcome, SessionReport, Stage, sanitize_title,
};
use crate::audio::transcode::write_concat_manifest;
use crate::audio::{
    CombineError, OutputFormat, Transcoder, build_zip_archive, concatenate_wav_files,
};
use crate::fetch::Fetcher;
use crate::text::{TextChunk, chunk_document};
use futures_util::StreamExt;
use speech_client::{SpeechProvider, SynthesisError, SynthesisEvent, SynthesisRequest};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;

/// Errors that end a run without a deliverable.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Document produced no text to synthesize")]
    NothingToSynthesize,

    #[error("No audio chunks were successfully generated ({attempted} attempted)")]
    NoFragments { attempted: usize },

    #[error("Failed to create working directory: {0}")]
    WorkDir(#[source] std::io::Error),

    #[error("Failed to combine audio and to archive fragments: {0}")]
    Combine(#[from] CombineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One conversion run and the collaborators it talks to.
pub struct Session<'a> {
    provider: &'a dyn SpeechProvider,
    fetcher: &'a Fetcher,
    transcoder: &'a dyn Transcoder,
    options: SessionOptions,
}

impl<'a> Session<'a> {
    pub fn new(
        provider: &'a dyn SpeechProvider,
        fetcher: &'a Fetcher,
        transcoder: &'a dyn Transcoder,
        options: SessionOptions,
    ) -> Self {
        Self {
            provider,
            fetcher,
            transcoder,
            options,
        }
    }

    /// Chunk the text without running anything, for previews.
    pub fn plan(&self, text: &str) -> Vec<TextChunk> {
        chunk_document(text, self.options.chunk_size)
    }

    /// Run the whole conversion.
    ///
    /// The working directory is removed before this returns, whatever the
    /// outcome; if the run unwinds, dropping it removes it as well.
    pub async fn run(
        &self,
        text: &str,
        mut on_event: impl FnMut(SessionEvent),
    ) -> Result<SessionOutcome, SessionError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("doc-audiobook-");
        let work_dir = match &self.options.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(SessionError::WorkDir)?;
        log::debug!("Working directory: {}", work_dir.path().display());

        let result = self.run_in(&work_dir, text, &mut on_event).await;

        on_event(SessionEvent::StageEntered(Stage::Cleanup));
        let work_path = work_dir.path().to_path_buf();
        if let Err(e) = work_dir.close() {
            log::error!(
                "Error cleaning up temporary files in {}: {}",
                work_path.display(),
                e
            );
        }

        result
    }

    async fn run_in(
        &self,
        work_dir: &TempDir,
        text: &str,
        on_event: &mut impl FnMut(SessionEvent),
    ) -> Result<SessionOutcome, SessionError> {
        on_event(SessionEvent::StageEntered(Stage::Chunking));
        let chunks = self.plan(text);
        if chunks.is_empty() {
            return Err(SessionError::NothingToSynthesize);
        }
        log::info!(
            "Processing {} text chunks with voice {}",
            chunks.len(),
            self.options.voice
        );

        on_event(SessionEvent::StageEntered(Stage::Synthesis));
        let mut fragments = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            on_event(SessionEvent::ChunkStarted {
                number: chunk.number(),
                total: chunks.len(),
            });
            let fragment = self.process_chunk(chunk, work_dir.path(), on_event).await;
            match &fragment.failure {
                Some(failure) => on_event(SessionEvent::ChunkFailed(failure.clone())),
                None => on_event(SessionEvent::ChunkSucceeded {
                    number: chunk.number(),
                }),
            }
            fragments.push(fragment);
        }

        let mut report = SessionReport {
            total_chunks: chunks.len(),
            requested_format: self.options.output_format,
            ..Default::default()
        };
        report.failures = fragments.iter().filter_map(|f| f.failure.clone()).collect();
        report.succeeded = fragments
            .iter()
            .filter(|f| f.succeeded())
            .map(|f| f.chunk_index + 1)
            .collect();
        let inputs: Vec<PathBuf> = fragments
            .iter()
            .filter(|f| f.succeeded())
            .filter_map(|f| f.local_path.clone())
            .collect();
        let audio_urls: Vec<String> = fragments
            .iter()
            .filter_map(|f| f.audio_url.clone())
            .collect();

        if inputs.is_empty() {
            log::error!("No audio chunks were successfully generated");
            return Err(SessionError::NoFragments {
                attempted: chunks.len(),
            });
        }

        on_event(SessionEvent::StageEntered(Stage::Combining));
        let deliverable = self.combine(&inputs, work_dir.path(), &mut report, on_event)?;

        on_event(SessionEvent::StageEntered(Stage::Delivering));
        Ok(SessionOutcome {
            deliverable,
            audio_urls,
            report,
        })
    }

    /// Synthesize and download one chunk. Failures are recorded, not raised.
    async fn process_chunk(
        &self,
        chunk: &TextChunk,
        work_dir: &Path,
        on_event: &mut impl FnMut(SessionEvent),
    ) -> AudioFragment {
        let number = chunk.number();
        let mut fragment = AudioFragment::new(chunk.index);
        log::debug!("Chunk {}: {} characters", number, chunk.char_len());

        let audio_url = match self.synthesize(chunk, on_event).await {
            Ok(url) => url,
            Err(e) => {
                log::error!("Error in audio generation for chunk {} (synthesis): {}", number, e);
                fragment.mark_failed(FailureStage::Synthesis, e.to_string());
                return fragment;
            }
        };
        fragment.audio_url = Some(audio_url.clone());

        on_event(SessionEvent::Downloading { number });
        let destination = work_dir.join(fragment_filename(chunk));
        match self.fetcher.fetch(&audio_url, &destination).await {
            Ok(()) => fragment.local_path = Some(destination),
            Err(e) => {
                log::error!("Error downloading audio for chunk {} (download): {}", number, e);
                fragment.mark_failed(FailureStage::Download, e.to_string());
            }
        }

        fragment
    }

    /// Consume the provider's progress stream until it yields an audio URL.
    async fn synthesize(
        &self,
        chunk: &TextChunk,
        on_event: &mut impl FnMut(SessionEvent),
    ) -> Result<String, SynthesisError> {
        let number = chunk.number();
        let request = SynthesisRequest::new(chunk.text.clone(), self.options.voice);
        let mut events = self.provider.synthesize(&request);

        while let Some(event) = events.next().await {
            match event? {
                SynthesisEvent::Queued { position } => {
                    on_event(SessionEvent::Queued { number, position });
                }
                SynthesisEvent::InProgress => {
                    log::debug!("Chunk {} in progress", number);
                }
                SynthesisEvent::Log(message) => {
                    log::debug!("Chunk {}: {}", number, message);
                    on_event(SessionEvent::SynthesisLog { number, message });
                }
                SynthesisEvent::Completed { audio_url } => return Ok(audio_url),
            }
        }

        Err(SynthesisError::MissingAudio)
    }

    /// Merge the fragments and select what to deliver.
    fn combine(
        &self,
        inputs: &[PathBuf],
        work_dir: &Path,
        report: &mut SessionReport,
        on_event: &mut impl FnMut(SessionEvent),
    ) -> Result<Deliverable, SessionError> {
        let safe_title = sanitize_title(&self.options.title);
        let inputs: Vec<&Path> = inputs.iter().map(|p| p.as_path()).collect();
        let combined_wav = work_dir.join(format!("{}_combined.wav", safe_title));

        let summary = match concatenate_wav_files(&inputs, &combined_wav) {
            Ok(summary) => summary,
            Err(e) => {
                log::error!("Error combining WAV files: {}", e);
                on_event(SessionEvent::CombineFailed {
                    reason: e.to_string(),
                });
                report.combine_error = Some(e.to_string());

                let bytes = build_zip_archive(&inputs)?;
                return Ok(Deliverable::Archive {
                    bytes,
                    filename: format!("{}_audio_chunks.zip", safe_title),
                });
            }
        };
        report.duration_ms = Some(summary.duration_ms());

        let mut delivered = (combined_wav, OutputFormat::Wav);
        if self.options.output_format == OutputFormat::Mp3 {
            on_event(SessionEvent::StageEntered(Stage::Transcoding));
            let mp3_path = work_dir.join(format!("{}_audiobook.mp3", safe_title));
            match self.transcode(&inputs, work_dir, &mp3_path) {
                Ok(()) => delivered = (mp3_path, OutputFormat::Mp3),
                Err(e) => {
                    log::warn!("Could not convert to MP3, providing WAV instead: {}", e);
                    on_event(SessionEvent::TranscodeFallback {
                        reason: e.to_string(),
                    });
                    report.transcode_fallback = Some(e.to_string());
                }
            }
        }

        let (path, format) = delivered;
        let bytes = std::fs::read(&path)?;
        Ok(Deliverable::Audio(CombinedAudio {
            bytes,
            format,
            filename: format!("{}_audiobook.{}", safe_title, format.extension()),
        }))
    }

    fn transcode(
        &self,
        inputs: &[&Path],
        work_dir: &Path,
        output_path: &Path,
    ) -> Result<(), CombineError> {
        if !self.transcoder.is_available() {
            return Err(CombineError::ToolUnavailable(self.transcoder.describe()));
        }

        let manifest = work_dir.join("file_list.txt");
        write_concat_manifest(inputs, &manifest)?;
        self.transcoder.concat_to_mp3(&manifest, output_path)
    }
}

/// Local file name for a chunk's audio.
pub fn fragment_filename(chunk: &TextChunk) -> String {
    format!("chunk_{:03}.wav", chunk.number())
}
