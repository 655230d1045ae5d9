use futures_util::stream::BoxStream;

use crate::error::Result;
use crate::voices::Voice;

/// Request to synthesize one piece of text
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: Voice,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: Voice) -> Self {
        Self {
            text: text.into(),
            voice,
        }
    }
}

/// Progress notifications emitted while a request runs.
///
/// A stream always ends after `Completed` or after the first error item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    /// Waiting in the remote queue
    Queued { position: Option<u32> },
    /// The remote worker picked up the request
    InProgress,
    /// A log line reported by the remote worker
    Log(String),
    /// Audio is ready at the given URL
    Completed { audio_url: String },
}

/// Finite, lazily driven sequence of progress events.
pub type SynthesisStream<'a> = BoxStream<'a, Result<SynthesisEvent>>;

/// Trait for speech providers
pub trait SpeechProvider: Send + Sync {
    /// Start a synthesis request; nothing is sent until the stream is polled
    fn synthesize<'a>(&'a self, request: &'a SynthesisRequest) -> SynthesisStream<'a>;

    /// Get the provider name for display
    fn name(&self) -> &'static str;

    /// Check if the provider is usable (API key set, etc.)
    fn is_available(&self) -> Result<()>;
}
