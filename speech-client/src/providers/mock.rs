//! Mock speech provider for testing
//!
//! Plays back a script of outcomes, one per `synthesize` call, so callers can
//! exercise partial and total failure paths without the network.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::StreamExt;
use futures_util::stream;

use crate::error::SynthesisError;
use crate::provider::{SpeechProvider, SynthesisEvent, SynthesisRequest, SynthesisStream};

/// Outcome of a single scripted call
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Succeed with this audio URL
    Audio(String),
    /// Fail with an API error carrying this message
    Fail(String),
}

/// A mock provider for testing orchestration behavior
pub struct MockProvider {
    /// Outcomes in call order; calls beyond the script fail
    script: Vec<MockOutcome>,
    /// Current call count
    call_count: AtomicUsize,
    /// Texts received, in call order
    received: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Create a provider that plays back the given outcomes in order
    pub fn scripted(script: Vec<MockOutcome>) -> Self {
        Self {
            script,
            call_count: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider whose every call fails
    pub fn always_fails() -> Self {
        Self::scripted(Vec::new())
    }

    /// Get the number of times synthesize() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Texts passed to synthesize(), in call order
    pub fn received_texts(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

impl SpeechProvider for MockProvider {
    fn synthesize<'a>(&'a self, request: &'a SynthesisRequest) -> SynthesisStream<'a> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(request.text.clone());

        let outcome = self
            .script
            .get(call_num)
            .cloned()
            .unwrap_or_else(|| MockOutcome::Fail("no scripted outcome".to_string()));

        let mut items = vec![
            Ok(SynthesisEvent::Queued { position: Some(0) }),
            Ok(SynthesisEvent::InProgress),
            Ok(SynthesisEvent::Log(format!("mock call {}", call_num + 1))),
        ];
        items.push(match outcome {
            MockOutcome::Audio(audio_url) => Ok(SynthesisEvent::Completed { audio_url }),
            MockOutcome::Fail(message) => Err(SynthesisError::ApiError {
                message,
                status_code: Some(500),
            }),
        });

        stream::iter(items).boxed()
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_available(&self) -> crate::error::Result<()> {
        Ok(())
    }
}
