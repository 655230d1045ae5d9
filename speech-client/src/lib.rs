//! Text-to-speech client library for the doc-audiobook workspace
//!
//! Provides a provider-agnostic interface for turning a chunk of text into a
//! remotely hosted audio file:
//! - fal.ai queue API (Kokoro American-English voices)
//! - Scripted mock provider for tests

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;
pub mod voices;

pub use config::{API_KEY_ENV, SynthesisConfig};
pub use error::{Result, SynthesisError};
pub use provider::{SpeechProvider, SynthesisEvent, SynthesisRequest, SynthesisStream};
pub use providers::{FalProvider, MockOutcome, MockProvider, ProviderKind, get_provider};
pub use voices::{DEFAULT_VOICE, Voice, VoiceCategory};
