//! Speech provider implementations

mod fal;
pub mod mock;

pub use fal::FalProvider;
pub use mock::{MockOutcome, MockProvider};

use crate::config::SynthesisConfig;
use crate::error::{Result, SynthesisError};
use crate::provider::SpeechProvider;

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Fal,
}

impl ProviderKind {
    /// Parse provider kind from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fal" | "fal-ai" | "fal.ai" => Ok(Self::Fal),
            _ => Err(SynthesisError::ConfigError(format!("Unknown provider: {}", s))),
        }
    }
}

/// Create a provider instance from configuration
pub fn get_provider(config: &SynthesisConfig) -> Result<Box<dyn SpeechProvider>> {
    match ProviderKind::from_str(&config.provider)? {
        ProviderKind::Fal => Ok(Box::new(FalProvider::from_config(config)?)),
    }
}
