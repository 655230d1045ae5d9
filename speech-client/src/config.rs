use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthesisError};

/// Environment variable holding the queue API key
pub const API_KEY_ENV: &str = "FAL_KEY";

const DEFAULT_PROVIDER: &str = "fal";
const DEFAULT_ENDPOINT: &str = "fal-ai/kokoro/american-english";
const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Synthesis settings, read once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Provider identifier (currently only `fal`)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model application path on the queue
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Base URL of the queue API
    #[serde(default = "default_queue_url")]
    pub queue_url: String,

    /// Delay between status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for a single chunk's synthesis, queue time included
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// API key (optional, can use env var instead)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_queue_url() -> String {
    DEFAULT_QUEUE_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_endpoint(),
            queue_url: default_queue_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            api_key: None,
        }
    }
}

impl SynthesisConfig {
    /// Get the API key from config, falling back to the environment
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.clone());
        }

        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SynthesisError::MissingApiKey {
                env_var: API_KEY_ENV.to_string(),
            })
    }

    /// Full URL requests are submitted to
    pub fn submit_url(&self) -> String {
        format!(
            "{}/{}",
            self.queue_url.trim_end_matches('/'),
            self.endpoint.trim_matches('/')
        )
    }
}
