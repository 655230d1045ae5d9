use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("API key not found. Set {env_var} environment variable or add it to the config.")]
    MissingApiKey { env_var: String },

    #[error("Unsupported voice: {0}")]
    UnsupportedVoice(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API error{}: {message}", status_code.map(|c| format!(" (HTTP {})", c)).unwrap_or_default())]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Response did not contain an audio URL")]
    MissingAudio,

    #[error("Synthesis did not complete within {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for SynthesisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, SynthesisError>;
