//! Agent error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model rate limit exceeded")]
    RateLimited,

    #[error("model returned an empty completion")]
    EmptyCompletion,

    #[error("model stream error: {0}")]
    Stream(String),
}

impl AgentError {
    /// Rate limiting is the one failure that retrying makes worse; every
    /// other generation error is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AgentError::RateLimited)
    }
}
