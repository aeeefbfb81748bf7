//! Typed errors for the feedback pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on the failure class. Per-item classification failures and synthesis
//! quality misses are absorbed inside their stages and never appear here.

use thiserror::Error;

use crate::traits::sink::RunStage;

/// Errors from a source client.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Non-retryable HTTP status (4xx other than 429)
    #[error("HTTP {status} from source (not retryable)")]
    Http { status: u16, retryable: bool },

    /// Retries exhausted on a retryable status (429, 5xx)
    #[error("source still returning HTTP {status} after {attempts} attempts")]
    Exhausted { status: u16, attempts: u32 },

    /// Transport-level failure (connect, timeout, TLS)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("decode error: {0}")]
    Decode(String),
}

impl SourceError {
    /// Whether the retry policy applies to this HTTP status.
    pub fn status_is_retryable(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }
}

/// Errors from the language-model service boundary.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The service rejected or failed the request
    #[error("language model API error: {0}")]
    Api(String),

    /// Transport-level failure reaching the service
    #[error("language model transport error: {0}")]
    Transport(String),

    /// Output did not match the requested shape
    #[error("malformed language model response: {0}")]
    MalformedResponse(String),
}

/// Terminal errors for a pipeline run. All carry a message suitable for
/// direct display.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No relevant content survived filtering and deduplication
    #[error(
        "no relevant discussion found for \"{product}\"; \
         try a more specific product name"
    )]
    EmptyResult { product: String },

    /// Every configured source failed outright
    #[error("all content sources failed; check connectivity and source configuration")]
    AllSourcesFailed,

    /// Unexpected failure inside a stage
    #[error("pipeline failed during {stage}: {message}")]
    Stage { stage: RunStage, message: String },
}

/// Result alias for pipeline-level operations.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(SourceError::status_is_retryable(429));
        assert!(SourceError::status_is_retryable(500));
        assert!(SourceError::status_is_retryable(503));
        assert!(!SourceError::status_is_retryable(404));
        assert!(!SourceError::status_is_retryable(401));
        assert!(!SourceError::status_is_retryable(200));
    }

    #[test]
    fn empty_result_message_is_actionable() {
        let err = PipelineError::EmptyResult {
            product: "WidgetPro".into(),
        };
        let message = err.to_string();
        assert!(message.contains("WidgetPro"));
        assert!(message.contains("more specific"));
    }
}
