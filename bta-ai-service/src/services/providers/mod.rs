//! Generation provider abstraction.
//!
//! The analysis pipeline talks to the model through [`TextProvider`], so the
//! OpenAI backend can be swapped for the mock in tests.

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Metrics label.
    pub fn error_type(&self) -> &'static str {
        match self {
            ProviderError::ApiError(_) => "api",
            ProviderError::RateLimited(_) => "rate_limited",
            ProviderError::NetworkError(_) => "network",
            ProviderError::InvalidResponse(_) => "invalid_response",
            ProviderError::Timeout(_) => "timeout",
        }
    }
}

/// Everything a provider needs for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// System-level instructions.
    pub instructions: String,

    /// Canonical JSON input, sent as the user content.
    pub input: String,
}

/// Result of a provider call.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    /// Extracted plain text. May be empty.
    pub text: String,

    pub input_tokens: Option<u64>,

    pub output_tokens: Option<u64>,

    /// True when the provider stopped early (e.g. output token ceiling).
    pub truncated: bool,
}

/// Trait for text generation providers with mandatory web search.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Short provider name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Model identifier sent to the provider.
    fn model(&self) -> &str;

    /// Generate a report. Implementations must enable evidence retrieval.
    async fn generate(&self, request: &GenerationRequest)
        -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_keeps_sub_second_deadlines() {
        let err = ProviderError::Timeout(Duration::from_millis(50));
        assert_eq!(err.to_string(), "Timed out after 50ms");
        assert_eq!(err.error_type(), "timeout");
    }

    #[test]
    fn rate_limit_message_is_kept() {
        let err = ProviderError::RateLimited("You exceeded your current quota".into());
        assert_eq!(err.to_string(), "Rate limited: You exceeded your current quota");
        assert_eq!(err.error_type(), "rate_limited");
    }
}
