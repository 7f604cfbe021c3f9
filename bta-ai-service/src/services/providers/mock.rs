//! Mock provider implementation for testing.

use super::{GenerationRequest, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Failure(String),
    Panic,
}

/// Mock text provider that records every call it receives.
pub struct MockTextProvider {
    reply: MockReply,
    delay: Option<Duration>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl MockTextProvider {
    /// Succeeds with `text`.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(MockReply::Text(text.into()))
    }

    /// Fails with an API error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(MockReply::Failure(message.into()))
    }

    /// Panics mid-call, for exercising fault containment.
    pub fn panicking() -> Self {
        Self::new(MockReply::Panic)
    }

    /// Sleep before replying.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    fn new(reply: MockReply) -> Self {
        Self {
            reply,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            MockReply::Text(text) => Ok(ProviderResponse {
                text: text.clone(),
                input_tokens: Some((request.instructions.len() + request.input.len()) as u64 / 4),
                output_tokens: Some(text.len() as u64 / 4),
                truncated: false,
            }),
            MockReply::Failure(message) => Err(ProviderError::ApiError(message.clone())),
            MockReply::Panic => panic!("mock provider panicked"),
        }
    }
}
