//! OpenAI provider implementation.
//!
//! Calls the Responses API with the `web_search` tool attached. Tool use is
//! forced by default so every report is grounded in retrieved evidence.

use super::{GenerationRequest, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI provider configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Secret<String>,
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: Option<u32>,
    pub force_tool_use: bool,
}

/// OpenAI text provider.
pub struct OpenAiTextProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiTextProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        // Overall deadline is enforced by the caller; this only bounds connects.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn api_url(&self) -> String {
        format!("{}/responses", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(&'a self, request: &'a GenerationRequest) -> ResponsesRequest<'a> {
        ResponsesRequest {
            model: &self.config.model,
            instructions: &request.instructions,
            input: &request.input,
            tools: vec![Tool { kind: "web_search" }],
            tool_choice: self.config.force_tool_use.then_some("required"),
            max_output_tokens: self.config.max_output_tokens,
        }
    }
}

#[async_trait]
impl TextProvider for OpenAiTextProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let body = self.build_request(request);

        tracing::debug!(
            model = %self.config.model,
            instructions_len = request.instructions.len(),
            input_len = request.input.len(),
            forced_tool_use = self.config.force_tool_use,
            "Sending request to OpenAI Responses API"
        );

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = api_error_message(&error_text);

            // 429 covers both request throttling and exhausted quota; the
            // message is the only way to tell them apart.
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(ProviderError::RateLimited(message));
            }

            return Err(ProviderError::ApiError(format!(
                "OpenAI API error {}: {}",
                status, message
            )));
        }

        let api_response: ResponsesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        into_provider_response(api_response)
    }
}

/// Map a parsed Responses API body to a provider result.
fn into_provider_response(api_response: ResponsesResponse) -> Result<ProviderResponse, ProviderError> {
    if let Some(error) = api_response.error {
        return Err(ProviderError::ApiError(error.message));
    }

    if api_response.status.as_deref() == Some("failed") {
        return Err(ProviderError::ApiError(
            "Response generation failed without an error message".to_string(),
        ));
    }

    let truncated = api_response.status.as_deref() == Some("incomplete");
    if truncated {
        tracing::warn!(
            reason = api_response
                .incomplete_details
                .as_ref()
                .and_then(|d| d.reason.as_deref())
                .unwrap_or("unknown"),
            "OpenAI response is incomplete"
        );
    }

    let text = match api_response.output_text {
        Some(text) => text,
        None => collect_output_text(&api_response.output),
    };

    let usage = api_response.usage.unwrap_or_default();

    Ok(ProviderResponse {
        text,
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        truncated,
    })
}

/// Concatenate every `output_text` part of every `message` item, in order.
/// Tool call items (web searches) carry no text.
fn collect_output_text(output: &[OutputItem]) -> String {
    output
        .iter()
        .filter_map(|item| match item {
            OutputItem::Message { content } => Some(content),
            OutputItem::Other => None,
        })
        .flatten()
        .filter_map(|part| match part {
            ContentPart::OutputText { text } => Some(text.as_str()),
            ContentPart::Other => None,
        })
        .collect()
}

/// Prefer the API's own error message over the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string())
}

// ============================================================================
// Responses API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Tool {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    incomplete_details: Option<IncompleteDetails>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<ContentPart>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    OutputText { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct IncompleteDetails {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}
