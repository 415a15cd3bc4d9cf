//! The external extraction service: instruction + image in, text out.
//!
//! [`TextExtractor`] is the seam between the pipeline and whatever model
//! reads the image. Two implementations ship with the crate:
//!
//! * [`GeminiExtractor`]: calls the Generative Language REST API directly
//!   with an explicit API key. This is the default.
//! * [`LlmProviderExtractor`]: adapts any edgequake-llm [`LLMProvider`]
//!   (OpenAI, Anthropic, Ollama, …).
//!
//! Implementations make exactly one outbound call per `extract` and never
//! retry; failures come back as [`ItemError::Service`].

use crate::error::ItemError;
use crate::pipeline::encode::EncodedImage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Raw reply from the extraction service, before normalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceReply {
    /// Model text. `None` when the reply carried no text part.
    pub text: Option<String>,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl ServiceReply {
    /// Reply with text only, no usage figures.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

/// Something that can read text out of an image.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &str;

    /// Submit one image with the instruction.
    async fn extract(
        &self,
        instruction: &str,
        image: &EncodedImage,
    ) -> Result<ServiceReply, ItemError>;
}

// ── Gemini REST ──────────────────────────────────────────────────────────────

/// Direct client for `models/{model}:generateContent`.
pub struct GeminiExtractor {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: usize,
}

impl GeminiExtractor {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            temperature: 0.1,
            max_tokens: 8192,
        }
    }

    pub fn with_generation(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl GenerateResponse {
    fn into_reply(self) -> Result<ServiceReply, ItemError> {
        let usage = self.usage_metadata.unwrap_or_default();
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(ItemError::Service {
                message: format!("Gemini returned no text: {reason}"),
            });
        };

        let parts: Vec<String> = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        let text = if parts.is_empty() {
            None
        } else {
            Some(parts.concat())
        };

        Ok(ServiceReply {
            text,
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        })
    }
}

#[async_trait]
impl TextExtractor for GeminiExtractor {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn extract(
        &self,
        instruction: &str,
        image: &EncodedImage,
    ) -> Result<ServiceReply, ItemError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": instruction },
                    { "inline_data": { "mime_type": image.mime_type, "data": image.data } }
                ]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens
            }
        });

        debug!("Sending image to Gemini model {}", self.model);

        // Key goes in a header so it never shows up in reqwest's URL-bearing errors.
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ItemError::Service {
                message: e.to_string(),
            })?;

        let status = response.status();
        let raw = response.text().await.map_err(|e| ItemError::Service {
            message: e.to_string(),
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorBody>(&raw) {
                Ok(body) => format!("Gemini API error ({}): {}", body.error.code, body.error.message),
                Err(_) => format!("Gemini API error ({status}): {raw}"),
            };
            return Err(ItemError::Service { message });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&raw).map_err(|e| ItemError::Service {
                message: format!("Malformed Gemini response: {e}"),
            })?;
        parsed.into_reply()
    }
}

// ── edgequake-llm adapter ────────────────────────────────────────────────────

/// Adapter for any edgequake-llm vision provider.
pub struct LlmProviderExtractor {
    provider: Arc<dyn LLMProvider>,
    name: String,
    options: CompletionOptions,
}

impl LlmProviderExtractor {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        name: impl Into<String>,
        temperature: f32,
        max_tokens: usize,
    ) -> Self {
        Self {
            provider,
            name: name.into(),
            options: build_options(temperature, max_tokens),
        }
    }
}

fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl TextExtractor for LlmProviderExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(
        &self,
        instruction: &str,
        image: &EncodedImage,
    ) -> Result<ServiceReply, ItemError> {
        let messages = vec![ChatMessage::user_with_images(
            instruction,
            vec![image.to_image_data()],
        )];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| ItemError::Service {
                message: e.to_string(),
            })?;

        Ok(ServiceReply {
            text: Some(response.content),
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
        })
    }
}
