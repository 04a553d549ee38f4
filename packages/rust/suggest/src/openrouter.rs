//! OpenRouter-backed generation capability.
//!
//! Speaks the chat-completions shape over HTTPS with bearer auth. The
//! base URL is overridable so tests can point at a mock server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use docpilot_shared::{DocPilotError, Result};

use crate::capability::{GenerationCapability, GenerationRequest, GenerationResponse};

/// Default OpenRouter API endpoint.
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("DocPilot/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types (chat-completions shape)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

// ---------------------------------------------------------------------------
// Capability implementation
// ---------------------------------------------------------------------------

/// OpenRouter chat-completions client.
pub struct OpenRouterCapability {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterCapability {
    /// Create a client for the given model with a per-request timeout.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DocPilotError::Generation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Override the API base URL (integration tests with a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl GenerationCapability for OpenRouterCapability {
    fn name(&self) -> &str {
        "openrouter"
    }

    #[instrument(skip_all, fields(model = %self.model, kind = %request.kind))]
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: 0.7,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DocPilotError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DocPilotError::Generation(format!(
                "capability returned {status}: {}",
                text.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DocPilotError::Generation(format!("invalid response body: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DocPilotError::Generation("response contained no choices".into()))?;

        debug!("generation call succeeded");

        Ok(GenerationResponse {
            text: choice.message.content,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}
