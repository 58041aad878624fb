use std::time::Duration;

use forkdiff_core::{ForkdiffError, LlmConfig};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// A message in a chat conversation with the LLM.
///
/// # Examples
///
/// ```
/// use forkdiff_review::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage::user("代码差异:\n...");
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use forkdiff_review::llm::Role;
///
/// let role = Role::System;
/// assert_eq!(serde_json::to_string(&role).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
}

/// What came back from one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// The answer text.
    pub content: String,
    /// Chain-of-thought text, for providers that return `reasoning_content`.
    pub reasoning: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

/// OpenAI-compatible chat completions client.
///
/// Works with any provider that exposes a `chat/completions` endpoint:
/// OpenAI, DeepSeek, Ollama, vLLM, etc. One request per call, no retries.
///
/// # Examples
///
/// ```
/// use forkdiff_core::LlmConfig;
/// use forkdiff_review::llm::LlmClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap();
/// assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new client using the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ForkdiffError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, ForkdiffError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ForkdiffError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Return the model name from the configuration.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Full URL of the completions endpoint.
    ///
    /// A base URL that already ends in `/v1` is used as is.
    pub fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    /// Send a chat completion request and return the reply.
    ///
    /// # Errors
    ///
    /// Returns [`ForkdiffError::Llm`] on transport errors, non-success
    /// statuses, or a response without `choices[0].message.content`.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatReply, ForkdiffError> {
        let url = self.endpoint();
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
        };

        let mut request = self.client.post(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        tracing::debug!(%url, model = %self.config.model, "sending chat completion");
        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| ForkdiffError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ForkdiffError::Llm(format!(
                "LLM API error {status}: {body_text}"
            )));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ForkdiffError::Llm(format!("failed to parse response: {e}")))?;

        parse_reply(&response_body)
    }
}

fn parse_reply(body: &serde_json::Value) -> Result<ChatReply, ForkdiffError> {
    let message = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"));

    let content = message
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| ForkdiffError::Llm(format!("unexpected response structure: {body}")))?;

    let reasoning = message
        .and_then(|m| m.get("reasoning_content"))
        .and_then(|r| r.as_str())
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    Ok(ChatReply {
        content: content.to_string(),
        reasoning,
    })
}
