#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    classify::{classify, classify_transport},
    error::{CompletionError, ErrorKind},
};

/// Version header required by the Anthropic messages API.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Maximum completion tokens requested from the Anthropic messages API.
const ANTHROPIC_MAX_TOKENS: u32 = 2000;

/// The AI vendors this crate knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Google Gemini, over the `generativelanguage` REST API.
    Gemini,
    /// Anthropic Claude, over the messages REST API.
    Anthropic,
    /// OpenAI chat completions, through `async-openai`.
    OpenAi,
}

impl ProviderKind {
    /// Parses a provider name as it appears in the fallback order.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(ProviderKind::Gemini),
            "anthropic" => Some(ProviderKind::Anthropic),
            "openai" => Some(ProviderKind::OpenAi),
            _ => None,
        }
    }

    /// Returns the canonical configuration name for this provider.
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Returns the model identifier used when configuration does not override
    /// it.
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::Anthropic => "claude-3-opus-20240229",
            ProviderKind::OpenAi => "gpt-4o-mini",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Immutable description of one configured provider: its identity, credential
/// (if any), model identifier, and declared position in the fallback order.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// Which vendor this descriptor names.
    pub kind:       ProviderKind,
    /// The API key, when one was configured.
    pub credential: Option<String>,
    /// The model identifier requests will name.
    pub model:      String,
    /// Zero-based position in the configured fallback order.
    pub position:   usize,
}

impl ProviderDescriptor {
    /// Returns true when a credential is present and non-empty.
    pub fn has_credential(&self) -> bool {
        self.credential
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

/// A single vendor bound to one model and one credential. Implementations
/// issue exactly one network request per `complete` call and report expected
/// failure modes as classified errors; retries belong to the orchestrator.
#[async_trait]
pub trait ProviderClient: std::fmt::Debug + Send + Sync {
    /// Identifies the vendor behind this client.
    fn kind(&self) -> ProviderKind;

    /// Returns the model identifier this client requests.
    fn model(&self) -> &str;

    /// Produces a completion for the given prompt, or a classified failure.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Google Gemini client over the `generativelanguage` REST API.
#[derive(Debug)]
pub struct GeminiClient {
    /// Model identifier interpolated into the endpoint path.
    model:   String,
    /// API key sent as a query parameter.
    api_key: String,
    /// Shared HTTP client with the request timeout applied.
    http:    reqwest::Client,
}

impl GeminiClient {
    /// Creates a Gemini client for the given model and credential.
    pub fn new(model: String, api_key: String, http: reqwest::Client) -> Self {
        Self {
            model,
            api_key,
            http,
        }
    }

    /// Pulls the vendor diagnostic out of a Gemini error body, falling back to
    /// the raw body when it is not the documented shape.
    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")?
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| body.to_owned())
    }
}

#[async_trait]
impl ProviderClient for GeminiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                CompletionError::new(ProviderKind::Gemini, classify_transport(&e), e.to_string())
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            CompletionError::new(ProviderKind::Gemini, classify_transport(&e), e.to_string())
        })?;

        if !(200..300).contains(&status) {
            let message = Self::error_message(&text);
            let kind = classify(ProviderKind::Gemini, Some(status), &message);
            return Err(CompletionError::new(
                ProviderKind::Gemini,
                kind,
                format!("HTTP {status}: {message}"),
            ));
        }

        let parsed: Value = serde_json::from_str(&text).map_err(|e| {
            CompletionError::new(
                ProviderKind::Gemini,
                ErrorKind::Unclassified,
                format!("unparseable response body: {e}"),
            )
        })?;

        let pieces: Vec<&str> = parsed
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        if pieces.is_empty() {
            // A 200 with no text parts usually means the response was blocked.
            let reason = parsed
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .unwrap_or("no text parts in response");
            return Err(CompletionError::new(
                ProviderKind::Gemini,
                classify(ProviderKind::Gemini, None, reason),
                reason.to_owned(),
            ));
        }

        Ok(pieces.concat())
    }
}

/// Subset of the Anthropic messages response this crate reads.
#[derive(Deserialize)]
struct AnthropicResponse {
    /// Content blocks returned by the model.
    content: Vec<AnthropicContent>,
}

/// One content block of an Anthropic response.
#[derive(Deserialize)]
struct AnthropicContent {
    /// Text payload; absent for non-text blocks.
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Claude client over the messages REST API.
#[derive(Debug)]
pub struct AnthropicClient {
    /// Model identifier sent in the request body.
    model:   String,
    /// API key sent in the `x-api-key` header.
    api_key: String,
    /// Shared HTTP client with the request timeout applied.
    http:    reqwest::Client,
}

impl AnthropicClient {
    /// Creates an Anthropic client for the given model and credential.
    pub fn new(model: String, api_key: String, http: reqwest::Client) -> Self {
        Self {
            model,
            api_key,
            http,
        }
    }

    /// Pulls `error.type` and `error.message` out of an Anthropic error body.
    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                let err = v.get("error")?;
                let kind = err.get("type").and_then(Value::as_str).unwrap_or("error");
                let message = err.get("message").and_then(Value::as_str).unwrap_or("");
                Some(format!("{kind}: {message}"))
            })
            .unwrap_or_else(|| body.to_owned())
    }
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = json!({
            "model": self.model,
            "max_tokens": ANTHROPIC_MAX_TOKENS,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                CompletionError::new(ProviderKind::Anthropic, classify_transport(&e), e.to_string())
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            CompletionError::new(ProviderKind::Anthropic, classify_transport(&e), e.to_string())
        })?;

        if !(200..300).contains(&status) {
            let message = Self::error_message(&text);
            let kind = classify(ProviderKind::Anthropic, Some(status), &message);
            return Err(CompletionError::new(
                ProviderKind::Anthropic,
                kind,
                format!("HTTP {status}: {message}"),
            ));
        }

        let parsed: AnthropicResponse = serde_json::from_str(&text).map_err(|e| {
            CompletionError::new(
                ProviderKind::Anthropic,
                ErrorKind::Unclassified,
                format!("unparseable response body: {e}"),
            )
        })?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| {
                CompletionError::new(
                    ProviderKind::Anthropic,
                    ErrorKind::Unclassified,
                    "no text block in response",
                )
            })
    }
}

/// OpenAI chat-completions client backed by `async-openai`.
#[derive(Debug)]
pub struct OpenAiClient {
    /// Model identifier sent with each request.
    model:  String,
    /// Configured `async-openai` client.
    client: OpenAIClient<OpenAIConfig>,
}

impl OpenAiClient {
    /// Creates an OpenAI client for the given model and credential.
    pub fn new(model: String, api_key: String) -> Self {
        let client = OpenAIClient::with_config(OpenAIConfig::new().with_api_key(api_key));
        Self { model, client }
    }

    /// Converts an `async-openai` error into a classified completion error.
    fn classify_sdk_error(err: OpenAIError) -> CompletionError {
        match err {
            OpenAIError::Reqwest(e) => {
                CompletionError::new(ProviderKind::OpenAi, classify_transport(&e), e.to_string())
            }
            OpenAIError::ApiError(api) => {
                // Debug formatting keeps the error type and code visible to
                // the message rules.
                let message = format!("{api:?}");
                let kind = classify(ProviderKind::OpenAi, None, &message);
                CompletionError::new(ProviderKind::OpenAi, kind, message)
            }
            other => {
                CompletionError::new(ProviderKind::OpenAi, ErrorKind::Unclassified, other.to_string())
            }
        }
    }
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let messages = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_owned())
                .build()
                .map_err(Self::classify_sdk_error)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(messages)
            .build()
            .map_err(Self::classify_sdk_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(Self::classify_sdk_error)?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                CompletionError::new(
                    ProviderKind::OpenAi,
                    ErrorKind::Unclassified,
                    "no content in response",
                )
            })
    }
}
