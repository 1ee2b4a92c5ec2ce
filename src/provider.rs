//! Text-Generation Provider Abstraction
//!
//! Unified interface over the external services that write letter drafts (OpenAI-compatible
//! endpoints, Anthropic, local models via Ollama). The model id travels with every call so
//! one client can serve different models across regenerations. Every failure is reported
//! as a [`ProviderError`] carrying the provider's own cause.

use crate::error::{ApiError, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub mod profile;

pub use profile::{ProviderConfig, ProviderType};

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    fn as_str(self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Completion options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>, // 0.0-2.0
    pub max_tokens: Option<u32>,
}

/// One generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: CompletionOptions,
}

impl CompletionRequest {
    /// Concatenated user messages; the bound prompt in practice.
    pub fn prompt(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    /// Model id as reported by the provider (may differ from the requested alias).
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    /// Generate a completion for `request.model`.
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    fn provider_name(&self) -> &str;

    /// List available models from the provider
    async fn list_models(&self) -> Result<Vec<String>, ProviderError>;
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_provider_http_client() -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {}", e)))
}

// Transport-level failure (no HTTP status received).
fn map_http_error(error: reqwest::Error) -> ProviderError {
    if let Some(status) = error.status() {
        map_status(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        ProviderError::Timeout(PROVIDER_HTTP_REQUEST_TIMEOUT.as_millis() as u64)
    } else if error.is_connect() {
        ProviderError::Unavailable(format!("Connection error: {}", error))
    } else {
        ProviderError::RequestFailed(format!("HTTP error: {}", error))
    }
}

/// Classify a non-success HTTP status using the response body for detail.
pub fn map_status(status: u16, body: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthFailed(body.to_string()),
        402 => ProviderError::QuotaExceeded(body.to_string()),
        429 if body.to_ascii_lowercase().contains("quota") => {
            ProviderError::QuotaExceeded(body.to_string())
        }
        429 => ProviderError::RateLimited(body.to_string()),
        404 => ProviderError::ModelNotFound(body.to_string()),
        500..=599 => ProviderError::Unavailable(format!("status {}: {}", status, body)),
        _ => ProviderError::RequestFailed(format!("status {}: {}", status, body)),
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await.map_err(map_http_error)?;
    if !status.is_success() {
        return Err(map_status(status.as_u16(), &body));
    }
    Ok(body)
}

fn non_empty_content(content: String) -> Result<String, ProviderError> {
    if content.trim().is_empty() {
        return Err(ProviderError::MalformedResponse(
            "Provider returned empty content".to_string(),
        ));
    }
    Ok(content)
}

// OpenAI-compatible API request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    model: String,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Parse an OpenAI-style chat completion body.
pub fn parse_chat_completion(body: &str) -> Result<CompletionResponse, ProviderError> {
    let completion: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {}", e)))?;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".to_string()))?;
    let content = non_empty_content(choice.message.content.unwrap_or_default())?;
    Ok(CompletionResponse {
        content,
        model: completion.model,
        usage: completion.usage.unwrap_or_default(),
        finish_reason: choice.finish_reason,
    })
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
    usage: Option<AnthropicUsage>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Parse an Anthropic messages API body.
pub fn parse_anthropic_completion(body: &str) -> Result<CompletionResponse, ProviderError> {
    let completion: AnthropicResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {}", e)))?;
    let content: String = completion
        .content
        .into_iter()
        .map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");
    let content = non_empty_content(content)?;
    let usage = completion
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        })
        .unwrap_or_default();
    Ok(CompletionResponse {
        content,
        model: completion.model,
        usage,
        finish_reason: completion.stop_reason,
    })
}

/// Client for OpenAI and any OpenAI-compatible endpoint
pub struct OpenAICompatibleClient {
    client: Client,
    name: String,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAICompatibleClient {
    pub fn new(
        name: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, ApiError> {
        let client = build_provider_http_client()?;
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        Ok(Self {
            client,
            name: name.into(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }
}

#[async_trait]
impl ModelProviderClient for OpenAICompatibleClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|msg| OpenAIMessage {
                    role: msg.role.as_str(),
                    content: &msg.content,
                })
                .collect(),
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .authorized(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;

        parse_chat_completion(&read_body(response).await?)
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(map_http_error)?;
        let body = read_body(response).await?;

        #[derive(Deserialize)]
        struct ModelsResponse {
            data: Vec<ModelInfo>,
        }
        #[derive(Deserialize)]
        struct ModelInfo {
            id: String,
        }

        let models: ModelsResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse models response: {}", e))
        })?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}

/// Anthropic messages API client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, ApiError> {
        let client = build_provider_http_client()?;
        let base_url = base_url.unwrap_or_else(|| "https://api.anthropic.com/v1".to_string());
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ModelProviderClient for AnthropicClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect();

        let mut body = json!({
            "model": request.model,
            "max_tokens": request.options.max_tokens.unwrap_or(1024),
            "messages": messages,
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n"));
        }
        if let Some(temp) = request.options.temperature {
            body["temperature"] = json!(temp);
        }

        let url = format!("{}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;

        parse_anthropic_completion(&read_body(response).await?)
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::RequestFailed(
            "Anthropic API does not provide a models list endpoint".to_string(),
        ))
    }
}

/// Ollama client (local models, OpenAI-compatible chat endpoint)
pub struct OllamaClient {
    chat: OpenAICompatibleClient,
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>) -> Result<Self, ApiError> {
        let base_url = base_url
            .unwrap_or_else(|| "http://localhost:11434".to_string())
            .trim_end_matches('/')
            .to_string();
        let chat =
            OpenAICompatibleClient::new("ollama", None, Some(format!("{}/v1", base_url)))?;
        Ok(Self {
            chat,
            client: build_provider_http_client()?,
            base_url,
        })
    }
}

#[async_trait]
impl ModelProviderClient for OllamaClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.chat.complete(request).await
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await.map_err(map_http_error)?;
        let body = read_body(response).await?;

        #[derive(Deserialize)]
        struct TagsResponse {
            models: Vec<ModelInfo>,
        }
        #[derive(Deserialize)]
        struct ModelInfo {
            name: String,
        }

        let tags: TagsResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse models response: {}", e))
        })?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

/// Stand-in used when no provider could be built; every call fails as `Unavailable`.
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ModelProviderClient for UnavailableProvider {
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        Err(ProviderError::Unavailable(self.reason.clone()))
    }

    fn provider_name(&self) -> &str {
        "unavailable"
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::Unavailable(self.reason.clone()))
    }
}

/// Provider factory for creating provider clients
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        config: &ProviderConfig,
    ) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(ApiError::Config(problems.join("; ")));
        }
        let client: Arc<dyn ModelProviderClient> = match config.provider_type {
            ProviderType::OpenAI => Arc::new(OpenAICompatibleClient::new(
                "openai",
                Some(config.require_api_key()?),
                config.endpoint.clone(),
            )?),
            ProviderType::Anthropic => Arc::new(AnthropicClient::new(
                config.require_api_key()?,
                config.endpoint.clone(),
            )?),
            ProviderType::Ollama => {
                Arc::new(OllamaClient::new(config.endpoint.clone())?)
            }
            ProviderType::LocalCustom => Arc::new(OpenAICompatibleClient::new(
                config.display_name(),
                config.resolve_api_key(),
                config.endpoint.clone(),
            )?),
        };
        Ok(client)
    }
}
