//! Provider configuration profiles.
//!
//! A profile names a provider type plus its connection details. API keys may be given inline
//! or left to the conventional environment variable for the provider type.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "local")]
    LocalCustom,
}

impl ProviderType {
    /// Environment variable consulted when no key is configured.
    pub fn api_key_env_var(self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some("OPENAI_API_KEY"),
            ProviderType::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderType::Ollama | ProviderType::LocalCustom => None,
        }
    }

    pub fn requires_api_key(self) -> bool {
        matches!(self, ProviderType::OpenAI | ProviderType::Anthropic)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Ollama => "ollama",
            ProviderType::LocalCustom => "local",
        };
        f.write_str(name)
    }
}

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Filled from the configuration key when omitted.
    #[serde(default)]
    pub provider_name: Option<String>,
    pub provider_type: ProviderType,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL override (required for `local`).
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_name: None,
            provider_type,
            api_key: None,
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn display_name(&self) -> String {
        self.provider_name
            .clone()
            .unwrap_or_else(|| self.provider_type.to_string())
    }

    /// Inline key, else the provider's environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.provider_type
                    .api_key_env_var()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|key| !key.trim().is_empty())
            })
    }

    pub fn require_api_key(&self) -> Result<String, ApiError> {
        self.resolve_api_key().ok_or_else(|| {
            let hint = self
                .provider_type
                .api_key_env_var()
                .map(|var| format!(" (set api_key or {})", var))
                .unwrap_or_default();
            ApiError::Config(format!(
                "Provider '{}' requires an API key{}",
                self.display_name(),
                hint
            ))
        })
    }

    /// Static checks only; key presence is checked when a client is built.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let name = self.display_name();
        match &self.endpoint {
            Some(endpoint) => {
                let endpoint = endpoint.trim();
                if endpoint.is_empty() {
                    errors.push(format!("Provider '{}' has an empty endpoint", name));
                } else if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    errors.push(format!(
                        "Provider '{}' endpoint must start with http:// or https://: {}",
                        name, endpoint
                    ));
                }
            }
            None if self.provider_type == ProviderType::LocalCustom => {
                errors.push(format!("Provider '{}' (local) requires an endpoint", name));
            }
            None => {}
        }
        errors
    }
}
