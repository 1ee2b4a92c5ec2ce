//! Configuration System
//!
//! Layered configuration for providers, generation defaults, templates, storage and logging.
//! Values merge from built-in defaults, the global config file, workspace files and
//! `LETTERFLOW__*` environment variables, then get checked as a whole by
//! [`LetterflowConfig::validate`].

use crate::error::ApiError;
use crate::generation::GenerationSettings;
use crate::logging::LoggingConfig;
use crate::provider::{ModelProviderClient, ProviderFactory};
use crate::template::{Template, TemplateCatalog};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge;
mod paths;
mod sources;

pub use facade::ConfigLoader;
pub use paths::{config_home, global_config_path};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LetterflowConfig {
    /// Model provider configurations, keyed by name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Generation defaults and the model allow-list
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Extra templates, keyed by id (merged over the built-in set)
    #[serde(default)]
    pub templates: HashMap<String, Template>,

    /// System-wide settings
    #[serde(default)]
    pub system: SystemConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Name of the entry in `providers` used for generation.
    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    #[serde(default = "default_allowed_models")]
    pub allowed_models: Vec<String>,

    /// Model used by the CLI when none is given on the command line.
    #[serde(default)]
    pub default_model: Option<String>,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_allowed_models() -> Vec<String> {
    GenerationSettings::default().allowed_models
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: None,
            timeout_secs: default_timeout_secs(),
            default_max_tokens: default_max_tokens(),
            default_temperature: default_temperature(),
            allowed_models: default_allowed_models(),
            default_model: None,
        }
    }
}

impl GenerationConfig {
    pub fn to_settings(&self) -> GenerationSettings {
        GenerationSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            default_max_tokens: self.default_max_tokens,
            default_temperature: self.default_temperature,
            allowed_models: self.allowed_models.clone(),
        }
    }

    /// Configured default model, else the first allowed one.
    pub fn model_or_default(&self) -> Option<&str> {
        self.default_model
            .as_deref()
            .or_else(|| self.allowed_models.first().map(String::as_str))
    }
}

/// System-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled database directory, relative paths resolve against the workspace root.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".letterflow/store")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

impl StorageConfig {
    pub fn resolve_store_path(&self, workspace_root: &Path) -> PathBuf {
        if self.store_path.is_absolute() {
            self.store_path.clone()
        } else {
            workspace_root.join(&self.store_path)
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Provider(String, String),
    Generation(String),
    Template(String, String),
    System(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(name, msg) => write!(f, "Provider '{}': {}", name, msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Template(name, msg) => write!(f, "Template '{}': {}", name, msg),
            ValidationError::System(msg) => write!(f, "System: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl LetterflowConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (name, provider) in &self.providers {
            for problem in provider.validate() {
                errors.push(ValidationError::Provider(name.clone(), problem));
            }
        }

        let generation = &self.generation;
        if let Some(provider) = &generation.provider {
            if !self.providers.contains_key(provider) {
                errors.push(ValidationError::Generation(format!(
                    "provider '{}' is not declared under [providers]",
                    provider
                )));
            }
        }
        if generation.allowed_models.is_empty() {
            errors.push(ValidationError::Generation(
                "allowed_models cannot be empty".to_string(),
            ));
        }
        if generation.timeout_secs == 0 {
            errors.push(ValidationError::Generation(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&generation.default_temperature) {
            errors.push(ValidationError::Generation(format!(
                "default_temperature {} is outside 0.0-2.0",
                generation.default_temperature
            )));
        }
        if let Some(model) = &generation.default_model {
            if !generation.allowed_models.contains(model) {
                errors.push(ValidationError::Generation(format!(
                    "default_model '{}' is not in allowed_models",
                    model
                )));
            }
        }

        for (name, template) in &self.templates {
            let mut template = template.clone();
            if template.id.is_empty() {
                template.id = name.clone();
            }
            if let Err(e) = template.validate() {
                errors.push(ValidationError::Template(name.clone(), e));
            }
        }

        if self.system.storage.store_path.as_os_str().is_empty() {
            errors.push(ValidationError::System("Store path cannot be empty".to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold every problem into one `ApiError::Config`.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::Config(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })
    }

    /// Built-in templates with configured ones layered on top.
    pub fn build_catalog(&self) -> Result<TemplateCatalog, ApiError> {
        let mut catalog = TemplateCatalog::with_builtin();
        catalog.load_from_config(&self.templates)?;
        Ok(catalog)
    }

    /// The provider named by `generation.provider`.
    pub fn generation_provider(&self) -> Result<ProviderConfig, ApiError> {
        let name = self.generation.provider.as_deref().ok_or_else(|| {
            ApiError::Config("No generation provider configured (set generation.provider)".to_string())
        })?;
        let mut provider = self
            .providers
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::Config(format!("Provider '{}' is not declared", name)))?;
        if provider.provider_name.is_none() {
            provider.provider_name = Some(name.to_string());
        }
        Ok(provider)
    }

    pub fn build_provider(&self) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        ProviderFactory::create_client(&self.generation_provider()?)
    }
}
