//! Entry points for loading [`LetterflowConfig`].

use super::merge::merge_policy::builder_with_defaults;
use super::sources::{global_file, workspace_file};
use super::LetterflowConfig;
use config::{ConfigError, Environment, File};
use std::path::Path;
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the layered configuration for a workspace.
    ///
    /// Lowest to highest: defaults, global file, workspace files, `LETTERFLOW__*` variables.
    pub fn load(workspace_root: &Path) -> Result<LetterflowConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder);
        let builder = workspace_file::add_to_builder(builder, workspace_root);
        let builder = builder.add_source(Self::environment());

        let config: LetterflowConfig = builder.build()?.try_deserialize()?;
        debug!(
            providers = config.providers.len(),
            templates = config.templates.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load a single file over the defaults, ignoring every other source.
    pub fn load_from_file(path: &Path) -> Result<LetterflowConfig, ConfigError> {
        builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    /// `LETTERFLOW__GENERATION__TIMEOUT_SECS=30`, `LETTERFLOW__GENERATION__ALLOWED_MODELS=a,b`
    fn environment() -> Environment {
        Environment::with_prefix("LETTERFLOW")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("generation.allowed_models")
    }
}
