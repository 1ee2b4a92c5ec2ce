//! Global config file source: $XDG_CONFIG_HOME/letterflow/config.toml

use crate::config::paths::global_config_path;
use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use tracing::debug;

/// Add the global config file to the builder if it exists.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match global_config_path() {
        Some(path) if path.is_file() => {
            debug!(config_path = %path.display(), "Loading global configuration");
            builder.add_source(File::from(path).required(false))
        }
        Some(path) => {
            debug!(config_path = %path.display(), "No global configuration file");
            builder
        }
        None => builder,
    }
}
