//! Workspace config file source: config/config.toml and config/{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use std::path::Path;

pub const ENV_NAME_VAR: &str = "LETTERFLOW_ENV";

/// Add workspace config files to builder.
/// Precedence: config/config.toml (base) then config/{LETTERFLOW_ENV}.toml.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> ConfigBuilder<DefaultState> {
    let config_dir = workspace_root.join("config");
    let env_name = std::env::var(ENV_NAME_VAR).unwrap_or_else(|_| "development".to_string());

    let mut builder = builder;
    for path in [
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", env_name)),
    ] {
        if path.is_file() {
            builder = builder.add_source(File::from(path).required(false));
        }
    }
    builder
}
