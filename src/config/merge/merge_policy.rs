//! Merge rules: defaults, override order, conflict handling.
//!
//! Scalars get builder defaults so every layer can override them by key. Lists
//! (`generation.allowed_models`) are left to serde defaults because the config crate merges
//! arrays element by element, which would splice a shorter override into the default list.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("system.storage.store_path", ".letterflow/store")?
        .set_default("generation.timeout_secs", 60)?
        .set_default("generation.default_max_tokens", 1024)?
        .set_default("generation.default_temperature", 0.7)
}
