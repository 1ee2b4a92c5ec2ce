//! Integration tests for layered configuration loading

use super::test_utils::{with_xdg_and_env, with_xdg_config_home};
use letterflow::config::{global_config_path, ConfigLoader, ProviderType, ValidationError};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(path: PathBuf, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_defaults_without_any_files() {
    let xdg = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    let config = with_xdg_config_home(&xdg, || ConfigLoader::load(workspace.path())).unwrap();
    assert!(config.providers.is_empty());
    assert_eq!(config.generation.timeout_secs, 60);
    assert_eq!(config.generation.default_max_tokens, 1024);
    assert_eq!(config.generation.allowed_models, vec!["gpt-4o", "gpt-4o-mini"]);
    assert_eq!(
        config.system.storage.store_path,
        PathBuf::from(".letterflow/store")
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_global_file_is_read_from_xdg_config_home() {
    let xdg = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        xdg.path().join("letterflow").join("config.toml"),
        r#"
[providers.openai]
provider_type = "openai"
api_key = "sk-test"

[generation]
provider = "openai"
timeout_secs = 45
"#,
    );

    let (config, path) = with_xdg_config_home(&xdg, || {
        (ConfigLoader::load(workspace.path()).unwrap(), global_config_path())
    });
    assert_eq!(path, Some(xdg.path().join("letterflow").join("config.toml")));
    assert_eq!(config.generation.timeout_secs, 45);
    let provider = config.generation_provider().unwrap();
    assert_eq!(provider.provider_type, ProviderType::OpenAI);
    assert_eq!(provider.display_name(), "openai");
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let xdg = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        xdg.path().join("letterflow").join("config.toml"),
        r#"
[generation]
timeout_secs = 45
default_max_tokens = 800
allowed_models = ["gpt-4o", "gpt-4o-mini", "claude-3-5-sonnet"]
"#,
    );
    write(
        workspace.path().join("config").join("config.toml"),
        r#"
[generation]
timeout_secs = 20
allowed_models = ["llama3"]

[system.storage]
store_path = "letters"
"#,
    );

    let config = with_xdg_config_home(&xdg, || ConfigLoader::load(workspace.path())).unwrap();
    assert_eq!(config.generation.timeout_secs, 20);
    assert_eq!(config.generation.default_max_tokens, 800);
    assert_eq!(config.generation.allowed_models, vec!["llama3"]);
    assert_eq!(config.system.storage.store_path, PathBuf::from("letters"));
}

#[test]
fn test_environment_overrides_files() {
    let xdg = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        workspace.path().join("config").join("config.toml"),
        "[generation]\ntimeout_secs = 20\n",
    );

    let config = with_xdg_and_env(
        &xdg,
        &[
            ("LETTERFLOW__GENERATION__TIMEOUT_SECS", "5"),
            ("LETTERFLOW__GENERATION__ALLOWED_MODELS", "gpt-4o,llama3"),
        ],
        || ConfigLoader::load(workspace.path()),
    )
    .unwrap();
    assert_eq!(config.generation.timeout_secs, 5);
    assert_eq!(config.generation.allowed_models, vec!["gpt-4o", "llama3"]);
}

#[test]
fn test_templates_from_file_extend_catalog() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("letterflow.toml");
    fs::write(
        &path,
        r#"
[templates.fellowship]
category = "scholarship"
prompt_skeleton = "Recommend {{applicant_name}} for the {{program}} fellowship. Strengths: {{strengths}}."

[templates.fellowship.default_parameters]
system_prompt = "You write concise fellowship letters."
max_tokens = 600
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    let catalog = config.build_catalog().unwrap();
    let template = catalog.get("fellowship").unwrap();
    assert_eq!(template.default_parameters.max_tokens, Some(600));
    assert!(catalog.contains("academic"));
}

#[test]
fn test_validation_reports_every_problem() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("letterflow.toml");
    fs::write(
        &path,
        r#"
[generation]
provider = "nowhere"
timeout_secs = 0
allowed_models = []

[providers.self-hosted]
provider_type = "local"

[templates.broken]
prompt_skeleton = "Hello {{nickname}}"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    let errors = config.validate().unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, ValidationError::Provider(name, _) if name == "self-hosted")));
    assert!(errors
        .iter()
        .any(|e| matches!(e, ValidationError::Template(name, msg) if name == "broken" && msg.contains("nickname"))));
    let generation = errors
        .iter()
        .filter(|e| matches!(e, ValidationError::Generation(_)))
        .count();
    assert_eq!(generation, 3);
}

#[test]
fn test_malformed_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("letterflow.toml");
    fs::write(&path, "[generation\ntimeout_secs = ").unwrap();

    let err = ConfigLoader::load_from_file(&path).unwrap_err();
    let api_error: letterflow::error::ApiError = err.into();
    assert_eq!(api_error.kind(), letterflow::error::ErrorKind::Config);
}
