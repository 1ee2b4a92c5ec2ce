//! CLI route: single route table and run context. Dispatches to the workflow API and
//! presentation.

use crate::access::{Caller, Role};
use crate::api::LetterApi;
use crate::binding::ReviewerContext;
use crate::cli::parse::{
    Commands, ContextArgs, IdentityArgs, ProviderCommands, RegenerateCommands,
};
use crate::cli::presentation::{
    format_history_text, format_outcome_text, format_request_list_text, format_request_text,
    format_templates_text, to_json,
};
use crate::config::{ConfigLoader, LetterflowConfig};
use crate::error::ApiError;
use crate::generation::DraftRequest;
use crate::provider::{ModelProviderClient, UnavailableProvider};
use crate::regeneration::RegenerationStrategy;
use crate::render::{RefereeProfile, RenderFormat};
use crate::request::{ApplicantData, NewLetterRequest};
use crate::store::SledRequestStore;
use crate::types::RequestId;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Runtime context for CLI execution: loaded config, store and workflow API.
pub struct RunContext {
    api: LetterApi,
    config: LetterflowConfig,
    provider: Arc<dyn ModelProviderClient>,
    store_path: PathBuf,
}

impl RunContext {
    /// Load configuration and open the store under `workspace_root`.
    pub fn new(workspace_root: &Path, config_path: Option<&Path>) -> Result<Self, ApiError> {
        let config = Self::load_config(workspace_root, config_path)?;
        config.ensure_valid()?;

        let store_path = config.system.storage.resolve_store_path(workspace_root);
        let store = Arc::new(SledRequestStore::new(&store_path)?);
        let templates = Arc::new(config.build_catalog()?);

        // Commands that never call the provider must keep working without one.
        let provider: Arc<dyn ModelProviderClient> = match config.build_provider() {
            Ok(provider) => provider,
            Err(e) => {
                warn!(error = %e, "Generation provider unavailable");
                Arc::new(UnavailableProvider::new(e.to_string()))
            }
        };

        let api = LetterApi::new(
            store,
            templates,
            provider.clone(),
            config.generation.to_settings(),
        );
        info!(store_path = %store_path.display(), "Workspace opened");

        Ok(Self {
            api,
            config,
            provider,
            store_path,
        })
    }

    pub fn load_config(
        workspace_root: &Path,
        config_path: Option<&Path>,
    ) -> Result<LetterflowConfig, ApiError> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(workspace_root)?,
        };
        Ok(config)
    }

    pub fn api(&self) -> &LetterApi {
        &self.api
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(
        &self,
        command: &Commands,
        identity: &IdentityArgs,
        format: &str,
    ) -> Result<String, ApiError> {
        let json = match format {
            "text" => false,
            "json" => true,
            other => {
                return Err(ApiError::Validation(format!(
                    "Unknown output format: {} (use text or json)",
                    other
                )))
            }
        };

        match command {
            Commands::Create {
                name,
                program,
                referee_email,
                template,
                goal,
                achievements,
            } => {
                let caller = caller_from(identity)?;
                let mut applicant = ApplicantData::new(name.clone(), program.clone());
                applicant.goal = goal.clone();
                applicant.achievements = achievements.clone();
                let request = self.api.create_request(
                    &caller,
                    NewLetterRequest {
                        applicant_email: caller.email.clone(),
                        referee_email: referee_email.clone(),
                        template_id: template.clone(),
                        applicant,
                    },
                )?;
                if json {
                    to_json(&request)
                } else {
                    Ok(format!("Created request {}", request.id))
                }
            }
            Commands::Accept { id } => {
                let request = self.api.accept(&caller_from(identity)?, parse_id(id)?)?;
                self.request_output(&request, json)
            }
            Commands::Reject { id, reason } => {
                let request =
                    self.api
                        .reject(&caller_from(identity)?, parse_id(id)?, reason)?;
                self.request_output(&request, json)
            }
            Commands::Cancel { id, reason } => {
                let request =
                    self.api
                        .cancel(&caller_from(identity)?, parse_id(id)?, reason.clone())?;
                self.request_output(&request, json)
            }
            Commands::Generate {
                id,
                model,
                template,
                context,
            } => {
                let model_id = match model {
                    Some(model) => model.clone(),
                    None => self.default_model()?,
                };
                let outcome = self
                    .api
                    .generate_draft(
                        &caller_from(identity)?,
                        parse_id(id)?,
                        DraftRequest {
                            template_id: template.clone(),
                            model_id,
                            context: reviewer_context(context),
                        },
                    )
                    .await?;
                if json {
                    to_json(&outcome.snapshot)
                } else {
                    Ok(format_outcome_text(&outcome))
                }
            }
            Commands::Regenerate { id, strategy } => {
                let strategy = match strategy {
                    RegenerateCommands::Same => RegenerationStrategy::SameSettings,
                    RegenerateCommands::Model { model } => RegenerationStrategy::NewModel {
                        model_id: model.clone(),
                    },
                    RegenerateCommands::Context { context } => RegenerationStrategy::NewContext {
                        context: reviewer_context(context),
                    },
                };
                let outcome = self
                    .api
                    .regenerate(&caller_from(identity)?, parse_id(id)?, strategy)
                    .await?;
                if json {
                    to_json(&outcome.snapshot)
                } else {
                    Ok(format_outcome_text(&outcome))
                }
            }
            Commands::Show { id } => {
                let request = self.api.get_request(&caller_from(identity)?, parse_id(id)?)?;
                self.request_output(&request, json)
            }
            Commands::List => {
                let requests = self.api.list_requests_for(&caller_from(identity)?)?;
                if json {
                    to_json(&requests)
                } else {
                    Ok(format_request_list_text(&requests))
                }
            }
            Commands::History { id } => {
                let history = self.api.list_history(&caller_from(identity)?, parse_id(id)?)?;
                if json {
                    to_json(&history)
                } else {
                    Ok(format_history_text(&history))
                }
            }
            Commands::Version { id, version } => {
                let snapshot =
                    self.api
                        .get_version(&caller_from(identity)?, parse_id(id)?, *version)?;
                if json {
                    to_json(&snapshot)
                } else {
                    Ok(snapshot.content)
                }
            }
            Commands::Restore { id, version } => {
                let snapshot = self
                    .api
                    .restore(&caller_from(identity)?, parse_id(id)?, *version)?;
                if json {
                    to_json(&snapshot)
                } else {
                    Ok(format!(
                        "Restored version {} as version {}",
                        version, snapshot.version
                    ))
                }
            }
            Commands::ClearHistory { id } => {
                let clearance = self
                    .api
                    .clear_history(&caller_from(identity)?, parse_id(id)?)?;
                if json {
                    to_json(&clearance)
                } else {
                    Ok(format!(
                        "Discarded {} versions",
                        clearance.discarded_versions
                    ))
                }
            }
            Commands::Edit { id, content, file } => {
                let content = match (content, file) {
                    (Some(content), _) => content.clone(),
                    (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                        ApiError::Validation(format!("Cannot read {}: {}", path.display(), e))
                    })?,
                    (None, None) => {
                        return Err(ApiError::Validation(
                            "Provide --content or --file".to_string(),
                        ))
                    }
                };
                let snapshot = self
                    .api
                    .edit_content(&caller_from(identity)?, parse_id(id)?, content)?;
                if json {
                    to_json(&snapshot)
                } else {
                    Ok(format!("Saved edit as version {}", snapshot.version))
                }
            }
            Commands::Submit { id } => {
                let request = self
                    .api
                    .submit_for_review(&caller_from(identity)?, parse_id(id)?)?;
                self.request_output(&request, json)
            }
            Commands::ReturnToDraft { id } => {
                let request = self
                    .api
                    .return_to_draft(&caller_from(identity)?, parse_id(id)?)?;
                self.request_output(&request, json)
            }
            Commands::Approve { id } => {
                let request = self.api.approve(&caller_from(identity)?, parse_id(id)?)?;
                self.request_output(&request, json)
            }
            Commands::Render {
                id,
                render_format,
                signature,
                title,
                institution,
                output,
            } => {
                let caller = caller_from(identity)?;
                let format: RenderFormat = render_format.parse().map_err(ApiError::Validation)?;
                let document = self.api.render(
                    &caller,
                    parse_id(id)?,
                    RefereeProfile {
                        name: signature.clone(),
                        title: title.clone(),
                        institution: institution.clone(),
                        email: caller.email.clone(),
                    },
                    format,
                )?;
                match output {
                    Some(path) => {
                        std::fs::write(path, &document.bytes).map_err(|e| {
                            ApiError::Render(format!("Cannot write {}: {}", path.display(), e))
                        })?;
                        Ok(format!("Wrote {} ({} bytes)", path.display(), document.bytes.len()))
                    }
                    None => String::from_utf8(document.bytes).map_err(|_| {
                        ApiError::Render(format!(
                            "{} output is binary; use --output to write {}",
                            document.format, document.file_name
                        ))
                    }),
                }
            }
            Commands::Templates => {
                let templates = self.api.templates().list();
                if json {
                    to_json(&templates)
                } else {
                    Ok(format_templates_text(&templates))
                }
            }
            Commands::Provider { command } => self.execute_provider(command, json).await,
            Commands::ValidateConfig => {
                // Construction already validated; report what was loaded.
                let summary = json!({
                    "valid": true,
                    "providers": self.config.providers.keys().collect::<Vec<_>>(),
                    "generation_provider": self.config.generation.provider,
                    "allowed_models": self.config.generation.allowed_models,
                    "templates": self.api.templates().len(),
                    "store_path": self.store_path,
                });
                if json {
                    to_json(&summary)
                } else {
                    Ok(format!(
                        "Configuration valid: {} provider(s), {} template(s), store at {}",
                        self.config.providers.len(),
                        self.api.templates().len(),
                        self.store_path.display()
                    ))
                }
            }
        }
    }

    async fn execute_provider(
        &self,
        command: &ProviderCommands,
        json: bool,
    ) -> Result<String, ApiError> {
        match command {
            ProviderCommands::Show => {
                let provider = self.config.generation_provider()?;
                if json {
                    to_json(&provider)
                } else {
                    Ok(format!(
                        "{} ({}) endpoint: {}",
                        provider.display_name(),
                        provider.provider_type,
                        provider.endpoint.as_deref().unwrap_or("default")
                    ))
                }
            }
            ProviderCommands::Models => {
                let models = self.provider.list_models().await?;
                if json {
                    to_json(&models)
                } else {
                    Ok(models.join("\n"))
                }
            }
        }
    }

    fn request_output(
        &self,
        request: &crate::request::LetterRequest,
        json: bool,
    ) -> Result<String, ApiError> {
        if json {
            to_json(request)
        } else {
            Ok(format_request_text(request))
        }
    }

    fn default_model(&self) -> Result<String, ApiError> {
        self.config
            .generation
            .model_or_default()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Validation("No model given and none configured".to_string()))
    }
}

/// Build the caller from `--user`, `--email` and `--role`.
pub fn caller_from(identity: &IdentityArgs) -> Result<Caller, ApiError> {
    let user_id = identity
        .user_id
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("--user is required".to_string()))?;
    let email = identity
        .email
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("--email is required".to_string()))?;
    let role: Role = identity
        .role
        .as_deref()
        .ok_or_else(|| ApiError::Validation("--role is required".to_string()))?
        .parse()
        .map_err(ApiError::Validation)?;
    Ok(Caller::new(user_id, email, role))
}

fn parse_id(raw: &str) -> Result<RequestId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("Invalid request id: {}", raw)))
}

fn reviewer_context(args: &ContextArgs) -> ReviewerContext {
    ReviewerContext {
        relationship: args.relationship.clone(),
        duration: args.duration.clone(),
        strengths: args.strengths.clone(),
        examples: args.examples.clone(),
        additional_notes: args.notes.clone(),
    }
}
