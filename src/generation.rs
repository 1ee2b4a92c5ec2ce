//! Generation Coordinator
//!
//! Runs one provider call for a request and commits the result as a new version.
//!
//! The call sequence is:
//! 1. check caller and status against the stored record;
//! 2. claim the request's generation slot (a concurrent second attempt gets `Conflict`);
//! 3. bind the prompt and call the provider under a timeout, holding no lock;
//! 4. re-load under the commit lock, re-check status, append the snapshot and commit.
//!
//! Nothing is written before step 4, so a provider failure, a timeout or a dropped future
//! leaves the stored request exactly as it was.

use crate::access::Caller;
use crate::binding::{bind_prompt, ReviewerContext};
use crate::concurrency::{GenerationPermit, RequestLockManager};
use crate::error::{ApiError, ProviderError};
use crate::ledger::{SnapshotDraft, SnapshotOrigin, VersionSnapshot};
use crate::provider::{ChatMessage, CompletionOptions, CompletionRequest, ModelProviderClient};
use crate::regeneration::{resolve_strategy, validate_model_id, EffectiveSettings, RegenerationStrategy};
use crate::request::{GenerationParameters, LetterRequest};
use crate::status::RequestStatus;
use crate::store::{load_request, update_request, RequestStore};
use crate::template::TemplateCatalog;
use crate::types::{RequestId, Version};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Global generation limits and defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    /// Upper bound on one provider call.
    pub timeout: Duration,
    pub default_max_tokens: u32,
    pub default_temperature: f32,
    /// Model ids callers may select.
    pub allowed_models: Vec<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            default_max_tokens: 1024,
            default_temperature: 0.7,
            allowed_models: vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
        }
    }
}

/// Input to a first (or repeated) draft generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRequest {
    /// Defaults to the template chosen when the request was created.
    #[serde(default)]
    pub template_id: Option<String>,
    pub model_id: String,
    pub context: ReviewerContext,
}

/// Result of a committed generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub snapshot: VersionSnapshot,
    pub status: RequestStatus,
    pub current_version: Version,
}

pub struct GenerationCoordinator {
    store: Arc<dyn RequestStore>,
    locks: Arc<RequestLockManager>,
    templates: Arc<TemplateCatalog>,
    provider: Arc<dyn ModelProviderClient>,
    settings: GenerationSettings,
}

impl GenerationCoordinator {
    pub fn new(
        store: Arc<dyn RequestStore>,
        locks: Arc<RequestLockManager>,
        templates: Arc<TemplateCatalog>,
        provider: Arc<dyn ModelProviderClient>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            store,
            locks,
            templates,
            provider,
            settings,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Generate a draft with an explicitly chosen model and reviewer context.
    pub async fn generate_draft(
        &self,
        caller: &Caller,
        request_id: RequestId,
        draft: DraftRequest,
    ) -> Result<GenerationOutcome, ApiError> {
        let request = load_request(self.store.as_ref(), request_id)?;
        caller.verify_referee(&request)?;
        request
            .status
            .ensure("generate a draft", RequestStatus::accepts_generation)?;
        validate_model_id(&draft.model_id, &self.settings.allowed_models)?;
        draft.context.validate_required()?;
        let permit = self.begin(request_id)?;

        let settings = EffectiveSettings {
            template_id: draft
                .template_id
                .unwrap_or_else(|| request.template_id.clone()),
            model_id: draft.model_id,
            context: draft.context,
            origin: SnapshotOrigin::Generation,
        };
        self.run(caller, &request, settings, &permit).await
    }

    /// Regenerate under one of the three strategies.
    pub async fn regenerate(
        &self,
        caller: &Caller,
        request_id: RequestId,
        strategy: RegenerationStrategy,
    ) -> Result<GenerationOutcome, ApiError> {
        let request = load_request(self.store.as_ref(), request_id)?;
        caller.verify_referee(&request)?;
        request
            .status
            .ensure("regenerate", RequestStatus::accepts_generation)?;
        let settings = resolve_strategy(&request, &strategy, &self.settings.allowed_models)?;
        let permit = self.begin(request_id)?;

        debug!(
            request_id = %request_id,
            strategy = strategy.name(),
            model_id = %settings.model_id,
            "Resolved regeneration strategy"
        );
        self.run(caller, &request, settings, &permit).await
    }

    fn begin(&self, request_id: RequestId) -> Result<GenerationPermit<'_>, ApiError> {
        self.locks.try_begin_generation(request_id).ok_or_else(|| {
            warn!(request_id = %request_id, "Generation already in flight");
            ApiError::Conflict(format!(
                "A generation is already in progress for request {}",
                request_id
            ))
        })
    }

    async fn run(
        &self,
        caller: &Caller,
        request: &LetterRequest,
        settings: EffectiveSettings,
        permit: &GenerationPermit<'_>,
    ) -> Result<GenerationOutcome, ApiError> {
        let request_id = permit.request_id();
        let template = self.templates.get_or_error(&settings.template_id)?;
        let prompt = bind_prompt(template, &request.applicant, &settings.context)?;
        debug!(
            request_id = %request_id,
            template_id = %template.id,
            prompt_len = prompt.len(),
            "Bound prompt"
        );

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &template.default_parameters.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(prompt));
        let completion = CompletionRequest {
            model: settings.model_id.clone(),
            messages,
            options: CompletionOptions {
                max_tokens: Some(
                    template
                        .default_parameters
                        .max_tokens
                        .unwrap_or(self.settings.default_max_tokens),
                ),
                temperature: Some(
                    template
                        .default_parameters
                        .temperature
                        .unwrap_or(self.settings.default_temperature),
                ),
            },
        };

        let response =
            match tokio::time::timeout(self.settings.timeout, self.provider.complete(completion))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    warn!(
                        request_id = %request_id,
                        provider = self.provider.provider_name(),
                        model_id = %settings.model_id,
                        error = %err,
                        "Provider call failed"
                    );
                    return Err(err.into());
                }
                Err(_) => {
                    let err = ProviderError::Timeout(self.settings.timeout.as_millis() as u64);
                    warn!(
                        request_id = %request_id,
                        provider = self.provider.provider_name(),
                        model_id = %settings.model_id,
                        "Provider call timed out"
                    );
                    return Err(err.into());
                }
            };

        if response.content.trim().is_empty() {
            warn!(
                request_id = %request_id,
                provider = self.provider.provider_name(),
                "Provider returned empty content"
            );
            return Err(ProviderError::MalformedResponse("empty completion content".to_string()).into());
        }

        let model_used = if response.model.trim().is_empty() {
            settings.model_id.clone()
        } else {
            response.model
        };
        let tokens_used = response.usage.total_tokens;
        let origin = settings.origin;
        let parameters = GenerationParameters {
            template_id: settings.template_id,
            model_id: settings.model_id.clone(),
            context: settings.context,
            tokens_used,
        };
        let draft = SnapshotDraft {
            origin,
            content: response.content,
            model_used,
            selected_model: settings.model_id,
            tokens_used,
            restored_from: None,
        };

        let (committed, snapshot) =
            update_request(self.store.as_ref(), &self.locks, request_id, |request| {
                // The request may have moved on while the provider call was running.
                request
                    .status
                    .ensure("commit a generated draft", RequestStatus::accepts_generation)?;
                if request.status == RequestStatus::InProgress {
                    request.transition(RequestStatus::Draft, &caller.user_id, None)?;
                }
                let snapshot = request.append_snapshot(draft).clone();
                request.generation_parameters = Some(parameters);
                Ok(snapshot)
            })?;

        info!(
            request_id = %request_id,
            version = snapshot.version,
            origin = %origin,
            model_used = %snapshot.model_used,
            tokens_used,
            content_hash = %snapshot.content_hash,
            "Appended generated version"
        );
        Ok(GenerationOutcome {
            snapshot,
            status: committed.status,
            current_version: committed.current_version,
        })
    }
}
