//! Regeneration Strategy Selection
//!
//! Regeneration re-runs generation for a request that has already produced a draft. The
//! caller picks exactly one strategy; each is resolved against the request's last-used
//! generation parameters into the effective (template, model, context) triple that the
//! generation coordinator then runs. Resolution is pure: it never touches the store.

use crate::binding::ReviewerContext;
use crate::error::ApiError;
use crate::ledger::SnapshotOrigin;
use crate::request::LetterRequest;
use serde::{Deserialize, Serialize};

/// Regeneration payload, discriminated by its `type` field.
///
/// ```json
/// {"type": "same_settings"}
/// {"type": "new_model", "model_id": "gpt-4o"}
/// {"type": "new_context", "context": {"relationship": "...", "duration": "...", "strengths": "..."}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegenerationStrategy {
    /// Reuse the last template, model and context verbatim.
    SameSettings,
    /// Keep template and context; swap the model.
    NewModel { model_id: String },
    /// Keep template and model; replace the reviewer context.
    NewContext { context: ReviewerContext },
}

impl RegenerationStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            RegenerationStrategy::SameSettings => "same_settings",
            RegenerationStrategy::NewModel { .. } => "new_model",
            RegenerationStrategy::NewContext { .. } => "new_context",
        }
    }
}

/// Fully resolved settings for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub template_id: String,
    pub model_id: String,
    pub context: ReviewerContext,
    pub origin: SnapshotOrigin,
}

/// Check a model id against the configured allow-list.
pub fn validate_model_id(model_id: &str, allowed_models: &[String]) -> Result<(), ApiError> {
    if allowed_models.iter().any(|allowed| allowed == model_id) {
        return Ok(());
    }
    Err(ApiError::Validation(format!(
        "Unknown model id '{}' (allowed: {})",
        model_id,
        allowed_models.join(", ")
    )))
}

/// Resolve `strategy` against the request's last-used generation parameters.
pub fn resolve_strategy(
    request: &LetterRequest,
    strategy: &RegenerationStrategy,
    allowed_models: &[String],
) -> Result<EffectiveSettings, ApiError> {
    let last = request.generation_parameters.as_ref().ok_or_else(|| {
        ApiError::Validation(format!(
            "Request {} has no previous generation to regenerate from",
            request.id
        ))
    })?;

    let (model_id, context) = match strategy {
        RegenerationStrategy::SameSettings => (last.model_id.clone(), last.context.clone()),
        RegenerationStrategy::NewModel { model_id } => {
            validate_model_id(model_id, allowed_models)?;
            (model_id.clone(), last.context.clone())
        }
        RegenerationStrategy::NewContext { context } => {
            context.validate_required()?;
            (last.model_id.clone(), context.clone())
        }
    };

    Ok(EffectiveSettings {
        template_id: last.template_id.clone(),
        model_id,
        context,
        origin: SnapshotOrigin::Regeneration,
    })
}
