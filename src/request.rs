//! Letter request records.

use crate::binding::ReviewerContext;
use crate::error::{ApiError, StateError};
use crate::ledger::{HistoryClearance, VersionSnapshot};
use crate::status::{RequestStatus, StatusTransition};
use crate::types::{RequestId, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured data about the applicant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantData {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub achievements: Option<String>,
}

impl ApplicantData {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            goal: None,
            achievements: None,
        }
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn with_achievements(mut self, achievements: impl Into<String>) -> Self {
        self.achievements = Some(achievements.into());
        self
    }
}

/// Input for opening a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLetterRequest {
    pub applicant_email: String,
    /// Email of the referee the applicant is asking
    pub referee_email: String,
    pub template_id: String,
    pub applicant: ApplicantData,
}

impl NewLetterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut problems = Vec::new();
        if self.applicant.name.trim().is_empty() {
            problems.push("applicant name is required");
        }
        if self.applicant.program.trim().is_empty() {
            problems.push("program is required");
        }
        if !looks_like_email(&self.applicant_email) {
            problems.push("applicant email is invalid");
        }
        if !looks_like_email(&self.referee_email) {
            problems.push("referee email is invalid");
        }
        if self.template_id.trim().is_empty() {
            problems.push("template id is required");
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(problems.join("; ")))
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

/// Settings of the most recent successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub template_id: String,
    pub model_id: String,
    pub context: ReviewerContext,
    pub tokens_used: u32,
}

/// A letter request and its full version history.
///
/// `current_version` is the number the next snapshot will receive, so
/// `current_version == history.len() + 1` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterRequest {
    pub id: RequestId,
    pub status: RequestStatus,
    pub applicant_email: String,
    pub referee_email: String,
    pub applicant: ApplicantData,
    /// Bound when the referee accepts.
    pub referee_id: Option<String>,
    pub template_id: String,
    pub current_content: String,
    pub current_version: Version,
    pub generation_parameters: Option<GenerationParameters>,
    pub history: Vec<VersionSnapshot>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub transitions: Vec<StatusTransition>,
    pub clearances: Vec<HistoryClearance>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every committed write; used for optimistic concurrency.
    pub revision: u64,
}

impl LetterRequest {
    pub fn new(id: RequestId, input: NewLetterRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: RequestStatus::Requested,
            applicant_email: input.applicant_email.trim().to_string(),
            referee_email: input.referee_email.trim().to_string(),
            applicant: input.applicant,
            referee_id: None,
            template_id: input.template_id,
            current_content: String::new(),
            current_version: 1,
            generation_parameters: None,
            history: Vec::new(),
            rejection_reason: None,
            cancellation_reason: None,
            transitions: Vec::new(),
            clearances: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// Move to `to` if the edge is legal, recording the transition.
    pub fn transition(
        &mut self,
        to: RequestStatus,
        actor: &str,
        reason: Option<String>,
    ) -> Result<(), StateError> {
        let from = self.status;
        self.status = from.transition_to(to)?;
        self.transitions.push(StatusTransition {
            from,
            to,
            at: Utc::now(),
            actor: actor.to_string(),
            reason,
        });
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn has_content(&self) -> bool {
        !self.current_content.trim().is_empty()
    }

    pub fn version_invariant_holds(&self) -> bool {
        self.current_version as usize == self.history.len() + 1
    }
}
