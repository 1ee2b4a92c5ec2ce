//! Letter Workflow API
//!
//! The operation surface exposed to a thin transport layer. Every call takes an already
//! authenticated [`Caller`]; this layer performs only ownership checks.
//!
//! Mutations run through [`update_request`]: load under the request's commit lock, apply,
//! compare-and-swap on the stored revision. Reads go straight to the store and see the last
//! committed record, even while a generation for the same request is in flight.

use crate::access::{Caller, Role};
use crate::concurrency::RequestLockManager;
use crate::error::{ApiError, StateError};
use crate::generation::{
    DraftRequest, GenerationCoordinator, GenerationOutcome, GenerationSettings,
};
use crate::ledger::{HistoryClearance, SnapshotDraft, SnapshotOrigin, VersionSnapshot};
use crate::provider::ModelProviderClient;
use crate::regeneration::RegenerationStrategy;
use crate::render::{
    DocumentRenderer, PlainTextRenderer, RefereeProfile, RenderFormat, RenderMetadata,
    RenderedDocument,
};
use crate::request::{LetterRequest, NewLetterRequest};
use crate::status::RequestStatus;
use crate::store::{load_request, update_request, RequestStore};
use crate::template::TemplateCatalog;
use crate::types::{RequestId, Version};
use std::sync::Arc;
use tracing::info;

/// Model marker recorded on snapshots produced by a manual edit.
pub const MANUAL_EDIT_MODEL: &str = "manual";

/// Letter workflow service
pub struct LetterApi {
    store: Arc<dyn RequestStore>,
    locks: Arc<RequestLockManager>,
    templates: Arc<TemplateCatalog>,
    coordinator: GenerationCoordinator,
    renderer: Arc<dyn DocumentRenderer>,
}

impl LetterApi {
    pub fn new(
        store: Arc<dyn RequestStore>,
        templates: Arc<TemplateCatalog>,
        provider: Arc<dyn ModelProviderClient>,
        settings: GenerationSettings,
    ) -> Self {
        let locks = Arc::new(RequestLockManager::new());
        let coordinator = GenerationCoordinator::new(
            store.clone(),
            locks.clone(),
            templates.clone(),
            provider,
            settings,
        );
        Self {
            store,
            locks,
            templates,
            coordinator,
            renderer: Arc::new(PlainTextRenderer),
        }
    }

    /// Replace the bundled plain text renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    pub fn generation_settings(&self) -> &GenerationSettings {
        self.coordinator.settings()
    }

    fn update<T, F>(&self, request_id: RequestId, mutate: F) -> Result<(LetterRequest, T), ApiError>
    where
        F: FnOnce(&mut LetterRequest) -> Result<T, ApiError>,
    {
        update_request(self.store.as_ref(), &self.locks, request_id, mutate)
    }

    /// Open a new request on behalf of the applicant.
    pub fn create_request(
        &self,
        caller: &Caller,
        input: NewLetterRequest,
    ) -> Result<LetterRequest, ApiError> {
        if caller.role != Role::Applicant
            || !caller
                .email
                .trim()
                .eq_ignore_ascii_case(input.applicant_email.trim())
        {
            return Err(ApiError::Permission(format!(
                "User {} (role: {}) cannot open a request for {}",
                caller.user_id, caller.role, input.applicant_email
            )));
        }
        input.validate()?;
        self.templates.get_or_error(&input.template_id)?;

        let request = LetterRequest::new(self.store.next_id()?, input);
        self.store.insert(&request)?;
        info!(
            request_id = %request.id,
            template_id = %request.template_id,
            "Created letter request"
        );
        Ok(request)
    }

    /// Invited referee accepts: `requested → in_progress`, binding the referee id.
    pub fn accept(&self, caller: &Caller, request_id: RequestId) -> Result<LetterRequest, ApiError> {
        let (request, _) = self.update(request_id, |request| {
            caller.verify_invited_referee(request)?;
            request.transition(RequestStatus::InProgress, &caller.user_id, None)?;
            request.referee_id = Some(caller.user_id.clone());
            Ok(())
        })?;
        info!(request_id = %request_id, referee_id = %caller.user_id, "Request accepted");
        Ok(request)
    }

    /// Invited referee declines: `requested → rejected`. A reason is required.
    pub fn reject(
        &self,
        caller: &Caller,
        request_id: RequestId,
        reason: &str,
    ) -> Result<LetterRequest, ApiError> {
        let reason = reason.trim();
        let (request, _) = self.update(request_id, |request| {
            caller.verify_invited_referee(request)?;
            request.status.transition_to(RequestStatus::Rejected)?;
            if reason.is_empty() {
                return Err(ApiError::Validation(
                    "A rejection reason is required".to_string(),
                ));
            }
            request.transition(RequestStatus::Rejected, &caller.user_id, Some(reason.to_string()))?;
            request.rejection_reason = Some(reason.to_string());
            Ok(())
        })?;
        info!(request_id = %request_id, "Request rejected");
        Ok(request)
    }

    /// Either party cancels a non-terminal request.
    pub fn cancel(
        &self,
        caller: &Caller,
        request_id: RequestId,
        reason: Option<String>,
    ) -> Result<LetterRequest, ApiError> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let (request, _) = self.update(request_id, |request| {
            caller.verify_participant(request)?;
            request.transition(RequestStatus::Canceled, &caller.user_id, reason.clone())?;
            request.cancellation_reason = reason;
            Ok(())
        })?;
        info!(request_id = %request_id, actor = %caller.user_id, "Request canceled");
        Ok(request)
    }

    pub async fn generate_draft(
        &self,
        caller: &Caller,
        request_id: RequestId,
        draft: DraftRequest,
    ) -> Result<GenerationOutcome, ApiError> {
        self.coordinator
            .generate_draft(caller, request_id, draft)
            .await
    }

    pub async fn regenerate(
        &self,
        caller: &Caller,
        request_id: RequestId,
        strategy: RegenerationStrategy,
    ) -> Result<GenerationOutcome, ApiError> {
        self.coordinator
            .regenerate(caller, request_id, strategy)
            .await
    }

    pub fn get_request(
        &self,
        caller: &Caller,
        request_id: RequestId,
    ) -> Result<LetterRequest, ApiError> {
        let request = load_request(self.store.as_ref(), request_id)?;
        caller.verify_participant(&request)?;
        Ok(request)
    }

    /// Requests the caller takes part in, oldest first.
    pub fn list_requests_for(&self, caller: &Caller) -> Result<Vec<LetterRequest>, ApiError> {
        Ok(self
            .store
            .list_all()?
            .into_iter()
            .filter(|request| caller.verify_participant(request).is_ok())
            .collect())
    }

    pub fn list_history(
        &self,
        caller: &Caller,
        request_id: RequestId,
    ) -> Result<Vec<VersionSnapshot>, ApiError> {
        Ok(self.get_request(caller, request_id)?.history)
    }

    pub fn get_version(
        &self,
        caller: &Caller,
        request_id: RequestId,
        version: Version,
    ) -> Result<VersionSnapshot, ApiError> {
        let request = self.get_request(caller, request_id)?;
        Ok(request.verified_snapshot(version)?.clone())
    }

    /// Make `version` current by appending a restoration entry.
    pub fn restore(
        &self,
        caller: &Caller,
        request_id: RequestId,
        version: Version,
    ) -> Result<VersionSnapshot, ApiError> {
        let (_, snapshot) = self.update(request_id, |request| {
            caller.verify_referee(request)?;
            request
                .status
                .ensure("restore a version", RequestStatus::is_editable)?;
            Ok(request.restore_version(version)?.clone())
        })?;
        Ok(snapshot)
    }

    /// Irreversibly discard history; current content becomes the new baseline.
    pub fn clear_history(
        &self,
        caller: &Caller,
        request_id: RequestId,
    ) -> Result<HistoryClearance, ApiError> {
        let (_, clearance) = self.update(request_id, |request| {
            caller.verify_referee(request)?;
            request
                .status
                .ensure("clear history", RequestStatus::is_editable)?;
            Ok(request.clear_history(&caller.user_id))
        })?;
        Ok(clearance)
    }

    /// Replace the content by hand. The edit is recorded as a new version.
    pub fn edit_content(
        &self,
        caller: &Caller,
        request_id: RequestId,
        content: String,
    ) -> Result<VersionSnapshot, ApiError> {
        let (_, snapshot) = self.update(request_id, |request| {
            caller.verify_referee(request)?;
            request
                .status
                .ensure("edit content", RequestStatus::is_editable)?;
            if content.trim().is_empty() {
                return Err(ApiError::Validation(
                    "Edited content cannot be empty".to_string(),
                ));
            }
            Ok(request
                .append_snapshot(SnapshotDraft {
                    origin: SnapshotOrigin::ManualEdit,
                    content,
                    model_used: MANUAL_EDIT_MODEL.to_string(),
                    selected_model: MANUAL_EDIT_MODEL.to_string(),
                    tokens_used: 0,
                    restored_from: None,
                })
                .clone())
        })?;
        info!(
            request_id = %request_id,
            version = snapshot.version,
            content_hash = %snapshot.content_hash,
            "Recorded manual edit"
        );
        Ok(snapshot)
    }

    pub fn submit_for_review(
        &self,
        caller: &Caller,
        request_id: RequestId,
    ) -> Result<LetterRequest, ApiError> {
        self.referee_transition(caller, request_id, RequestStatus::InReview)
    }

    pub fn return_to_draft(
        &self,
        caller: &Caller,
        request_id: RequestId,
    ) -> Result<LetterRequest, ApiError> {
        self.referee_transition(caller, request_id, RequestStatus::Draft)
    }

    /// Finalize: `draft | in_review → completed`. Requires non-empty content.
    ///
    /// Terminal requests fail with a state error; otherwise empty content is reported
    /// before the edge itself is checked.
    pub fn approve(&self, caller: &Caller, request_id: RequestId) -> Result<LetterRequest, ApiError> {
        let (request, _) = self.update(request_id, |request| {
            caller.verify_referee(request)?;
            request
                .status
                .ensure("approve", |status| status != RequestStatus::Requested)?;
            if !request.has_content() {
                return Err(ApiError::Validation(
                    "Cannot approve a letter with empty content".to_string(),
                ));
            }
            request.transition(RequestStatus::Completed, &caller.user_id, None)?;
            Ok(())
        })?;
        info!(
            request_id = %request_id,
            version_count = request.history.len(),
            "Letter approved"
        );
        Ok(request)
    }

    fn referee_transition(
        &self,
        caller: &Caller,
        request_id: RequestId,
        to: RequestStatus,
    ) -> Result<LetterRequest, ApiError> {
        let (request, from) = self.update(request_id, |request| {
            caller.verify_referee(request)?;
            let from = request.status;
            request.transition(to, &caller.user_id, None)?;
            Ok(from)
        })?;
        info!(request_id = %request_id, from = %from, to = %to, "Status changed");
        Ok(request)
    }

    /// Render a completed letter.
    pub fn render(
        &self,
        caller: &Caller,
        request_id: RequestId,
        referee: RefereeProfile,
        format: RenderFormat,
    ) -> Result<RenderedDocument, ApiError> {
        let request = load_request(self.store.as_ref(), request_id)?;
        caller.verify_referee(&request)?;
        if request.status != RequestStatus::Completed {
            return Err(StateError::OperationNotPermitted {
                status: request.status,
                operation: "render",
            }
            .into());
        }
        if !self.renderer.supports(format) {
            return Err(ApiError::Render(format!(
                "No renderer available for format {}",
                format
            )));
        }

        let completed_at = request
            .transitions
            .iter()
            .rev()
            .find(|t| t.to == RequestStatus::Completed)
            .map(|t| t.at)
            .unwrap_or(request.updated_at);
        let metadata = RenderMetadata {
            request_id,
            applicant_name: request.applicant.name.clone(),
            program: request.applicant.program.clone(),
            referee,
            completed_at,
        };
        let bytes = self
            .renderer
            .render(&request.current_content, &metadata, format)?;
        Ok(RenderedDocument {
            format,
            file_name: format!("letter-{}.{}", request_id, format.extension()),
            bytes,
        })
    }
}
