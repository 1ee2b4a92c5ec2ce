//! Shared test utilities for integration tests
//!
//! Scripted provider, temporary stores, workflow fixtures and XDG environment isolation.

use async_trait::async_trait;
use letterflow::access::Caller;
use letterflow::api::LetterApi;
use letterflow::binding::ReviewerContext;
use letterflow::error::ProviderError;
use letterflow::generation::{DraftRequest, GenerationSettings};
use letterflow::provider::{
    CompletionRequest, CompletionResponse, ModelProviderClient, TokenUsage,
};
use letterflow::request::{ApplicantData, NewLetterRequest};
use letterflow::store::{RequestStore, SledRequestStore};
use letterflow::template::TemplateCatalog;
use letterflow::types::RequestId;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const APPLICANT_EMAIL: &str = "jane@example.edu";
pub const REFEREE_EMAIL: &str = "prof@example.edu";
pub const REFEREE_ID: &str = "referee-1";

/// Provider that replays queued results and records every request it receives.
pub struct ScriptedProvider {
    responses: parking_lot::Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    calls: parking_lot::Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            responses: parking_lot::Mutex::new(VecDeque::new()),
            calls: parking_lot::Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Each call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(self, content: &str) -> Self {
        self.respond_as(content, "")
    }

    /// Queue a reply reporting `model` (empty echoes the requested model).
    pub fn respond_as(self, content: &str, model: &str) -> Self {
        self.responses.lock().push_back(Ok(CompletionResponse {
            content: content.to_string(),
            model: model.to_string(),
            usage: TokenUsage {
                prompt_tokens: 30,
                completion_tokens: 70,
                total_tokens: 100,
            },
            finish_reason: Some("stop".to_string()),
        }));
        self
    }

    pub fn fail(self, error: ProviderError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ModelProviderClient for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let model = request.model.clone();
        self.calls.lock().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Unavailable("script exhausted".to_string())));
        next.map(|mut response| {
            if response.model.is_empty() {
                response.model = model;
            }
            response
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()])
    }
}

/// A workflow API over a fresh temporary store.
pub struct Harness {
    pub api: LetterApi,
    pub store: Arc<dyn RequestStore>,
    pub provider: Arc<ScriptedProvider>,
}

pub fn settings() -> GenerationSettings {
    GenerationSettings {
        timeout: Duration::from_millis(500),
        ..GenerationSettings::default()
    }
}

pub fn harness(provider: ScriptedProvider) -> Harness {
    harness_with(provider, settings())
}

pub fn harness_with(provider: ScriptedProvider, settings: GenerationSettings) -> Harness {
    let store: Arc<dyn RequestStore> = Arc::new(SledRequestStore::temporary().unwrap());
    let provider = Arc::new(provider);
    let api = LetterApi::new(
        store.clone(),
        Arc::new(TemplateCatalog::with_builtin()),
        provider.clone(),
        settings,
    );
    Harness {
        api,
        store,
        provider,
    }
}

pub fn applicant() -> Caller {
    Caller::applicant("applicant-1", APPLICANT_EMAIL)
}

pub fn referee() -> Caller {
    Caller::referee(REFEREE_ID, REFEREE_EMAIL)
}

pub fn new_request() -> NewLetterRequest {
    NewLetterRequest {
        applicant_email: APPLICANT_EMAIL.to_string(),
        referee_email: REFEREE_EMAIL.to_string(),
        template_id: "academic".to_string(),
        applicant: ApplicantData::new("Jane Doe", "MSc Computer Science"),
    }
}

pub fn context() -> ReviewerContext {
    ReviewerContext::new("thesis advisor", "two years", "rigorous, independent")
}

pub fn draft(model: &str) -> DraftRequest {
    DraftRequest {
        template_id: None,
        model_id: model.to_string(),
        context: context(),
    }
}

/// Create a request and have the referee accept it.
pub fn accepted_request(harness: &Harness) -> RequestId {
    let request = harness
        .api
        .create_request(&applicant(), new_request())
        .unwrap();
    harness.api.accept(&referee(), request.id).unwrap();
    request.id
}

/// Accepted request with a first draft already generated (consumes one scripted reply).
pub async fn drafted_request(harness: &Harness) -> RequestId {
    let id = accepted_request(harness);
    harness
        .api
        .generate_draft(&referee(), id, draft("gpt-4o"))
        .await
        .unwrap();
    id
}

static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Run `f` with `XDG_CONFIG_HOME` pointed at `test_dir`, restoring the environment after.
pub fn with_xdg_config_home<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    with_xdg_and_env(test_dir, &[], f)
}

/// Like [`with_xdg_config_home`], also setting extra variables such as `LETTERFLOW__*`.
pub fn with_xdg_and_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let mut originals = vec![("XDG_CONFIG_HOME", std::env::var_os("XDG_CONFIG_HOME"))];
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path());
    for &(key, value) in vars {
        originals.push((key, std::env::var_os(key)));
        std::env::set_var(key, value);
    }

    let result = f();

    for (key, original) in originals {
        match original {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
    result
}
