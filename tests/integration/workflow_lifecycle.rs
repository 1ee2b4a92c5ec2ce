//! End-to-end letter workflow: request, accept, generate, regenerate, restore, approve

use super::test_utils::*;
use letterflow::binding::ReviewerContext;
use letterflow::error::{ApiError, ProviderError, StateError};
use letterflow::ledger::SnapshotOrigin;
use letterflow::regeneration::RegenerationStrategy;
use letterflow::render::{RefereeProfile, RenderFormat};
use letterflow::request::{ApplicantData, NewLetterRequest};
use letterflow::status::RequestStatus;

#[tokio::test]
async fn test_jane_doe_end_to_end() {
    let harness = harness(
        ScriptedProvider::new()
            .respond("X1: Jane is an exceptional student.")
            .respond("X2: Jane is a remarkable researcher."),
    );

    let created = harness
        .api
        .create_request(
            &applicant(),
            NewLetterRequest {
                applicant_email: APPLICANT_EMAIL.to_string(),
                referee_email: REFEREE_EMAIL.to_string(),
                template_id: "academic".to_string(),
                applicant: ApplicantData::new("Jane Doe", "MSc CS"),
            },
        )
        .unwrap();
    assert_eq!(created.status, RequestStatus::Requested);
    let id = created.id;

    let accepted = harness.api.accept(&referee(), id).unwrap();
    assert_eq!(accepted.status, RequestStatus::InProgress);
    assert_eq!(accepted.referee_id.as_deref(), Some(REFEREE_ID));

    let first = harness
        .api
        .generate_draft(&referee(), id, draft("gpt-4o"))
        .await
        .unwrap();
    assert_eq!(first.snapshot.version, 1);
    assert_eq!(first.snapshot.content, "X1: Jane is an exceptional student.");
    assert_eq!(first.status, RequestStatus::Draft);

    let second = harness
        .api
        .regenerate(
            &referee(),
            id,
            RegenerationStrategy::NewModel {
                model_id: "gpt-4o-mini".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(second.snapshot.version, 2);
    assert_eq!(second.snapshot.content, "X2: Jane is a remarkable researcher.");
    assert_eq!(second.snapshot.origin, SnapshotOrigin::Regeneration);

    let restored = harness.api.restore(&referee(), id, 1).unwrap();
    assert_eq!(restored.version, 3);
    assert_eq!(restored.origin, SnapshotOrigin::Restoration);
    assert_eq!(restored.restored_from, Some(1));

    let request = harness.api.get_request(&referee(), id).unwrap();
    assert_eq!(request.current_content, "X1: Jane is an exceptional student.");
    assert_eq!(request.current_version, 4);
    assert_eq!(request.status, RequestStatus::Draft);

    let approved = harness.api.approve(&referee(), id).unwrap();
    assert_eq!(approved.status, RequestStatus::Completed);
    assert_eq!(approved.current_content, "X1: Jane is an exceptional student.");

    let err = harness
        .api
        .edit_content(&referee(), id, "one more tweak".to_string())
        .unwrap_err();
    assert!(matches!(err, ApiError::State(_)));
    assert!(matches!(
        harness.api.restore(&referee(), id, 2).unwrap_err(),
        ApiError::State(_)
    ));
    assert!(matches!(
        harness
            .api
            .regenerate(&referee(), id, RegenerationStrategy::SameSettings)
            .await
            .unwrap_err(),
        ApiError::State(_)
    ));

    // Reads stay available after completion.
    assert_eq!(harness.api.list_history(&applicant(), id).unwrap().len(), 3);
}

#[tokio::test]
async fn test_review_round_trip_and_render() {
    let harness = harness(ScriptedProvider::new().respond("Dear committee, Jane is superb."));
    let id = drafted_request(&harness).await;

    let in_review = harness.api.submit_for_review(&referee(), id).unwrap();
    assert_eq!(in_review.status, RequestStatus::InReview);

    // Edits are allowed while in review.
    let edited = harness
        .api
        .edit_content(&referee(), id, "Dear committee, Jane is superb and kind.".to_string())
        .unwrap();
    assert_eq!(edited.origin, SnapshotOrigin::ManualEdit);
    assert_eq!(edited.version, 2);

    let back = harness.api.return_to_draft(&referee(), id).unwrap();
    assert_eq!(back.status, RequestStatus::Draft);

    let profile = RefereeProfile {
        name: "Dr. Ada Smith".to_string(),
        title: Some("Professor".to_string()),
        institution: Some("Example University".to_string()),
        email: REFEREE_EMAIL.to_string(),
    };
    let err = harness
        .api
        .render(&referee(), id, profile.clone(), RenderFormat::Text)
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::State(StateError::OperationNotPermitted { .. })
    ));

    harness.api.approve(&referee(), id).unwrap();
    let document = harness
        .api
        .render(&referee(), id, profile, RenderFormat::Markdown)
        .unwrap();
    assert_eq!(document.file_name, format!("letter-{}.md", id));
    let text = String::from_utf8(document.bytes).unwrap();
    assert!(text.contains("Jane is superb and kind."));
    assert!(text.contains("Dr. Ada Smith"));

    let statuses: Vec<RequestStatus> = harness
        .api
        .get_request(&referee(), id)
        .unwrap()
        .transitions
        .iter()
        .map(|t| t.to)
        .collect();
    assert_eq!(
        statuses,
        vec![
            RequestStatus::InProgress,
            RequestStatus::Draft,
            RequestStatus::InReview,
            RequestStatus::Draft,
            RequestStatus::Completed,
        ]
    );
}

#[tokio::test]
async fn test_approve_requires_content() {
    let harness = harness(ScriptedProvider::new());
    let id = accepted_request(&harness);

    assert!(matches!(
        harness.api.approve(&referee(), id).unwrap_err(),
        ApiError::Validation(_)
    ));
    let request = harness.api.get_request(&referee(), id).unwrap();
    assert_eq!(request.status, RequestStatus::InProgress);
    assert!(request.transitions.iter().all(|t| t.to != RequestStatus::Completed));
}

#[tokio::test]
async fn test_completed_request_refuses_mutation_before_input_checks() {
    let harness = harness(ScriptedProvider::new().respond("Draft"));
    let id = drafted_request(&harness).await;
    harness.api.approve(&referee(), id).unwrap();

    let mut blank = draft("not-a-model");
    blank.context = ReviewerContext::new("", " ", "");
    let err = harness
        .api
        .generate_draft(&referee(), id, blank)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::State(_)));

    let err = harness
        .api
        .edit_content(&referee(), id, "  ".to_string())
        .unwrap_err();
    assert!(matches!(err, ApiError::State(_)));

    assert!(matches!(
        harness.api.approve(&referee(), id).unwrap_err(),
        ApiError::State(StateError::OperationNotPermitted { .. })
    ));
    assert_eq!(harness.provider.calls().len(), 1);
}

#[tokio::test]
async fn test_blank_generation_is_not_recorded() {
    let harness = harness(ScriptedProvider::new().respond("   "));
    let id = accepted_request(&harness);

    // Blank provider output is malformed and never becomes a version.
    let err = harness
        .api
        .generate_draft(&referee(), id, draft("gpt-4o"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Generation(ProviderError::MalformedResponse(_))
    ));
    let request = harness.api.get_request(&referee(), id).unwrap();
    assert_eq!(request.status, RequestStatus::InProgress);
    assert!(request.history.is_empty());
}

#[tokio::test]
async fn test_cancel_is_terminal_for_both_parties() {
    let harness = harness(ScriptedProvider::new().respond("Draft"));
    let id = drafted_request(&harness).await;

    let canceled = harness
        .api
        .cancel(&applicant(), id, Some("Applied elsewhere".to_string()))
        .unwrap();
    assert_eq!(canceled.status, RequestStatus::Canceled);
    assert_eq!(canceled.cancellation_reason.as_deref(), Some("Applied elsewhere"));

    assert!(matches!(
        harness.api.cancel(&referee(), id, None).unwrap_err(),
        ApiError::State(_)
    ));
    assert!(matches!(
        harness.api.clear_history(&referee(), id).unwrap_err(),
        ApiError::State(_)
    ));
    assert_eq!(harness.api.list_history(&referee(), id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_other_referee_cannot_touch_request() {
    let harness = harness(ScriptedProvider::new().respond("Draft"));
    let id = drafted_request(&harness).await;
    let stranger = letterflow::access::Caller::referee("referee-2", "other@example.edu");

    assert!(matches!(
        harness.api.get_request(&stranger, id).unwrap_err(),
        ApiError::Permission(_)
    ));
    assert!(matches!(
        harness.api.restore(&stranger, id, 1).unwrap_err(),
        ApiError::Permission(_)
    ));
    assert!(matches!(
        harness
            .api
            .regenerate(&stranger, id, RegenerationStrategy::SameSettings)
            .await
            .unwrap_err(),
        ApiError::Permission(_)
    ));
    assert!(harness.api.list_requests_for(&stranger).unwrap().is_empty());
    assert_eq!(harness.api.list_requests_for(&applicant()).unwrap().len(), 1);
}
