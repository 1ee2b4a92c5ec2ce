//! Version history: restore, clear, manual edits and integrity checks

use super::test_utils::*;
use letterflow::error::{ApiError, ErrorKind, StorageError};
use letterflow::ledger::SnapshotOrigin;
use letterflow::regeneration::RegenerationStrategy;
use letterflow::store::RequestStore;

async fn three_versions(harness: &Harness) -> letterflow::types::RequestId {
    let id = drafted_request(harness).await;
    for _ in 0..2 {
        harness
            .api
            .regenerate(&referee(), id, RegenerationStrategy::SameSettings)
            .await
            .unwrap();
    }
    id
}

#[tokio::test]
async fn test_restore_appends_and_never_rewrites() {
    let harness = harness(ScriptedProvider::new().respond("A").respond("B").respond("C"));
    let id = three_versions(&harness).await;
    let before = harness.api.list_history(&referee(), id).unwrap();

    let restored = harness.api.restore(&referee(), id, 2).unwrap();
    assert_eq!(restored.version, 4);
    assert_eq!(restored.content, "B");
    assert_eq!(restored.origin, SnapshotOrigin::Restoration);
    assert_eq!(restored.restored_from, Some(2));
    assert_eq!(restored.content_hash, before[1].content_hash);

    let request = harness.api.get_request(&referee(), id).unwrap();
    assert_eq!(request.current_content, "B");
    assert_eq!(request.current_version, 5);
    assert_eq!(&request.history[..3], &before[..]);

    // Restoring a restoration is just another append.
    let again = harness.api.restore(&referee(), id, 4).unwrap();
    assert_eq!(again.version, 5);
    assert_eq!(again.restored_from, Some(4));
    assert_eq!(again.content, "B");
}

#[tokio::test]
async fn test_restore_unknown_version_is_not_found() {
    let harness = harness(ScriptedProvider::new().respond("A"));
    let id = drafted_request(&harness).await;

    for version in [0, 2, 99] {
        let err = harness.api.restore(&referee(), id, version).unwrap_err();
        assert!(matches!(err, ApiError::VersionNotFound { version: v, .. } if v == version));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
    assert_eq!(harness.api.get_request(&referee(), id).unwrap().current_version, 2);
}

#[tokio::test]
async fn test_clear_history_resets_baseline() {
    let harness = harness(ScriptedProvider::new().respond("A").respond("B").respond("C").respond("D"));
    let id = three_versions(&harness).await;

    let clearance = harness.api.clear_history(&referee(), id).unwrap();
    assert_eq!(clearance.discarded_versions, 3);
    assert_eq!(clearance.actor, REFEREE_ID);

    let request = harness.api.get_request(&referee(), id).unwrap();
    assert!(request.history.is_empty());
    assert_eq!(request.current_version, 1);
    assert_eq!(request.current_content, "C");
    assert_eq!(request.clearances.len(), 1);

    // Discarded versions are gone for good.
    assert!(matches!(
        harness.api.get_version(&referee(), id, 1).unwrap_err(),
        ApiError::VersionNotFound { .. }
    ));

    // Numbering restarts at 1.
    let next = harness
        .api
        .regenerate(&referee(), id, RegenerationStrategy::SameSettings)
        .await
        .unwrap();
    assert_eq!(next.snapshot.version, 1);
    assert_eq!(next.current_version, 2);
}

#[tokio::test]
async fn test_manual_edits_are_restorable_versions() {
    let harness = harness(ScriptedProvider::new().respond("Generated text"));
    let id = drafted_request(&harness).await;

    let edited = harness
        .api
        .edit_content(&referee(), id, "Hand polished text".to_string())
        .unwrap();
    assert_eq!(edited.version, 2);
    assert_eq!(edited.origin, SnapshotOrigin::ManualEdit);
    assert_eq!(edited.model_used, letterflow::api::MANUAL_EDIT_MODEL);
    assert_eq!(edited.tokens_used, 0);

    assert!(matches!(
        harness
            .api
            .edit_content(&referee(), id, "   ".to_string())
            .unwrap_err(),
        ApiError::Validation(_)
    ));

    harness.api.restore(&referee(), id, 1).unwrap();
    let restored_edit = harness.api.restore(&referee(), id, 2).unwrap();
    assert_eq!(restored_edit.content, "Hand polished text");
    assert_eq!(restored_edit.version, 4);
}

#[tokio::test]
async fn test_applicant_reads_but_cannot_mutate_history() {
    let harness = harness(ScriptedProvider::new().respond("A"));
    let id = drafted_request(&harness).await;

    let snapshot = harness.api.get_version(&applicant(), id, 1).unwrap();
    assert_eq!(snapshot.content, "A");

    for err in [
        harness.api.restore(&applicant(), id, 1).unwrap_err(),
        harness.api.clear_history(&applicant(), id).unwrap_err(),
        harness
            .api
            .edit_content(&applicant(), id, "sneaky".to_string())
            .unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::Permission);
    }
}

#[tokio::test]
async fn test_tampered_snapshot_fails_integrity_check() {
    let harness = harness(ScriptedProvider::new().respond("Original"));
    let id = drafted_request(&harness).await;

    let mut record = harness.store.get(id).unwrap().unwrap();
    let revision = record.revision;
    record.history[0].content = "Tampered".to_string();
    record.revision = revision + 1;
    harness.store.commit(&record, revision).unwrap();

    let err = harness.api.get_version(&referee(), id, 1).unwrap_err();
    assert!(matches!(
        err,
        ApiError::Storage(StorageError::Corrupted { version: 1, .. })
    ));
    assert!(matches!(
        harness.api.restore(&referee(), id, 1).unwrap_err(),
        ApiError::Storage(StorageError::Corrupted { .. })
    ));
}
