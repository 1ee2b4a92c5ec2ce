//! At most one generation per request; other operations interleave safely

use super::test_utils::*;
use letterflow::error::{ApiError, ErrorKind};
use letterflow::ledger::SnapshotOrigin;
use letterflow::regeneration::RegenerationStrategy;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_second_generation_conflicts() {
    let harness = harness(
        ScriptedProvider::new()
            .respond("only draft")
            .respond("never used")
            .with_delay(Duration::from_millis(100)),
    );
    let id = accepted_request(&harness);
    let caller = referee();

    let (first, second) = tokio::join!(
        harness.api.generate_draft(&caller, id, draft("gpt-4o")),
        harness.api.generate_draft(&caller, id, draft("gpt-4o-mini")),
    );

    let results = [first, second];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(ApiError::Conflict(_))))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(harness.provider.calls().len(), 1);

    let request = harness.api.get_request(&caller, id).unwrap();
    assert_eq!(request.history.len(), 1);
    assert_eq!(request.current_version, 2);
}

#[tokio::test]
async fn test_conflict_spans_strategies_and_tasks() {
    let harness = Arc::new(harness(
        ScriptedProvider::new()
            .respond("v1")
            .respond("v2")
            .respond("v3")
            .with_delay(Duration::from_millis(150)),
    ));
    let id = drafted_request(&harness).await;

    let background = {
        let harness = harness.clone();
        tokio::spawn(async move {
            harness
                .api
                .regenerate(&referee(), id, RegenerationStrategy::SameSettings)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    let err = harness
        .api
        .regenerate(
            &referee(),
            id,
            RegenerationStrategy::NewModel {
                model_id: "gpt-4o-mini".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.is_retryable());

    let outcome = background.await.unwrap().unwrap();
    assert_eq!(outcome.snapshot.version, 2);

    // Once the first finishes, the next regeneration goes through.
    let next = harness
        .api
        .regenerate(&referee(), id, RegenerationStrategy::SameSettings)
        .await
        .unwrap();
    assert_eq!(next.snapshot.version, 3);
}

#[tokio::test]
async fn test_generations_on_different_requests_run_in_parallel() {
    let harness = harness(
        ScriptedProvider::new()
            .respond("letter a")
            .respond("letter b")
            .with_delay(Duration::from_millis(100)),
    );
    let a = accepted_request(&harness);
    let b = accepted_request(&harness);
    let caller = referee();

    let (first, second) = tokio::join!(
        harness.api.generate_draft(&caller, a, draft("gpt-4o")),
        harness.api.generate_draft(&caller, b, draft("gpt-4o")),
    );
    assert_eq!(first.unwrap().snapshot.version, 1);
    assert_eq!(second.unwrap().snapshot.version, 1);
}

#[tokio::test]
async fn test_restore_during_generation_is_not_lost() {
    let harness = Arc::new(harness(
        ScriptedProvider::new()
            .respond("first")
            .respond("second")
            .respond("third")
            .with_delay(Duration::from_millis(20)),
    ));
    let id = drafted_request(&harness).await;
    harness
        .api
        .regenerate(&referee(), id, RegenerationStrategy::SameSettings)
        .await
        .unwrap();

    let slow = {
        let harness = harness.clone();
        tokio::spawn(async move {
            harness
                .api
                .regenerate(&referee(), id, RegenerationStrategy::SameSettings)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    // Reads and restores proceed while the provider call is outstanding.
    let during = harness.api.get_request(&referee(), id).unwrap();
    assert_eq!(during.current_version, 3);
    let restored = harness.api.restore(&referee(), id, 1).unwrap();
    assert_eq!(restored.version, 3);

    let outcome = slow.await.unwrap().unwrap();
    assert_eq!(outcome.snapshot.version, 4);

    let request = harness.api.get_request(&referee(), id).unwrap();
    let origins: Vec<SnapshotOrigin> = request.history.iter().map(|s| s.origin).collect();
    assert_eq!(
        origins,
        vec![
            SnapshotOrigin::Generation,
            SnapshotOrigin::Regeneration,
            SnapshotOrigin::Restoration,
            SnapshotOrigin::Regeneration,
        ]
    );
    assert_eq!(request.current_content, "third");
    assert!(request.version_invariant_holds());
}
