//! The SQLite-backed worklist: open/migrate, import, fetch, save.

use pretty_assertions::assert_eq;
use proofdesk_core::wire::RawWorklistItem;
use proofdesk_core::{
    ApiError, DecisionDraft, DecisionType, LocalStore, ReviewSession, SaveOutcome, Transition,
    WorklistApi,
};
use serde_json::json;

fn temp_db_path() -> std::path::PathBuf {
    let dir = tempfile::TempDir::new().unwrap();
    dir.keep().join("review.db")
}

fn exported_item() -> RawWorklistItem {
    serde_json::from_value(json!({
        "id": 12,
        "article_id": 340,
        "title": "Harbour reopening",
        "content": "<p>The harbour will reopen on monday.</p>",
        "status": "proofreading_review",
        "proofreading_issues": [
            { "id": "cap-1", "original_text": "monday", "suggested_text": "Monday", "rule_category": "capitalisation" },
            { "id": 2, "evidence": "will reopen", "suggestion": "reopens", "category": "style" }
        ],
        "proofreading_stats": { "total_issues": 2 }
    }))
    .unwrap()
}

#[tokio::test]
async fn open_is_idempotent_and_migrates_once() {
    let path = temp_db_path();
    let first = LocalStore::open(&path).await.unwrap();
    first.import_item(&exported_item()).await.unwrap();
    drop(first);

    let reopened = LocalStore::open(&path).await.unwrap();
    assert_eq!(reopened.item_status(12).await.unwrap().as_deref(), Some("proofreading_review"));
}

#[tokio::test]
async fn missing_item_is_not_found() {
    let store = LocalStore::open(temp_db_path()).await.unwrap();
    assert_eq!(store.fetch_item(404).await.unwrap_err(), ApiError::NotFound(404));
    assert_eq!(store.item_status(404).await.unwrap(), None);
}

#[tokio::test]
async fn imported_item_round_trips_through_both_wire_shapes() {
    let store = LocalStore::open(temp_db_path()).await.unwrap();
    store.import_item(&exported_item()).await.unwrap();

    let item = store.fetch_item(12).await.unwrap();
    assert_eq!(item.title, "Harbour reopening");
    assert_eq!(item.article_id, Some(340));
    let ids: Vec<&str> = item.issues.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["cap-1", "2"]);
    assert_eq!(item.issues[1].suggestion(), Some("reopens"));
    assert_eq!(item.stats.total_issues, 2);
    assert!(item.persisted.is_empty());
}

#[tokio::test]
async fn full_review_through_the_local_store() {
    let store = LocalStore::open(temp_db_path()).await.unwrap();
    store.import_item(&exported_item()).await.unwrap();

    let mut session = ReviewSession::new(12);
    proofdesk_core::session::load_with(&mut session, &store).await;
    {
        let review = session.review_mut().unwrap();
        review.decide("cap-1", DecisionDraft::accept()).unwrap();
        review.decide("2", DecisionDraft::reject().with_rationale("house style")).unwrap();
    }
    let outcome = proofdesk_core::session::save_with(&mut session, &store, None).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { saved: 2, closed: None, .. }));

    // A later verdict on the same issue supersedes the earlier one.
    session.review_mut().unwrap().decide("2", DecisionDraft::accept()).unwrap();
    let outcome =
        proofdesk_core::session::save_with(&mut session, &store, Some(Transition::ReadyToPublish))
            .await
            .unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { closed: Some(Transition::ReadyToPublish), .. }));
    assert!(session.is_closed());

    assert_eq!(store.submission_count(12).await.unwrap(), 2);
    assert_eq!(store.item_status(12).await.unwrap().as_deref(), Some("ready_to_publish"));

    let reloaded = store.fetch_item(12).await.unwrap();
    assert_eq!(reloaded.persisted["cap-1"].decision_type, DecisionType::Accepted);
    assert_eq!(reloaded.persisted["2"].decision_type, DecisionType::Accepted);
    assert_eq!(reloaded.persisted["2"].decision_rationale, None);
}

#[tokio::test]
async fn reimport_replaces_content_but_keeps_history() {
    let store = LocalStore::open(temp_db_path()).await.unwrap();
    let mut raw = exported_item();
    raw.proofreading_decisions = serde_json::from_value(json!([
        { "issue_id": "cap-1", "decision_type": "rejected", "decision_rationale": "proper noun" }
    ]))
    .unwrap();
    store.import_item(&raw).await.unwrap();

    raw.title = Some("Harbour reopens".to_owned());
    raw.proofreading_decisions.clear();
    store.import_item(&raw).await.unwrap();

    let item = store.fetch_item(12).await.unwrap();
    assert_eq!(item.title, "Harbour reopens");
    assert_eq!(item.persisted["cap-1"].decision_rationale.as_deref(), Some("proper noun"));
    assert_eq!(store.submission_count(12).await.unwrap(), 1);
}

#[tokio::test]
async fn import_skips_decisions_it_cannot_read() {
    let store = LocalStore::open(temp_db_path()).await.unwrap();
    let mut raw = exported_item();
    raw.proofreading_decisions = vec![
        json!({ "issue_id": "cap-1", "decision_type": "pending" }),
        json!({ "issue_id": "2", "decision_type": "accepted" }),
    ];
    store.import_item(&raw).await.unwrap();

    let item = store.fetch_item(12).await.unwrap();
    assert_eq!(item.persisted.len(), 1);
    assert_eq!(item.persisted["2"].decision_type, DecisionType::Accepted);
}
