use pretty_assertions::assert_eq;
use proofdesk_core::{DecisionDraft, DecisionError, DecisionStore, DecisionType};

fn store() -> DecisionStore {
    DecisionStore::for_issues(["i1", "i2", "i3"])
}

#[test]
fn later_decisions_overwrite_earlier_ones() {
    let mut store = store();
    store.add_decision("i1", DecisionDraft::accept()).unwrap();
    store.add_decision("i1", DecisionDraft::reject().with_rationale("house style")).unwrap();

    assert_eq!(store.len(), 1);
    let decision = store.get("i1").unwrap();
    assert_eq!(decision.decision_type, DecisionType::Rejected);
    assert_eq!(decision.decision_rationale.as_deref(), Some("house style"));
}

#[test]
fn missing_type_defaults_to_accepted() {
    let mut store = store();
    let draft = DecisionDraft { rationale: Some("fine".to_owned()), ..DecisionDraft::default() };
    assert_eq!(store.add_decision("i2", draft).unwrap().decision_type, DecisionType::Accepted);
}

#[test]
fn unknown_issue_is_refused() {
    let mut store = store();
    assert_eq!(
        store.add_decision("nope", DecisionDraft::accept()).unwrap_err(),
        DecisionError::UnknownIssue("nope".to_owned())
    );
    assert!(store.is_empty());
}

#[test]
fn modified_requires_content() {
    let mut store = store();
    assert!(matches!(
        store.add_decision("i1", DecisionDraft::modify("   ")),
        Err(DecisionError::MissingModifiedContent(_))
    ));
    assert!(store.add_decision("i1", DecisionDraft::modify("the")).is_ok());
}

#[test]
fn feedback_marks_decision_as_feedback_provided() {
    let mut store = store();
    let decision = store
        .add_decision("i3", DecisionDraft::reject().with_feedback(Some("false_positive".to_owned()), ""))
        .unwrap();
    assert!(decision.feedback_provided);
    assert_eq!(decision.feedback_notes, None);
}

#[test]
fn batch_applies_one_verdict_to_every_id() {
    let mut store = store();
    store.add_decision("i1", DecisionDraft::modify("x")).unwrap();
    let count = store.batch_decision(["i1", "i2", "i3"], DecisionType::Accepted).unwrap();

    assert_eq!(count, 3);
    assert_eq!(store.count_of(DecisionType::Accepted), 3);
    assert!(store.iter().all(|(_, d)| d.modified_content.is_none()));
}

#[test]
fn batch_validates_before_writing() {
    let mut store = store();
    assert_eq!(
        store.batch_decision(["i1", "ghost"], DecisionType::Rejected),
        Err(DecisionError::UnknownIssue("ghost".to_owned()))
    );
    assert!(store.is_empty());
    assert_eq!(store.batch_decision(std::iter::empty::<&str>(), DecisionType::Rejected), Err(DecisionError::EmptyBatch));
    assert_eq!(
        store.batch_decision(["i1"], DecisionType::Modified),
        Err(DecisionError::InvalidBatchDecision)
    );
}

#[test]
fn clear_removes_entries() {
    let mut store = store();
    store.batch_decision(["i1", "i2"], DecisionType::Rejected).unwrap();
    assert!(store.clear_decision("i1").is_some());
    assert!(store.clear_decision("i1").is_none());
    assert_eq!(store.clear_all(), 1);
    assert!(store.is_empty());
}

#[test]
fn acknowledge_keeps_entries_changed_after_submission() {
    let mut store = store();
    store.add_decision("i1", DecisionDraft::accept()).unwrap();
    store.add_decision("i2", DecisionDraft::accept()).unwrap();
    let submitted = store.to_payloads();

    store.add_decision("i2", DecisionDraft::reject()).unwrap();
    assert_eq!(store.acknowledge(&submitted), 1);
    assert_eq!(store.get("i2").map(|d| d.decision_type), Some(DecisionType::Rejected));
    assert!(store.get("i1").is_none());
}

#[test]
fn reconcile_drops_vanished_issues() {
    let mut store = store();
    store.batch_decision(["i1", "i3"], DecisionType::Accepted).unwrap();
    let dropped = store.reconcile(["i1", "i2"]);
    assert_eq!(dropped, vec!["i3".to_owned()]);
    assert!(store.add_decision("i3", DecisionDraft::accept()).is_err());
}

#[test]
fn payloads_serialize_with_flattened_decision_fields() {
    let mut store = store();
    store.add_decision("i1", DecisionDraft::reject().with_rationale("intentional")).unwrap();
    let json = serde_json::to_value(store.to_payloads()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "issue_id": "i1",
            "decision_type": "rejected",
            "decision_rationale": "intentional",
            "feedback_provided": false
        }])
    );
}
