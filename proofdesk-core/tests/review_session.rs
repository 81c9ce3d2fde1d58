//! Session lifecycle against a stub worklist API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use proofdesk_core::session::{load_with, save_with, Placement};
use proofdesk_core::wire::parse_item;
use proofdesk_core::{
    ApiError, CacheKey, DecisionDraft, DecisionType, LeaveCheck, ReviewCommand, ReviewSession,
    SaveAck, SaveDecisionsRequest, SaveOutcome, SessionError, SessionState, Transition, ViewMode,
    WorklistApi, WorklistId, WorklistItem,
};
use serde_json::json;

struct StubApi {
    item: Result<WorklistItem, ApiError>,
    save_result: Result<SaveAck, ApiError>,
    save_calls: AtomicUsize,
    saved: Mutex<Vec<SaveDecisionsRequest>>,
}

impl StubApi {
    fn serving(item: WorklistItem) -> Self {
        Self {
            item: Ok(item),
            save_result: Ok(SaveAck::default()),
            save_calls: AtomicUsize::new(0),
            saved: Mutex::new(Vec::new()),
        }
    }

    fn failing_saves(mut self, error: ApiError) -> Self {
        self.save_result = Err(error);
        self
    }
}

#[async_trait]
impl WorklistApi for StubApi {
    async fn fetch_item(&self, _worklist_id: WorklistId) -> Result<WorklistItem, ApiError> {
        self.item.clone()
    }

    async fn save_decisions(
        &self,
        _worklist_id: WorklistId,
        request: &SaveDecisionsRequest,
    ) -> Result<SaveAck, ApiError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.saved.lock().unwrap().push(request.clone());
        self.save_result.clone()
    }
}

fn article() -> WorklistItem {
    parse_item(
        &json!({
            "id": 7,
            "article_id": 99,
            "title": "Council vote",
            "content": "<p>Teh council voted on teh budget yesterday.</p>",
            "proofreading_issues": [
                { "id": "i1", "original_text": "Teh", "suggested_text": "The", "position": { "start": 0, "end": 3 } },
                { "id": "i2", "original_text": "teh", "suggested_text": "the", "position": { "start": 2, "end": 5 } },
                { "id": "i3", "original_text": "teh budget", "suggested_text": "the budget", "position": { "start": 21, "end": 31 } },
                { "id": "i4", "original_text": "budget", "suggested_text": "budgets" },
                { "id": "i5", "original_text": "Thursday", "suggested_text": "Friday" }
            ]
        })
        .to_string(),
    )
    .unwrap()
}

async fn loaded(api: &StubApi) -> ReviewSession {
    let mut session = ReviewSession::new(7);
    load_with(&mut session, api).await;
    session
}

#[tokio::test]
async fn load_selects_first_issue_and_lays_out_highlights() {
    let api = StubApi::serving(article());
    let session = loaded(&api).await;
    let review = session.review().expect("reviewing");

    assert_eq!(review.selected_issue().map(|i| i.id.as_str()), Some("i1"));
    assert!(matches!(review.placement("i1"), Some(Placement::Highlighted(_))));
    // i2's stored offsets are stale; the search finds "teh" inside "teh budget".
    assert!(matches!(review.placement("i2"), Some(Placement::Hidden(_))));
    assert!(matches!(review.placement("i3"), Some(Placement::Highlighted(_))));
    assert!(matches!(review.placement("i4"), Some(Placement::Hidden(_))));
    assert_eq!(review.placement("i5"), Some(&Placement::Unresolved));
    assert_eq!(review.kept_positions().len(), 2);
    assert_eq!(review.suggested_content().as_deref(), Some("The council voted on the budget yesterday."));
}

#[tokio::test]
async fn empty_issue_list_is_a_terminal_empty_state() {
    let mut item = article();
    item.issues.clear();
    let api = StubApi::serving(item);
    let mut session = loaded(&api).await;

    assert!(matches!(session.state(), SessionState::Empty { .. }));
    assert!(session.review().is_none());
    assert_eq!(session.begin_save(None), Err(SessionError::NotReviewing));
}

#[tokio::test]
async fn missing_article_and_fetch_failures_are_errors() {
    let mut item = article();
    item.article_id = None;
    let session = loaded(&StubApi::serving(item)).await;
    assert!(matches!(session.state(), SessionState::Error { .. }));

    let mut api = StubApi::serving(article());
    api.item = Err(ApiError::Status { status: 404, message: "Worklist item not found".to_owned() });
    let session = loaded(&api).await;
    match session.state() {
        SessionState::Error { message, .. } => assert_eq!(message, "Worklist item not found"),
        other => panic!("expected error state, got {}", other.label()),
    }
}

#[tokio::test]
async fn keyboard_accept_then_next() {
    let api = StubApi::serving(article());
    let mut session = loaded(&api).await;
    let review = session.review_mut().unwrap();

    assert!(review.apply(ReviewCommand::Accept));
    assert!(review.apply(ReviewCommand::SelectNext));

    assert_eq!(review.decisions().get("i1").map(|d| d.decision_type), Some(DecisionType::Accepted));
    assert_eq!(review.selected_issue().map(|i| i.id.as_str()), Some("i2"));
}

#[tokio::test]
async fn selection_does_not_wrap() {
    let api = StubApi::serving(article());
    let mut session = loaded(&api).await;
    let review = session.review_mut().unwrap();

    assert!(!review.apply(ReviewCommand::SelectPrevious));
    assert_eq!(review.selected_index(), Some(0));
    assert!(review.select_last());
    assert!(!review.apply(ReviewCommand::SelectNext));
    assert_eq!(review.selected_index(), Some(4));
}

#[tokio::test]
async fn save_with_no_decisions_sends_nothing() {
    let api = StubApi::serving(article());
    let mut session = loaded(&api).await;

    let result = save_with(&mut session, &api, None).await;
    assert_eq!(result, Err(SessionError::NothingToSave));
    assert_eq!(api.save_calls.load(Ordering::SeqCst), 0);
    assert!(matches!(session.state(), SessionState::Reviewing(_)));
}

#[tokio::test]
async fn failed_save_preserves_decisions() {
    let api = StubApi::serving(article())
        .failing_saves(ApiError::Status { status: 409, message: "Item is locked".to_owned() });
    let mut session = loaded(&api).await;
    {
        let review = session.review_mut().unwrap();
        review.decide("i1", DecisionDraft::accept()).unwrap();
        review.decide("i3", DecisionDraft::reject()).unwrap();
    }
    let before = session.review().unwrap().decisions().clone();

    let outcome = save_with(&mut session, &api, Some(Transition::ReadyToPublish)).await.unwrap();
    match outcome {
        SaveOutcome::Failed { notice } => assert!(notice.message.contains("Item is locked")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(session.review().unwrap().decisions(), &before);
    assert!(matches!(session.state(), SessionState::Reviewing(_)));
    assert_eq!(api.save_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn successful_save_clears_and_invalidates() {
    let api = StubApi::serving(article());
    let mut session = loaded(&api).await;
    {
        let review = session.review_mut().unwrap();
        review.decide("i1", DecisionDraft::accept()).unwrap();
        review.set_notes("Checked against the minutes.");
    }

    let outcome = save_with(&mut session, &api, None).await.unwrap();
    let SaveOutcome::Saved { saved, invalidate, closed, .. } = outcome else {
        panic!("expected success");
    };
    assert_eq!(saved, 1);
    assert_eq!(closed, None);
    assert_eq!(
        invalidate,
        vec![CacheKey::WorklistDetail(7), CacheKey::WorklistList, CacheKey::ArticleReview(99)]
    );

    let review = session.review().unwrap();
    assert!(review.decisions().is_empty());
    assert!(review.notes().is_empty());
    assert!(!session.has_unsaved_changes());
    // Saved decisions still count as decided until the item is refetched.
    assert_eq!(review.stats().accepted, 1);

    let sent = api.saved.lock().unwrap();
    assert_eq!(sent[0].review_notes.as_deref(), Some("Checked against the minutes."));
    assert_eq!(sent[0].transition_to, None);
}

#[tokio::test]
async fn save_with_transition_closes_the_session() {
    let api = StubApi::serving(article());
    let mut session = loaded(&api).await;
    session.review_mut().unwrap().decide("i1", DecisionDraft::reject()).unwrap();

    let outcome = save_with(&mut session, &api, Some(Transition::Failed)).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { closed: Some(Transition::Failed), .. }));
    assert!(session.is_closed());
}

#[tokio::test]
async fn decisions_made_during_a_save_survive_it() {
    let api = StubApi::serving(article());
    let mut session = loaded(&api).await;
    session.review_mut().unwrap().decide("i1", DecisionDraft::accept()).unwrap();

    let request = session.begin_save(None).unwrap();
    assert_eq!(session.begin_save(None), Err(SessionError::SaveInFlight));
    session.review_mut().unwrap().decide("i2", DecisionDraft::reject()).unwrap();

    let outcome = session.finish_save(api.save_decisions(7, &request).await);
    assert!(matches!(outcome, SaveOutcome::Saved { saved: 1, .. }));
    let review = session.review().unwrap();
    assert_eq!(review.decisions().len(), 1);
    assert!(review.decisions().get("i2").is_some());
}

#[tokio::test]
async fn batch_selection_applies_and_empties() {
    let api = StubApi::serving(article());
    let mut session = loaded(&api).await;
    let review = session.review_mut().unwrap();

    assert!(review.apply(ReviewCommand::ToggleBatch));
    review.select_issue("i4");
    review.apply(ReviewCommand::ToggleBatch);
    assert_eq!(review.batch().len(), 2);

    let notice = review.batch_decision(DecisionType::Rejected).unwrap();
    assert!(notice.message.contains('2'));
    assert!(review.batch().is_empty());
    assert_eq!(review.decisions().count_of(DecisionType::Rejected), 2);
    assert!(review.batch_decision(DecisionType::Rejected).is_err());
}

#[tokio::test]
async fn leaving_with_unsaved_changes_needs_confirmation() {
    let api = StubApi::serving(article());
    let mut session = loaded(&api).await;
    assert_eq!(session.leave_check(), LeaveCheck::Leave);

    session.review_mut().unwrap().set_notes("draft");
    assert_eq!(session.leave_check(), LeaveCheck::ConfirmDiscard);
}

#[tokio::test]
async fn whitespace_notes_count_as_unsaved_until_a_save_clears_them() {
    let api = StubApi::serving(article());
    let mut session = loaded(&api).await;
    session.review_mut().unwrap().set_notes("   ");
    assert!(session.has_unsaved_changes());
    assert_eq!(session.leave_check(), LeaveCheck::ConfirmDiscard);

    session.review_mut().unwrap().decide("i1", DecisionDraft::accept()).unwrap();
    save_with(&mut session, &api, None).await.unwrap();

    assert_eq!(api.saved.lock().unwrap()[0].review_notes, None);
    assert!(!session.has_unsaved_changes());
    assert_eq!(session.leave_check(), LeaveCheck::Leave);
}

#[tokio::test]
async fn refresh_keeps_selection_and_drops_vanished_decisions() {
    let api = StubApi::serving(article());
    let mut session = loaded(&api).await;
    {
        let review = session.review_mut().unwrap();
        review.select_issue("i3");
        review.decide("i5", DecisionDraft::accept()).unwrap();
        review.set_view_mode(ViewMode::Diff);
    }

    let mut refreshed = article();
    refreshed.issues.retain(|i| i.id != "i5");
    let notice = session.on_refreshed(Ok(refreshed));

    assert!(notice.is_some());
    let review = session.review().unwrap();
    assert_eq!(review.selected_issue().map(|i| i.id.as_str()), Some("i3"));
    assert!(review.decisions().is_empty());
    assert_eq!(review.view_mode(), ViewMode::Diff);
    assert_eq!(review.revision(), 1);
}

#[tokio::test]
async fn preview_reflects_saved_and_unsaved_decisions() {
    let mut item = article();
    item.persisted.insert(
        "i3".to_owned(),
        proofdesk_core::Decision::from_draft(DecisionDraft::modify("a new budget")),
    );
    let api = StubApi::serving(item);
    let mut session = loaded(&api).await;
    session.review_mut().unwrap().decide("i1", DecisionDraft::accept()).unwrap();

    let review = session.review().unwrap();
    let text = proofdesk_core::suggest::preview_text(&review.preview());
    assert_eq!(text, "The council voted on a new budget yesterday.");
}
