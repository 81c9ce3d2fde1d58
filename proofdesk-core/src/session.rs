//! Review Session Controller.
//!
//! [`ReviewSession`] is an explicit state machine over the lifetime of one
//! review: `Loading -> Error | Empty | Reviewing`, `Reviewing -> Saving`,
//! `Saving -> Reviewing | Closed`. [`Review`] is the steady-state payload:
//! the loaded item, its issue layout, the dirty decision set, selection,
//! batch selection, view mode, and free-text notes.
//!
//! `Saving` carries the submitted batch, which can only be built from a
//! non-empty decision set, so "saving with nothing to save" cannot be
//! represented.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{info, warn};

use crate::api::WorklistApi;
use crate::decisions::DecisionStore;
use crate::error::{ApiError, DecisionError, SessionError};
use crate::overlap::remove_overlaps;
use crate::position::{resolve_all, ResolvedPosition};
use crate::suggest::{self, PreviewPiece, Segment};
use crate::text::PlainText;
use crate::types::{
    CacheKey, Decision, DecisionDraft, DecisionPayload, DecisionType, Issue, SaveAck,
    SaveDecisionsRequest, Transition, WorklistId, WorklistItem,
};

/// How the article body is presented.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Plain text with issue highlights.
    #[default]
    Original,
    /// Plain text with the reviewer's decisions applied.
    Preview,
    /// Original against the all-suggestions-applied reconstruction.
    Diff,
    /// The stored HTML markup.
    Rendered,
}

impl ViewMode {
    pub fn next(self) -> Self {
        match self {
            ViewMode::Original => ViewMode::Preview,
            ViewMode::Preview => ViewMode::Diff,
            ViewMode::Diff => ViewMode::Rendered,
            ViewMode::Rendered => ViewMode::Original,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Original => "ORIGINAL",
            ViewMode::Preview => "PREVIEW",
            ViewMode::Diff => "DIFF",
            ViewMode::Rendered => "HTML",
        }
    }
}

/// Where an issue sits in the article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Anchored and surfaced.
    Highlighted(ResolvedPosition),
    /// Anchored, but lost an overlap conflict; listed without a highlight.
    Hidden(ResolvedPosition),
    /// Could not be anchored; listed without a highlight.
    Unresolved,
}

/// Whether an issue's effective decision is still in the dirty set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOrigin {
    Unsaved,
    Saved,
}

/// The keyboard contract, independent of any input library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewCommand {
    Accept,
    Reject,
    ToggleBatch,
    SelectPrevious,
    SelectNext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing notification produced by a session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Client-side counts for the stats bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewStats {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub modified: usize,
    pub pending: usize,
    pub unsaved: usize,
    pub unresolved: usize,
    pub hidden: usize,
    pub batch: usize,
}

#[derive(Debug, Clone)]
pub struct Review {
    item: WorklistItem,
    plain: PlainText,
    placements: HashMap<String, Placement>,
    kept: Vec<ResolvedPosition>,
    index: HashMap<String, usize>,
    decisions: DecisionStore,
    selected: Option<usize>,
    batch: BTreeSet<String>,
    view_mode: ViewMode,
    notes: String,
    revision: u64,
}

impl Review {
    /// Builds the review for a loaded item and selects the first issue.
    pub fn new(item: WorklistItem) -> Self {
        let plain = PlainText::from_html(&item.content);
        let (placements, kept) = lay_out(&plain, &item.issues);
        let index = index_of(&item.issues);
        let decisions = DecisionStore::for_issues(item.issues.iter().map(|i| i.id.clone()));
        let selected = if item.issues.is_empty() { None } else { Some(0) };
        Self {
            item,
            plain,
            placements,
            kept,
            index,
            decisions,
            selected,
            batch: BTreeSet::new(),
            view_mode: ViewMode::default(),
            notes: String::new(),
            revision: 0,
        }
    }

    /// Swaps in freshly fetched server data, re-resolving every position.
    ///
    /// Selection follows the previously selected issue id when it still
    /// exists. Unsaved decisions and batch entries for vanished issues are
    /// dropped; their ids are returned.
    pub fn refresh(&mut self, item: WorklistItem) -> Vec<String> {
        let selected_id = self.selected_issue().map(|i| i.id.clone());
        self.plain = PlainText::from_html(&item.content);
        let (placements, kept) = lay_out(&self.plain, &item.issues);
        self.placements = placements;
        self.kept = kept;
        self.index = index_of(&item.issues);
        let dropped = self.decisions.reconcile(item.issues.iter().map(|i| i.id.clone()));
        self.batch.retain(|id| self.index.contains_key(id));
        self.item = item;
        self.selected = selected_id
            .and_then(|id| self.index.get(&id).copied())
            .or(if self.item.issues.is_empty() { None } else { Some(0) });
        self.revision += 1;
        dropped
    }

    pub fn item(&self) -> &WorklistItem {
        &self.item
    }

    pub fn plain(&self) -> &PlainText {
        &self.plain
    }

    pub fn issues(&self) -> &[Issue] {
        &self.item.issues
    }

    pub fn issue(&self, issue_id: &str) -> Option<&Issue> {
        self.index.get(issue_id).map(|&i| &self.item.issues[i])
    }

    /// Bumped on every refresh; views cache derived text against it.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn placement(&self, issue_id: &str) -> Option<&Placement> {
        self.placements.get(issue_id)
    }

    /// Surfaced positions, ascending and disjoint.
    pub fn kept_positions(&self) -> &[ResolvedPosition] {
        &self.kept
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_issue(&self) -> Option<&Issue> {
        self.selected.and_then(|i| self.item.issues.get(i))
    }

    /// Selects by list index; out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.item.issues.len() {
            self.selected = Some(index);
            true
        } else {
            false
        }
    }

    pub fn select_issue(&mut self, issue_id: &str) -> bool {
        match self.index.get(issue_id).copied() {
            Some(i) => self.select(i),
            None => false,
        }
    }

    /// Moves to the next issue in list order. Stays put at the last issue.
    pub fn select_next(&mut self) -> bool {
        match self.selected {
            Some(i) if i + 1 < self.item.issues.len() => self.select(i + 1),
            _ => false,
        }
    }

    /// Moves to the previous issue in list order. Stays put at the first.
    pub fn select_previous(&mut self) -> bool {
        match self.selected {
            Some(i) if i > 0 => self.select(i - 1),
            _ => false,
        }
    }

    pub fn select_first(&mut self) -> bool {
        self.select(0)
    }

    pub fn select_last(&mut self) -> bool {
        match self.item.issues.len() {
            0 => false,
            n => self.select(n - 1),
        }
    }

    // -----------------------------------------------------------------------
    // Decisions
    // -----------------------------------------------------------------------

    pub fn decisions(&self) -> &DecisionStore {
        &self.decisions
    }

    /// The decision that currently applies to an issue: the unsaved one if
    /// present, otherwise the one saved in an earlier session.
    pub fn decision_for(&self, issue_id: &str) -> Option<(&Decision, DecisionOrigin)> {
        if let Some(decision) = self.decisions.get(issue_id) {
            return Some((decision, DecisionOrigin::Unsaved));
        }
        self.item.persisted.get(issue_id).map(|d| (d, DecisionOrigin::Saved))
    }

    pub fn decide(&mut self, issue_id: &str, draft: DecisionDraft) -> Result<(), DecisionError> {
        self.decisions.add_decision(issue_id, draft).map(|_| ())
    }

    /// Records `draft` on top of whatever decision currently applies, so a
    /// rationale or feedback note does not reset the verdict.
    pub fn annotate(&mut self, issue_id: &str, draft: DecisionDraft) -> Result<(), DecisionError> {
        let merged = match self.decision_for(issue_id) {
            Some((existing, _)) => draft.merged_over(existing),
            None => draft,
        };
        self.decide(issue_id, merged)
    }

    pub fn clear_decision(&mut self, issue_id: &str) -> bool {
        self.decisions.clear_decision(issue_id).is_some()
    }

    pub fn clear_all_decisions(&mut self) -> usize {
        self.decisions.clear_all()
    }

    // -----------------------------------------------------------------------
    // Batch selection
    // -----------------------------------------------------------------------

    pub fn batch(&self) -> &BTreeSet<String> {
        &self.batch
    }

    pub fn is_in_batch(&self, issue_id: &str) -> bool {
        self.batch.contains(issue_id)
    }

    /// Toggles membership; returns whether the issue is now in the batch.
    pub fn toggle_batch(&mut self, issue_id: &str) -> bool {
        if !self.index.contains_key(issue_id) {
            return false;
        }
        if self.batch.remove(issue_id) {
            false
        } else {
            self.batch.insert(issue_id.to_owned());
            true
        }
    }

    pub fn select_all_into_batch(&mut self) -> usize {
        self.batch = self.item.issues.iter().map(|i| i.id.clone()).collect();
        self.batch.len()
    }

    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }

    /// Applies one verdict to every batch-selected issue, empties the batch,
    /// and returns the confirmation notice.
    pub fn batch_decision(&mut self, decision_type: DecisionType) -> Result<Notice, DecisionError> {
        let count = self.decisions.batch_decision(self.batch.iter().map(String::as_str), decision_type)?;
        self.batch.clear();
        let noun = if count == 1 { "issue" } else { "issues" };
        Ok(Notice::success(format!("{count} {noun} marked as {}", decision_type.as_str())))
    }

    // -----------------------------------------------------------------------
    // View state
    // -----------------------------------------------------------------------

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn cycle_view_mode(&mut self) -> ViewMode {
        self.view_mode = self.view_mode.next();
        self.view_mode
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.decisions.is_empty() || !self.notes.is_empty()
    }

    // -----------------------------------------------------------------------
    // Derived text
    // -----------------------------------------------------------------------

    pub fn segments(&self) -> Vec<Segment<'_>> {
        suggest::segments(&self.plain, &self.kept)
    }

    pub fn suggested_content(&self) -> Option<String> {
        suggest::build_suggested_content(&self.plain, &self.kept, &self.item.issues)
    }

    pub fn preview(&self) -> Vec<PreviewPiece> {
        suggest::build_preview(&self.plain, &self.kept, &self.item.issues, |id| {
            self.decision_for(id).map(|(d, _)| d)
        })
    }

    pub fn stats(&self) -> ReviewStats {
        let mut stats = ReviewStats {
            total: self.item.issues.len(),
            unsaved: self.decisions.len(),
            batch: self.batch.len(),
            ..ReviewStats::default()
        };
        for issue in &self.item.issues {
            match self.decision_for(&issue.id).map(|(d, _)| d.decision_type) {
                Some(DecisionType::Accepted) => stats.accepted += 1,
                Some(DecisionType::Rejected) => stats.rejected += 1,
                Some(DecisionType::Modified) => stats.modified += 1,
                None => stats.pending += 1,
            }
            match self.placements.get(&issue.id) {
                Some(Placement::Hidden(_)) => stats.hidden += 1,
                Some(Placement::Unresolved) | None => stats.unresolved += 1,
                Some(Placement::Highlighted(_)) => {}
            }
        }
        stats
    }

    // -----------------------------------------------------------------------
    // Keyboard contract
    // -----------------------------------------------------------------------

    /// Applies a keyboard command to the selected issue. Does nothing (and
    /// returns `false`) when no issue is selected.
    pub fn apply(&mut self, command: ReviewCommand) -> bool {
        let Some(issue_id) = self.selected_issue().map(|i| i.id.clone()) else {
            return false;
        };
        match command {
            ReviewCommand::Accept => self.decide(&issue_id, DecisionDraft::accept()).is_ok(),
            ReviewCommand::Reject => self.decide(&issue_id, DecisionDraft::reject()).is_ok(),
            ReviewCommand::ToggleBatch => {
                self.toggle_batch(&issue_id);
                true
            }
            ReviewCommand::SelectPrevious => self.select_previous(),
            ReviewCommand::SelectNext => self.select_next(),
        }
    }

    /// Moves acknowledged decisions into the item's saved set so they keep
    /// showing as decided until the next refresh.
    fn mark_saved(&mut self, submitted: &SaveDecisionsRequest) -> usize {
        for payload in &submitted.decisions {
            self.item.persisted.insert(payload.issue_id.clone(), payload.decision.clone());
        }
        // Whitespace-only notes were sent as no notes.
        if submitted.review_notes.as_deref().unwrap_or_default() == self.notes.trim() {
            self.notes.clear();
        }
        self.decisions.acknowledge(&submitted.decisions)
    }
}

fn lay_out(plain: &PlainText, issues: &[Issue]) -> (HashMap<String, Placement>, Vec<ResolvedPosition>) {
    let resolutions = resolve_all(plain, issues);
    let resolved: Vec<ResolvedPosition> =
        resolutions.iter().filter_map(|(_, r)| r.position().cloned()).collect();
    let outcome = remove_overlaps(&resolved);
    let hidden: HashSet<&str> = outcome.hidden.iter().map(String::as_str).collect();

    let placements = resolutions
        .into_iter()
        .map(|(id, resolution)| {
            let placement = match resolution.position() {
                Some(position) if hidden.contains(id.as_str()) => Placement::Hidden(position.clone()),
                Some(position) => Placement::Highlighted(position.clone()),
                None => Placement::Unresolved,
            };
            (id, placement)
        })
        .collect();
    (placements, outcome.kept)
}

fn index_of(issues: &[Issue]) -> HashMap<String, usize> {
    issues.iter().enumerate().map(|(i, issue)| (issue.id.clone(), i)).collect()
}

/// A save batch that is non-empty by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    request: SaveDecisionsRequest,
}

impl Submitted {
    fn from_review(review: &Review, transition: Option<Transition>) -> Result<Self, SessionError> {
        let decisions: Vec<DecisionPayload> = review.decisions.to_payloads();
        if decisions.is_empty() {
            return Err(SessionError::NothingToSave);
        }
        let notes = review.notes.trim();
        Ok(Self {
            request: SaveDecisionsRequest {
                decisions,
                review_notes: (!notes.is_empty()).then(|| notes.to_owned()),
                transition_to: transition,
            },
        })
    }

    pub fn request(&self) -> &SaveDecisionsRequest {
        &self.request
    }

    pub fn len(&self) -> usize {
        self.request.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.request.decisions.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum SessionState {
    Loading { worklist_id: WorklistId },
    /// Terminal for this session: the only way out is back to the list.
    Error { worklist_id: WorklistId, message: String },
    /// Loaded, nothing to review. Terminal success.
    Empty { item: WorklistItem },
    Reviewing(Box<Review>),
    Saving { review: Box<Review>, submitted: Submitted },
    /// A save with a workflow transition succeeded; the session is over.
    Closed { worklist_id: WorklistId, transition: Transition },
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Loading { .. } => "LOADING",
            SessionState::Error { .. } => "ERROR",
            SessionState::Empty { .. } => "EMPTY",
            SessionState::Reviewing(_) => "REVIEWING",
            SessionState::Saving { .. } => "SAVING",
            SessionState::Closed { .. } => "CLOSED",
        }
    }
}

/// Outcome of a completed save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved {
        saved: usize,
        /// Server state that must be refetched.
        invalidate: Vec<CacheKey>,
        /// `Some` when the session closed because of a workflow transition.
        closed: Option<Transition>,
        notice: Notice,
    },
    /// Decisions are untouched and the save can be retried.
    Failed { notice: Notice },
    /// A result arrived while no save was in flight.
    Ignored,
}

/// Whether leaving the session needs the reviewer's confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveCheck {
    Leave,
    ConfirmDiscard,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    worklist_id: WorklistId,
    state: SessionState,
}

impl ReviewSession {
    pub fn new(worklist_id: WorklistId) -> Self {
        Self { worklist_id, state: SessionState::Loading { worklist_id } }
    }

    pub fn worklist_id(&self) -> WorklistId {
        self.worklist_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.state, SessionState::Saving { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed { .. })
    }

    /// The review while reviewing or saving.
    pub fn review(&self) -> Option<&Review> {
        match &self.state {
            SessionState::Reviewing(review) | SessionState::Saving { review, .. } => Some(review),
            _ => None,
        }
    }

    /// Mutable access while reviewing or saving. Decisions made during a save
    /// are kept when the save is acknowledged.
    pub fn review_mut(&mut self) -> Option<&mut Review> {
        match &mut self.state {
            SessionState::Reviewing(review) | SessionState::Saving { review, .. } => Some(review),
            _ => None,
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.review().is_some_and(Review::has_unsaved_changes)
    }

    pub fn leave_check(&self) -> LeaveCheck {
        if self.has_unsaved_changes() {
            LeaveCheck::ConfirmDiscard
        } else {
            LeaveCheck::Leave
        }
    }

    /// Completes the initial fetch. Ignored unless the session is loading.
    pub fn on_loaded(&mut self, result: Result<WorklistItem, ApiError>) {
        if !matches!(self.state, SessionState::Loading { .. }) {
            warn!(worklist_id = self.worklist_id, "load result ignored outside Loading");
            return;
        }
        let worklist_id = self.worklist_id;
        self.state = match result {
            Err(error) => {
                warn!(worklist_id, %error, "worklist item failed to load");
                SessionState::Error { worklist_id, message: error.user_message() }
            }
            Ok(item) if item.article_id.is_none() => SessionState::Error {
                worklist_id,
                message: "This worklist item has no linked article.".to_owned(),
            },
            Ok(item) if item.issues.is_empty() => {
                info!(worklist_id, "no proofreading issues to review");
                SessionState::Empty { item }
            }
            Ok(item) => {
                info!(worklist_id, issues = item.issues.len(), "review loaded");
                SessionState::Reviewing(Box::new(Review::new(item)))
            }
        };
    }

    /// Applies a refetch triggered by cache invalidation.
    pub fn on_refreshed(&mut self, result: Result<WorklistItem, ApiError>) -> Option<Notice> {
        let review = self.review_mut()?;
        match result {
            Ok(item) => {
                let dropped = review.refresh(item);
                if dropped.is_empty() {
                    None
                } else {
                    Some(Notice::warning(format!(
                        "{} unsaved decision(s) dropped: issues no longer exist",
                        dropped.len()
                    )))
                }
            }
            Err(error) => {
                warn!(worklist_id = self.worklist_id, %error, "refresh failed");
                Some(Notice::warning(format!("Could not refresh: {}", error.user_message())))
            }
        }
    }

    /// Snapshots the dirty set and enters `Saving`.
    ///
    /// # Errors
    ///
    /// `NothingToSave` when the decision map is empty (state unchanged, no
    /// request built), `SaveInFlight` while saving, `NotReviewing` otherwise.
    pub fn begin_save(
        &mut self,
        transition: Option<Transition>,
    ) -> Result<SaveDecisionsRequest, SessionError> {
        let review = match &self.state {
            SessionState::Reviewing(review) => review,
            SessionState::Saving { .. } => return Err(SessionError::SaveInFlight),
            _ => return Err(SessionError::NotReviewing),
        };
        let submitted = Submitted::from_review(review, transition)?;
        let request = submitted.request.clone();

        let placeholder = SessionState::Loading { worklist_id: self.worklist_id };
        if let SessionState::Reviewing(review) = std::mem::replace(&mut self.state, placeholder) {
            self.state = SessionState::Saving { review, submitted };
        }
        Ok(request)
    }

    /// Completes an in-flight save.
    pub fn finish_save(&mut self, result: Result<SaveAck, ApiError>) -> SaveOutcome {
        let placeholder = SessionState::Loading { worklist_id: self.worklist_id };
        let (mut review, submitted) = match std::mem::replace(&mut self.state, placeholder) {
            SessionState::Saving { review, submitted } => (review, submitted),
            other => {
                self.state = other;
                return SaveOutcome::Ignored;
            }
        };

        match result {
            Err(error) => {
                warn!(worklist_id = self.worklist_id, %error, "saving decisions failed");
                self.state = SessionState::Reviewing(review);
                SaveOutcome::Failed {
                    notice: Notice::error(format!(
                        "Failed to save decisions: {}",
                        error.user_message()
                    )),
                }
            }
            Ok(ack) => {
                let request = submitted.request;
                review.mark_saved(&request);
                let saved = request.decisions.len();
                info!(worklist_id = self.worklist_id, saved, transition = ?request.transition_to, "decisions saved");

                let mut invalidate =
                    vec![CacheKey::WorklistDetail(self.worklist_id), CacheKey::WorklistList];
                if let Some(article_id) = review.item().article_id {
                    invalidate.push(CacheKey::ArticleReview(article_id));
                }
                let message = ack.message.unwrap_or_else(|| match request.transition_to {
                    Some(t) => format!("Saved {saved} decision(s); moved to {}", t.as_str()),
                    None => format!("Saved {saved} decision(s)"),
                });

                self.state = match request.transition_to {
                    Some(transition) => {
                        SessionState::Closed { worklist_id: self.worklist_id, transition }
                    }
                    None => SessionState::Reviewing(review),
                };
                SaveOutcome::Saved {
                    saved,
                    invalidate,
                    closed: request.transition_to,
                    notice: Notice::success(message),
                }
            }
        }
    }
}

/// Runs the initial fetch against `api`.
pub async fn load_with(session: &mut ReviewSession, api: &dyn WorklistApi) {
    let result = api.fetch_item(session.worklist_id()).await;
    session.on_loaded(result);
}

/// Saves the current decisions through `api` in one step.
///
/// # Errors
///
/// The local preconditions of [`ReviewSession::begin_save`]; no request is
/// sent when they fail.
pub async fn save_with(
    session: &mut ReviewSession,
    api: &dyn WorklistApi,
    transition: Option<Transition>,
) -> Result<SaveOutcome, SessionError> {
    let request = session.begin_save(transition)?;
    let result = api.save_decisions(session.worklist_id(), &request).await;
    Ok(session.finish_save(result))
}
