//! Central application state for proofdesk.
//!
//! This module owns all mutable UI state around the review session: the current
//! mode, which panel has focus, per-panel scroll offsets and viewport heights,
//! panel width percentages, the inline editor, and notifications. No ratatui
//! rendering logic lives here; `app.rs` is state read by the render module and
//! mutated by the keybinding dispatcher and the API worker results.

use std::collections::HashMap;

use crossbeam_channel::Sender;
use proofdesk_core::{
    ApiError, CacheKey, DecisionDraft, DecisionType, Notice, NoticeLevel, ReviewCommand,
    ReviewSession, SaveOutcome, SessionError, Transition, WorklistId,
};
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::ListState;
use tracing::{debug, info, warn};

use crate::worker::{ApiRequest, ApiResult};

/// Ticks (250 ms each) a non-error notification stays on screen.
const TOAST_TICKS: u16 = 16;

/// Editor mode controlling which keybinding set is active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Text entry into `AppState::editor`.
    Insert,
    /// Full-screen help overlay is shown above all panels.
    HelpOverlay,
    /// Leave-confirmation dialog shown when unsaved changes exist.
    ConfirmQuit,
}

/// Which panel currently has keyboard focus.
///
/// Navigation cycles IssueList -> Article -> Detail -> IssueList.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    #[default]
    IssueList,
    Article,
    Detail,
}

impl PanelFocus {
    pub fn prev(self) -> Self {
        match self {
            PanelFocus::IssueList => PanelFocus::Detail,
            PanelFocus::Article => PanelFocus::IssueList,
            PanelFocus::Detail => PanelFocus::Article,
        }
    }

    pub fn next(self) -> Self {
        match self {
            PanelFocus::IssueList => PanelFocus::Article,
            PanelFocus::Article => PanelFocus::Detail,
            PanelFocus::Detail => PanelFocus::IssueList,
        }
    }
}

/// What the inline editor writes to when committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Notes,
    Modify(String),
    Rationale(String),
    Feedback(String),
}

impl EditTarget {
    pub fn title(&self) -> String {
        match self {
            EditTarget::Notes => " Review notes ".to_owned(),
            EditTarget::Modify(id) => format!(" Replacement for {id} "),
            EditTarget::Rationale(id) => format!(" Rationale for {id} "),
            EditTarget::Feedback(id) => format!(" Feedback on {id} (#category optional) "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    pub target: EditTarget,
    pub buffer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub notice: Notice,
    /// `None` keeps the toast until dismissed with Esc.
    ttl: Option<u16>,
}

/// Article lines wrapped for one width, plus the first line of each issue.
#[derive(Debug, Clone, Default)]
pub struct ArticleView {
    pub lines: Vec<Line<'static>>,
    pub anchors: HashMap<String, usize>,
    key: (u64, u16),
}

/// All mutable UI state passed through every render cycle.
pub struct AppState {
    pub session: ReviewSession,
    pub mode: Mode,
    pub focus: PanelFocus,

    /// Mirrors the session selection for the issue-list widget.
    pub issue_list_state: ListState,
    pub article_scroll: usize,
    pub detail_scroll: u16,

    /// Inner heights after borders, cached after each render for paging.
    pub issue_list_viewport_height: u16,
    pub article_viewport_height: u16,
    pub detail_viewport_height: u16,

    pub left_pct: u16,
    pub center_pct: u16,
    pub right_pct: u16,
    /// Outer rects of the three panels from the last render, for mouse hits.
    pub panel_rects: [Rect; 3],

    pub help_scroll: u16,
    pub editor: Option<Editor>,
    pub toasts: Vec<Toast>,
    pub api_tx: Option<Sender<ApiRequest>>,

    pub article: Option<ArticleView>,
    /// Bumped by every state change that can alter the article text.
    generation: u64,
    /// Scroll the article so the selected issue is visible on the next render.
    reveal_selected: bool,
}

impl AppState {
    pub fn new(worklist_id: WorklistId) -> Self {
        Self {
            session: ReviewSession::new(worklist_id),
            mode: Mode::default(),
            focus: PanelFocus::default(),
            issue_list_state: ListState::default(),
            article_scroll: 0,
            detail_scroll: 0,
            issue_list_viewport_height: 0,
            article_viewport_height: 0,
            detail_viewport_height: 0,
            left_pct: 25,
            center_pct: 50,
            right_pct: 25,
            panel_rects: [Rect::default(); 3],
            help_scroll: 0,
            editor: None,
            toasts: Vec::new(),
            api_tx: None,
            article: None,
            generation: 0,
            reveal_selected: false,
        }
    }

    /// Marks the cached article stale.
    pub fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn article_is_fresh(&self, width: u16) -> bool {
        self.article.as_ref().is_some_and(|view| view.key == (self.generation, width))
    }

    pub fn store_article(&mut self, lines: Vec<Line<'static>>, anchors: HashMap<String, usize>, width: u16) {
        self.article = Some(ArticleView { lines, anchors, key: (self.generation, width) });
        if self.reveal_selected {
            self.reveal_selected = false;
            self.reveal_selection();
        }
    }

    /// Scrolls the article so the selected issue's first line is on screen.
    fn reveal_selection(&mut self) {
        let Some(line) = self
            .session
            .review()
            .and_then(|review| review.selected_issue())
            .and_then(|issue| self.article.as_ref()?.anchors.get(&issue.id).copied())
        else {
            return;
        };
        let height = usize::from(self.article_viewport_height.max(1));
        if line < self.article_scroll || line >= self.article_scroll + height {
            self.article_scroll = line.saturating_sub(height / 3);
        }
    }

    /// Enter: focus the article on the selected issue.
    pub fn jump_to_selected_issue(&mut self) {
        self.focus = PanelFocus::Article;
        self.reveal_selected = true;
        self.reveal_selection();
    }

    // -----------------------------------------------------------------------
    // Review commands
    // -----------------------------------------------------------------------

    pub fn apply_command(&mut self, command: ReviewCommand) -> bool {
        let Some(review) = self.session.review_mut() else {
            return false;
        };
        let applied = review.apply(command);
        if applied {
            self.touch();
            self.detail_scroll = 0;
            if matches!(command, ReviewCommand::SelectNext | ReviewCommand::SelectPrevious) {
                self.reveal_selected = true;
            }
        }
        applied
    }

    pub fn select_first_issue(&mut self) {
        if self.session.review_mut().is_some_and(|review| review.select_first()) {
            self.after_selection();
        }
    }

    pub fn select_last_issue(&mut self) {
        if self.session.review_mut().is_some_and(|review| review.select_last()) {
            self.after_selection();
        }
    }

    pub fn select_issue_at(&mut self, index: usize) {
        if self.session.review_mut().is_some_and(|review| review.select(index)) {
            self.after_selection();
        }
    }

    fn after_selection(&mut self) {
        self.touch();
        self.detail_scroll = 0;
        self.reveal_selected = true;
    }

    pub fn clear_selected_decision(&mut self) {
        let Some(review) = self.session.review_mut() else { return };
        let Some(id) = review.selected_issue().map(|issue| issue.id.clone()) else { return };
        if review.clear_decision(&id) {
            self.touch();
            self.push_notice(Notice::info(format!("Cleared unsaved decision for {id}")));
        }
    }

    pub fn clear_all_decisions(&mut self) {
        let Some(review) = self.session.review_mut() else { return };
        let cleared = review.clear_all_decisions();
        review.clear_batch();
        self.touch();
        self.push_notice(Notice::info(format!("Cleared {cleared} unsaved decision(s)")));
    }

    pub fn select_all_into_batch(&mut self) {
        let Some(review) = self.session.review_mut() else { return };
        let count = review.select_all_into_batch();
        self.touch();
        self.push_notice(Notice::info(format!("{count} issue(s) in batch")));
    }

    pub fn batch_decision(&mut self, decision_type: DecisionType) {
        let Some(review) = self.session.review_mut() else { return };
        let notice = match review.batch_decision(decision_type) {
            Ok(notice) => notice,
            Err(error) => Notice::warning(error.to_string()),
        };
        self.touch();
        self.push_notice(notice);
    }

    pub fn cycle_view_mode(&mut self) {
        if let Some(review) = self.session.review_mut() {
            let mode = review.cycle_view_mode();
            debug!(view = mode.label(), "view mode changed");
            self.touch();
            self.reveal_selected = true;
        }
    }

    // -----------------------------------------------------------------------
    // Inline editor
    // -----------------------------------------------------------------------

    /// Opens the editor prefilled with the value it will replace.
    pub fn open_editor(&mut self, make_target: fn(String) -> EditTarget) {
        let Some(review) = self.session.review() else { return };
        let Some(issue) = review.selected_issue() else { return };
        let target = make_target(issue.id.clone());
        let existing = review.decision_for(&issue.id).map(|(decision, _)| decision);
        let buffer = match &target {
            EditTarget::Modify(_) => existing
                .and_then(|d| d.modified_content.clone())
                .or_else(|| issue.suggestion().map(str::to_owned))
                .or_else(|| issue.original_text().map(str::to_owned)),
            EditTarget::Rationale(_) => existing.and_then(|d| d.decision_rationale.clone()),
            EditTarget::Feedback(_) => existing.and_then(|d| {
                let notes = d.feedback_notes.clone().unwrap_or_default();
                match &d.feedback_category {
                    Some(category) => Some(format!("#{category} {notes}")),
                    None => d.feedback_notes.clone(),
                }
            }),
            EditTarget::Notes => None,
        }
        .unwrap_or_default();
        self.editor = Some(Editor { target, buffer });
        self.mode = Mode::Insert;
    }

    pub fn open_notes_editor(&mut self) {
        let Some(review) = self.session.review() else { return };
        self.editor = Some(Editor { target: EditTarget::Notes, buffer: review.notes().to_owned() });
        self.mode = Mode::Insert;
    }

    pub fn cancel_editor(&mut self) {
        self.editor = None;
        self.mode = Mode::Normal;
    }

    /// Writes the editor buffer to its target. A rejected decision keeps the
    /// editor open so the text is not lost.
    pub fn commit_editor(&mut self) {
        let Some(editor) = self.editor.take() else {
            self.mode = Mode::Normal;
            return;
        };
        let Some(review) = self.session.review_mut() else {
            self.mode = Mode::Normal;
            return;
        };
        let result = match &editor.target {
            EditTarget::Notes => {
                review.set_notes(editor.buffer.clone());
                Ok(())
            }
            EditTarget::Modify(id) => review.annotate(id, DecisionDraft::modify(editor.buffer.clone())),
            EditTarget::Rationale(id) => review.annotate(
                id,
                DecisionDraft { rationale: Some(editor.buffer.clone()), ..DecisionDraft::default() },
            ),
            EditTarget::Feedback(id) => {
                let (category, notes) = split_feedback(&editor.buffer);
                review.annotate(id, DecisionDraft::default().with_feedback(category, notes))
            }
        };
        match result {
            Ok(()) => {
                self.mode = Mode::Normal;
                self.touch();
            }
            Err(error) => {
                self.push_notice(Notice::warning(error.to_string()));
                self.editor = Some(editor);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Backend traffic
    // -----------------------------------------------------------------------

    pub fn request_load(&mut self, refresh: bool) {
        let worklist_id = self.session.worklist_id();
        if !self.send(ApiRequest::Load { worklist_id, refresh }) {
            let result = Err(ApiError::Configuration("backend worker is not running".to_owned()));
            self.apply_api_result(ApiResult::Loaded { result, refresh });
        }
    }

    /// Starts a save. Local precondition failures become notifications and
    /// send nothing.
    pub fn request_save(&mut self, transition: Option<Transition>) {
        let request = match self.session.begin_save(transition) {
            Ok(request) => request,
            Err(SessionError::NothingToSave) => {
                self.push_notice(Notice::warning("No decisions to save"));
                return;
            }
            Err(SessionError::SaveInFlight) => {
                self.push_notice(Notice::warning("A save is already in progress"));
                return;
            }
            Err(error) => {
                self.push_notice(Notice::warning(error.to_string()));
                return;
            }
        };
        info!(decisions = request.decisions.len(), transition = ?transition, "saving decisions");
        let worklist_id = self.session.worklist_id();
        if !self.send(ApiRequest::Save { worklist_id, request }) {
            let result = Err(ApiError::Configuration("backend worker is not running".to_owned()));
            self.apply_api_result(ApiResult::Saved(result));
        }
    }

    fn send(&self, request: ApiRequest) -> bool {
        self.api_tx.as_ref().is_some_and(|tx| tx.send(request).is_ok())
    }

    /// Folds a worker result into the session.
    pub fn apply_api_result(&mut self, result: ApiResult) {
        self.touch();
        match result {
            ApiResult::Loaded { result, refresh: false } => {
                self.session.on_loaded(result);
                self.reveal_selected = true;
            }
            ApiResult::Loaded { result, refresh: true } => {
                if let Some(notice) = self.session.on_refreshed(result) {
                    self.push_notice(notice);
                }
            }
            ApiResult::Saved(result) => match self.session.finish_save(result) {
                SaveOutcome::Saved { invalidate, closed, notice, .. } => {
                    self.push_notice(notice);
                    let worklist_id = self.session.worklist_id();
                    if closed.is_none() && invalidate.contains(&CacheKey::WorklistDetail(worklist_id)) {
                        self.request_load(true);
                    }
                }
                SaveOutcome::Failed { notice } => self.push_notice(notice),
                SaveOutcome::Ignored => warn!("save result arrived with no save in flight"),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    pub fn push_notice(&mut self, notice: Notice) {
        let ttl = (notice.level != NoticeLevel::Error).then_some(TOAST_TICKS);
        self.toasts.push(Toast { notice, ttl });
    }

    pub fn latest_toast(&self) -> Option<&Notice> {
        self.toasts.last().map(|toast| &toast.notice)
    }

    /// Removes the newest sticky toast. Returns whether one was dismissed.
    pub fn dismiss_toast(&mut self) -> bool {
        match self.toasts.iter().rposition(|toast| toast.ttl.is_none()) {
            Some(index) => {
                self.toasts.remove(index);
                true
            }
            None => false,
        }
    }

    /// Ages timed toasts by one tick.
    pub fn tick(&mut self) {
        for toast in &mut self.toasts {
            if let Some(ttl) = toast.ttl.as_mut() {
                *ttl = ttl.saturating_sub(1);
            }
        }
        self.toasts.retain(|toast| toast.ttl != Some(0));
    }

    // -----------------------------------------------------------------------
    // Scrolling
    // -----------------------------------------------------------------------

    /// Scrolls the focused panel down by `lines` rows. In the issue list this
    /// moves the selection, stopping at the last issue.
    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::IssueList => {
                let mut moved = false;
                for _ in 0..lines {
                    if !self.session.review_mut().is_some_and(|review| review.select_next()) {
                        break;
                    }
                    moved = true;
                }
                if moved {
                    self.after_selection();
                }
            }
            PanelFocus::Article => {
                let max = self.article.as_ref().map_or(0, |view| view.lines.len().saturating_sub(1));
                self.article_scroll = self.article_scroll.saturating_add(usize::from(lines)).min(max);
            }
            PanelFocus::Detail => {
                self.detail_scroll = self.detail_scroll.saturating_add(lines);
            }
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::IssueList => {
                let mut moved = false;
                for _ in 0..lines {
                    if !self.session.review_mut().is_some_and(|review| review.select_previous()) {
                        break;
                    }
                    moved = true;
                }
                if moved {
                    self.after_selection();
                }
            }
            PanelFocus::Article => {
                self.article_scroll = self.article_scroll.saturating_sub(usize::from(lines));
            }
            PanelFocus::Detail => {
                self.detail_scroll = self.detail_scroll.saturating_sub(lines);
            }
        }
    }

    pub fn scroll_top(&mut self) {
        match self.focus {
            PanelFocus::IssueList => self.select_first_issue(),
            PanelFocus::Article => self.article_scroll = 0,
            PanelFocus::Detail => self.detail_scroll = 0,
        }
    }

    pub fn scroll_bottom(&mut self) {
        match self.focus {
            PanelFocus::IssueList => self.select_last_issue(),
            PanelFocus::Article => {
                self.article_scroll =
                    self.article.as_ref().map_or(0, |view| view.lines.len().saturating_sub(1));
            }
            PanelFocus::Detail => self.detail_scroll = u16::MAX,
        }
    }

    fn focused_viewport_height(&self) -> u16 {
        match self.focus {
            PanelFocus::IssueList => self.issue_list_viewport_height,
            PanelFocus::Article => self.article_viewport_height,
            PanelFocus::Detail => self.detail_viewport_height,
        }
    }

    pub fn half_page_down(&mut self) {
        self.scroll_down((self.focused_viewport_height() / 2).max(1));
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.focused_viewport_height() / 2).max(1));
    }

    pub fn full_page_down(&mut self) {
        self.scroll_down(self.focused_viewport_height().max(1));
    }

    pub fn full_page_up(&mut self) {
        self.scroll_up(self.focused_viewport_height().max(1));
    }

    // -----------------------------------------------------------------------
    // Panel geometry
    // -----------------------------------------------------------------------

    /// Shrinks the article (centre) panel by transferring 5% to the side panels.
    /// The centre panel will not shrink below 20%.
    pub fn shrink_article_panel(&mut self) {
        const MIN_CENTER: u16 = 20;
        const STEP: u16 = 5;
        if self.center_pct <= MIN_CENTER {
            return;
        }
        let transfer = STEP.min(self.center_pct - MIN_CENTER);
        self.center_pct -= transfer;
        let left_gain = transfer / 2;
        self.left_pct = self.left_pct.saturating_add(left_gain);
        self.right_pct = self.right_pct.saturating_add(transfer - left_gain);
    }

    /// Grows the article panel by pulling from the side panels. The centre
    /// panel will not grow above 80% and neither side drops below 5%.
    pub fn grow_article_panel(&mut self) {
        const MAX_CENTER: u16 = 80;
        const MIN_SIDE: u16 = 5;
        const STEP: u16 = 5;
        if self.center_pct >= MAX_CENTER {
            return;
        }
        let transfer = STEP.min(MAX_CENTER - self.center_pct);
        let left_give = (transfer / 2).min(self.left_pct.saturating_sub(MIN_SIDE));
        let right_give = (transfer - transfer / 2).min(self.right_pct.saturating_sub(MIN_SIDE));
        self.left_pct -= left_give;
        self.right_pct -= right_give;
        self.center_pct += left_give + right_give;
    }
}

/// Splits `#category notes` into its parts; text without a leading tag is
/// all notes.
fn split_feedback(raw: &str) -> (Option<String>, String) {
    let trimmed = raw.trim();
    match trimmed.strip_prefix('#') {
        Some(rest) => {
            let (category, notes) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let category = (!category.is_empty()).then(|| category.to_owned());
            (category, notes.trim().to_owned())
        }
        None => (None, trimmed.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofdesk_core::wire::parse_item;
    use proofdesk_core::SessionState;
    use serde_json::json;

    fn reviewing() -> AppState {
        let item = parse_item(
            &json!({
                "id": 3,
                "article_id": 30,
                "title": "Ferry timetable",
                "content": "<p>The ferry leaves at noon on sunday and returns on monday.</p>",
                "proofreading_issues": [
                    { "id": "a", "original_text": "sunday", "suggested_text": "Sunday" },
                    { "id": "b", "original_text": "monday", "suggested_text": "Monday" }
                ]
            })
            .to_string(),
        )
        .unwrap();
        let mut state = AppState::new(3);
        state.apply_api_result(ApiResult::Loaded { result: Ok(item), refresh: false });
        state
    }

    #[test]
    fn panel_resize_respects_bounds() {
        let mut state = AppState::new(1);
        for _ in 0..20 {
            state.grow_article_panel();
        }
        assert!(state.center_pct <= 80);
        assert_eq!(state.left_pct + state.center_pct + state.right_pct, 100);
        for _ in 0..20 {
            state.shrink_article_panel();
        }
        assert_eq!(state.center_pct, 20);
        assert_eq!(state.left_pct + state.center_pct + state.right_pct, 100);
    }

    #[test]
    fn save_without_decisions_only_warns() {
        let mut state = reviewing();
        state.request_save(None);
        assert!(matches!(state.session.state(), SessionState::Reviewing(_)));
        assert_eq!(state.latest_toast().map(|n| n.level), Some(NoticeLevel::Warning));
    }

    #[test]
    fn save_without_worker_fails_and_keeps_decisions() {
        let mut state = reviewing();
        state.apply_command(ReviewCommand::Accept);
        state.request_save(None);

        assert!(matches!(state.session.state(), SessionState::Reviewing(_)));
        assert_eq!(state.session.review().unwrap().decisions().len(), 1);
        assert_eq!(state.latest_toast().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[test]
    fn error_toasts_stick_until_dismissed() {
        let mut state = AppState::new(1);
        state.push_notice(Notice::error("boom"));
        state.push_notice(Notice::info("hello"));
        for _ in 0..TOAST_TICKS {
            state.tick();
        }
        assert_eq!(state.toasts.len(), 1);
        assert!(state.dismiss_toast());
        assert!(!state.dismiss_toast());
    }

    #[test]
    fn modify_editor_commits_a_modified_decision() {
        let mut state = reviewing();
        state.open_editor(EditTarget::Modify);
        assert_eq!(state.editor.as_ref().map(|e| e.buffer.as_str()), Some("Sunday"));
        if let Some(editor) = state.editor.as_mut() {
            editor.buffer = "Sun.".to_owned();
        }
        state.commit_editor();

        assert_eq!(state.mode, Mode::Normal);
        let review = state.session.review().unwrap();
        let decision = review.decisions().get("a").unwrap();
        assert_eq!(decision.decision_type, DecisionType::Modified);
        assert_eq!(decision.modified_content.as_deref(), Some("Sun."));
    }

    #[test]
    fn empty_modification_keeps_the_editor_open() {
        let mut state = reviewing();
        state.open_editor(EditTarget::Modify);
        if let Some(editor) = state.editor.as_mut() {
            editor.buffer.clear();
        }
        state.commit_editor();
        assert!(state.editor.is_some());
        assert!(state.session.review().unwrap().decisions().is_empty());
    }

    #[test]
    fn rationale_keeps_the_verdict() {
        let mut state = reviewing();
        state.apply_command(ReviewCommand::Reject);
        state.open_editor(EditTarget::Rationale);
        if let Some(editor) = state.editor.as_mut() {
            editor.buffer = "day names stay lowercase here".to_owned();
        }
        state.commit_editor();
        let decision = state.session.review().unwrap().decisions().get("a").cloned().unwrap();
        assert_eq!(decision.decision_type, DecisionType::Rejected);
        assert_eq!(decision.decision_rationale.as_deref(), Some("day names stay lowercase here"));
    }

    #[test]
    fn feedback_tag_becomes_the_category() {
        assert_eq!(
            split_feedback("#false-positive proper noun"),
            (Some("false-positive".to_owned()), "proper noun".to_owned())
        );
        assert_eq!(split_feedback("  just notes "), (None, "just notes".to_owned()));
        assert_eq!(split_feedback("#tone"), (Some("tone".to_owned()), String::new()));
    }

    #[test]
    fn issue_list_scrolling_moves_selection_without_wrapping() {
        let mut state = reviewing();
        state.scroll_down(5);
        assert_eq!(state.session.review().unwrap().selected_index(), Some(1));
        state.scroll_up(1);
        assert_eq!(state.session.review().unwrap().selected_index(), Some(0));
    }
}
