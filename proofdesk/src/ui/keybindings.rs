//! Keybinding dispatcher for proofdesk.
//!
//! Translates raw crossterm `KeyEvent`s into `AppState` mutations and returns a
//! `KeyAction` telling the event loop whether to continue or quit. The dispatcher
//! branches first on `state.mode` so that HelpOverlay, ConfirmQuit, Insert, and
//! Normal all have isolated handler functions.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use proofdesk_core::{DecisionType, LeaveCheck, ReviewCommand, Transition};
use ratatui::layout::Position;

use crate::app::{AppState, EditTarget, Mode, PanelFocus};

/// Control-flow signal returned from the key dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Continue the event loop normally.
    Continue,
    /// Leave the session and exit.
    Quit,
}

/// Modifiers that disable the single-key review commands.
const COMMAND_BLOCKERS: KeyModifiers =
    KeyModifiers::CONTROL.union(KeyModifiers::ALT).union(KeyModifiers::SUPER);

/// Dispatches a key event to the handler matching the current mode.
pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::ConfirmQuit => handle_confirm_quit(key, state),
        Mode::Normal => handle_normal(key, state),
        Mode::Insert => handle_insert(key, state),
    }
}

/// The keyboard contract: `a`/`A` accept, `r`/`R` reject, Space toggles the
/// batch, Up/Down move the selection. Shift is allowed; Ctrl, Alt, and Super
/// disable every binding.
pub fn review_command(key: &KeyEvent) -> Option<ReviewCommand> {
    if key.modifiers.intersects(COMMAND_BLOCKERS) {
        return None;
    }
    match key.code {
        KeyCode::Char('a' | 'A') => Some(ReviewCommand::Accept),
        KeyCode::Char('r' | 'R') => Some(ReviewCommand::Reject),
        KeyCode::Char(' ') => Some(ReviewCommand::ToggleBatch),
        KeyCode::Up => Some(ReviewCommand::SelectPrevious),
        KeyCode::Down => Some(ReviewCommand::SelectNext),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if state.session.review().is_none() {
        return handle_without_review(key, state);
    }
    if let Some(command) = review_command(&key) {
        state.apply_command(command);
        return KeyAction::Continue;
    }
    if let Some(action) = handle_scroll_key(key, state) {
        return action;
    }
    if key.modifiers.intersects(COMMAND_BLOCKERS) {
        return KeyAction::Continue;
    }

    match key.code {
        // Panel focus and geometry
        KeyCode::Char('H') => state.focus = state.focus.prev(),
        KeyCode::Char('L') => state.focus = state.focus.next(),
        KeyCode::Char('<') => state.shrink_article_panel(),
        KeyCode::Char('>') => state.grow_article_panel(),
        KeyCode::Enter => state.jump_to_selected_issue(),
        KeyCode::Tab | KeyCode::Char('v') => state.cycle_view_mode(),

        // Decisions
        KeyCode::Char('m') => state.open_editor(EditTarget::Modify),
        KeyCode::Char('e') => state.open_editor(EditTarget::Rationale),
        KeyCode::Char('f') => state.open_editor(EditTarget::Feedback),
        KeyCode::Char('n') => state.open_notes_editor(),
        KeyCode::Char('c') => state.clear_selected_decision(),
        KeyCode::Char('X') => state.clear_all_decisions(),

        // Batch
        KeyCode::Char('*') => state.select_all_into_batch(),
        KeyCode::Char('b') => state.batch_decision(DecisionType::Accepted),
        KeyCode::Char('B') => state.batch_decision(DecisionType::Rejected),

        // Saving
        KeyCode::Char('s') => state.request_save(None),
        KeyCode::Char('p') => state.request_save(Some(Transition::ReadyToPublish)),
        KeyCode::Char('P') => state.request_save(Some(Transition::Proofreading)),
        KeyCode::Char('F') => state.request_save(Some(Transition::Failed)),

        KeyCode::Char('?') => open_help(state),
        KeyCode::Char('q') => return leave(state),
        KeyCode::Esc => {
            if !state.dismiss_toast() {
                return leave(state);
            }
        }
        _ => {}
    }
    KeyAction::Continue
}

/// Loading, error, empty, and closed screens only offer help and leaving.
fn handle_without_review(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('?') => {
            open_help(state);
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

fn open_help(state: &mut AppState) {
    state.help_scroll = 0;
    state.mode = Mode::HelpOverlay;
}

/// Leaves immediately, or asks first when there are unsaved changes.
fn leave(state: &mut AppState) -> KeyAction {
    match state.session.leave_check() {
        LeaveCheck::Leave => KeyAction::Quit,
        LeaveCheck::ConfirmDiscard => {
            state.mode = Mode::ConfirmQuit;
            KeyAction::Continue
        }
    }
}

/// Scroll keys: j / k / g / G and the Ctrl paging combos.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('j') if !ctrl => state.scroll_down(1),
        KeyCode::Char('k') if !ctrl => state.scroll_up(1),
        KeyCode::Char('g') if !ctrl => state.scroll_top(),
        KeyCode::Char('G') if !ctrl => state.scroll_bottom(),
        KeyCode::Char('d') if ctrl => state.half_page_down(),
        KeyCode::Char('u') if ctrl => state.half_page_up(),
        KeyCode::Char('f') if ctrl => state.full_page_down(),
        KeyCode::Char('b') if ctrl => state.full_page_up(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

// ---------------------------------------------------------------------------
// HelpOverlay mode
// ---------------------------------------------------------------------------

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.help_scroll = state.help_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => state.help_scroll = state.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('G') => state.help_scroll = u16::MAX,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// ConfirmQuit mode
// ---------------------------------------------------------------------------

/// `y` leaves; `n` or `Esc` cancels with no side effects.
fn handle_confirm_quit(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => KeyAction::Quit,
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            state.mode = Mode::Normal;
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

// ---------------------------------------------------------------------------
// Insert mode
// ---------------------------------------------------------------------------

/// Line editing for the inline editor. `Ctrl-u` clears the buffer.
fn handle_insert(key: KeyEvent, state: &mut AppState) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => state.cancel_editor(),
        KeyCode::Enter => state.commit_editor(),
        KeyCode::Char('u') if ctrl => {
            if let Some(editor) = state.editor.as_mut() {
                editor.buffer.clear();
            }
        }
        KeyCode::Backspace => {
            if let Some(editor) = state.editor.as_mut() {
                editor.buffer.pop();
            }
        }
        KeyCode::Char(c) if !key.modifiers.intersects(COMMAND_BLOCKERS) => {
            if let Some(editor) = state.editor.as_mut() {
                editor.buffer.push(c);
            }
        }
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Mouse events
// ---------------------------------------------------------------------------

/// Left click focuses a panel (and selects the clicked issue in the list);
/// the wheel scrolls the focused panel or the help overlay by 3 lines.
pub fn handle_mouse(mouse: MouseEvent, state: &mut AppState) -> KeyAction {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => handle_mouse_click(mouse.column, mouse.row, state),
        MouseEventKind::ScrollUp if state.mode == Mode::HelpOverlay => {
            state.help_scroll = state.help_scroll.saturating_sub(3);
        }
        MouseEventKind::ScrollDown if state.mode == Mode::HelpOverlay => {
            state.help_scroll = state.help_scroll.saturating_add(3);
        }
        MouseEventKind::ScrollUp if state.mode == Mode::Normal => state.scroll_up(3),
        MouseEventKind::ScrollDown if state.mode == Mode::Normal => state.scroll_down(3),
        _ => {}
    }
    KeyAction::Continue
}

/// Collapsed (zero-width) panels cannot receive focus.
fn handle_mouse_click(col: u16, row: u16, state: &mut AppState) {
    if state.mode != Mode::Normal {
        return;
    }
    let pos = Position { x: col, y: row };
    let [left, center, right] = state.panel_rects;

    if left.width > 0 && left.contains(pos) {
        state.focus = PanelFocus::IssueList;
        // Row 0 is the top border.
        if row > left.y && row < left.bottom().saturating_sub(1) {
            let index = state.issue_list_state.offset() + usize::from(row - left.y - 1);
            state.select_issue_at(index);
        }
    } else if center.width > 0 && center.contains(pos) {
        state.focus = PanelFocus::Article;
    } else if right.width > 0 && right.contains(pos) {
        state.focus = PanelFocus::Detail;
    }
}
