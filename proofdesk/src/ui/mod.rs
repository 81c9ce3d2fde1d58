//! UI rendering module for proofdesk.
//!
//! This is the module root for `ui/`. It exposes `render()` as the single entry
//! point called by the event loop's `terminal.draw()` closure.
//!
//! Layout arithmetic and the status bar live in `layout.rs`; each panel has its
//! own module, and modal overlays live in `dialogs.rs` and `help.rs`.

mod article_view;
mod detail;
mod dialogs;
mod help;
mod issue_list;
pub mod keybindings;
mod layout;

use ratatui::Frame;

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use layout::{compute_layout, inner_rect, render_status_bar};

/// Renders one complete frame.
///
/// Called exactly once per `AppEvent::Render` inside `terminal.draw()`.
/// Viewport heights and panel rects are written back into `state` so that the
/// next keypress can compute paging distances and mouse hits; the one-frame
/// lag is imperceptible.
pub fn render(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    let [left, center, right, status_bar] = compute_layout(frame, state);

    state.issue_list_viewport_height = inner_rect(left).height;
    state.article_viewport_height = inner_rect(center).height;
    state.detail_viewport_height = inner_rect(right).height;
    state.panel_rects = [left, center, right];

    let focus = state.focus;

    if state.session.review().is_some() {
        if left.width > 0 {
            issue_list::render_issue_list(frame, left, focus, state, theme);
        }
        article_view::render_article(frame, center, focus, state, theme);
        if right.width > 0 {
            detail::render_detail(frame, right, focus, state, theme);
        }
    } else {
        dialogs::render_session_screen(frame, frame.area(), state, theme);
    }

    render_status_bar(frame, status_bar, state, theme);

    match state.mode {
        Mode::HelpOverlay => help::render_help_overlay(frame, theme, state.help_scroll),
        Mode::ConfirmQuit => dialogs::render_confirm_quit(frame, theme),
        Mode::Insert => {
            if let Some(editor) = &state.editor {
                dialogs::render_editor(frame, editor, theme);
            }
        }
        Mode::Normal => {}
    }
}
