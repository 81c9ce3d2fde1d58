//! Responsive 3-panel layout engine for proofdesk.
//!
//! This module is pure layout arithmetic plus the status bar. It is called
//! inside `terminal.draw()` on every render so every frame gets a fresh layout
//! that reflects the current terminal size.
//!
//! # Panel geometry
//!
//! At `>= 120` columns all three panels are visible with widths driven by
//! `AppState.left_pct / center_pct / right_pct` (defaults 25 / 50 / 25).
//! From 80 to 119 columns the detail panel collapses. Below 80 columns the
//! article fills the full width.
//!
//! `Spacing::Overlap(1)` combined with `Block::merge_borders(MergeStrategy::Fuzzy)`
//! makes adjacent panel borders share a single column and merge their junctions.

use proofdesk_core::SessionState;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use crate::app::{AppState, Mode};
use crate::theme::Theme;

/// Returns `[left, center, right, status_bar]` panel `Rect`s for the current frame.
///
/// | Terminal width | Layout |
/// |----------------|--------|
/// | `< 80` cols    | Article only |
/// | `80..120` cols | Issue list + article |
/// | `>= 120` cols  | Issue list + article + detail |
pub fn compute_layout(frame: &Frame, state: &AppState) -> [Rect; 4] {
    let term_width = frame.area().width;

    let [main_area, status_bar] =
        frame.area().layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let constraints = if term_width >= 120 {
        [
            Constraint::Percentage(state.left_pct),
            Constraint::Percentage(state.center_pct),
            Constraint::Percentage(state.right_pct),
        ]
    } else if term_width >= 80 {
        [Constraint::Percentage(state.left_pct + 5), Constraint::Fill(1), Constraint::Length(0)]
    } else {
        [Constraint::Length(0), Constraint::Fill(1), Constraint::Length(0)]
    };
    let horizontal = Layout::horizontal(constraints).spacing(Spacing::Overlap(1));

    let [left, center, right] = main_area.layout(&horizontal);

    [left, center, right, status_bar]
}

/// The inner `Rect` of a panel after removing the 1-cell border on each side.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Builds a bordered `Block` for a panel.
///
/// Focused panels get `BorderType::Thick`; `MergeStrategy::Fuzzy` is required
/// because `Exact` produces incorrect junctions when mixing Thick and Plain.
pub fn panel_block<'a>(title: impl Into<Line<'a>>, is_focused: bool, theme: &Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// Renders the 1-row status bar: mode, session state, view mode, review
/// counts, and the newest notification.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let (mode_text, mode_fg) = match state.mode {
        Mode::Insert => (" INSERT ", theme.status_mode_insert),
        Mode::Normal | Mode::ConfirmQuit | Mode::HelpOverlay => {
            (" NORMAL ", theme.status_mode_normal)
        }
    };

    let mut spans = vec![
        Span::styled(mode_text, Style::default().fg(mode_fg).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {} ", state.session.state().label())),
    ];

    if let Some(review) = state.session.review() {
        let stats = review.stats();
        let decided = stats.accepted + stats.rejected + stats.modified;
        spans.push(Span::styled(
            format!("[{}] ", review.view_mode().label()),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!("{decided}/{} decided", stats.total)));
        spans.push(Span::styled(
            format!("  ✓{}", stats.accepted),
            Style::default().fg(theme.decision_accepted),
        ));
        spans.push(Span::styled(
            format!(" ✗{}", stats.rejected),
            Style::default().fg(theme.decision_rejected),
        ));
        spans.push(Span::styled(
            format!(" ✎{}", stats.modified),
            Style::default().fg(theme.decision_modified),
        ));
        if stats.unsaved > 0 {
            spans.push(Span::raw(format!("  {} unsaved", stats.unsaved)));
        }
        if stats.batch > 0 {
            spans.push(Span::raw(format!("  batch {}", stats.batch)));
        }
        if stats.hidden + stats.unresolved > 0 {
            spans.push(Span::raw(format!(
                "  {} hidden, {} unplaced",
                stats.hidden, stats.unresolved
            )));
        }
    }
    if matches!(state.session.state(), SessionState::Saving { .. }) {
        spans.push(Span::styled("  saving…", Style::default().add_modifier(Modifier::ITALIC)));
    }

    let [left, right] = area.layout(&Layout::horizontal([Constraint::Fill(3), Constraint::Fill(2)]));

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        left,
    );

    let toast = state.latest_toast().map(|notice| {
        Line::from(Span::styled(
            format!("{} ", notice.message),
            Style::default().fg(theme.notice(notice.level)).add_modifier(Modifier::BOLD),
        ))
        .right_aligned()
    });
    frame.render_widget(
        Paragraph::new(toast.unwrap_or_default()).style(Style::default().bg(theme.status_bar_bg)),
        right,
    );
}
