//! Issue list panel renderer for proofdesk.
//!
//! One row per issue in list order: batch mark, decision badge, severity-colored
//! category, and the original text with its suggestion. Issues that could not
//! be highlighted are dimmed so the reviewer knows the article will not show them.

use proofdesk_core::{DecisionOrigin, DecisionType, Issue, Placement, Review};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
};

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::panel_block;

const SNIPPET_CHARS: usize = 24;

/// Renders the issue list with `render_stateful_widget` so the selection
/// highlight and offset track the session's selected issue.
pub fn render_issue_list(frame: &mut Frame, area: Rect, focus: PanelFocus, state: &mut AppState, theme: &Theme) {
    let is_focused = focus == PanelFocus::IssueList;
    let Some(review) = state.session.review() else {
        frame.render_widget(panel_block("Issues", is_focused, theme), area);
        return;
    };

    let title = format!("Issues ({})", review.issues().len());
    let items: Vec<ListItem> =
        review.issues().iter().map(|issue| issue_item(review, issue, theme)).collect();
    let selected = review.selected_index();

    let list = List::new(items)
        .block(panel_block(title, is_focused, theme))
        .highlight_style(Style::default().fg(theme.border_active).add_modifier(Modifier::REVERSED));

    state.issue_list_state.select(selected);
    frame.render_stateful_widget(list, area, &mut state.issue_list_state);
}

fn issue_item(review: &Review, issue: &Issue, theme: &Theme) -> ListItem<'static> {
    let batch_mark = if review.is_in_batch(&issue.id) {
        Span::styled("[x] ", Style::default().fg(theme.border_active))
    } else {
        Span::styled("[ ] ", Style::default().fg(theme.decision_pending))
    };

    let decision = review.decision_for(&issue.id);
    let decision_type = decision.map(|(d, _)| d.decision_type);
    let glyph = match decision_type {
        Some(DecisionType::Accepted) => "✓",
        Some(DecisionType::Rejected) => "✗",
        Some(DecisionType::Modified) => "✎",
        None => "·",
    };
    let mut badge_style = Style::default().fg(theme.decision(decision_type));
    if matches!(decision, Some((_, DecisionOrigin::Unsaved))) {
        badge_style = badge_style.add_modifier(Modifier::BOLD);
    }
    let unsaved = if matches!(decision, Some((_, DecisionOrigin::Unsaved))) { "*" } else { " " };

    let category = Span::styled(
        format!("{} ", issue.category),
        Style::default().fg(theme.severity(issue.severity.as_deref())),
    );

    let original = issue.original_text().map(snippet).unwrap_or_default();
    let change = match issue.suggestion() {
        Some(suggestion) => format!("{original} → {}", snippet(suggestion)),
        None => original,
    };
    let mut change_style = Style::default();
    match review.placement(&issue.id) {
        Some(Placement::Highlighted(_)) => {}
        Some(Placement::Hidden(_)) | Some(Placement::Unresolved) | None => {
            change_style = change_style.add_modifier(Modifier::DIM);
        }
    }

    ListItem::new(Line::from(vec![
        batch_mark,
        Span::styled(format!("{glyph}{unsaved}"), badge_style),
        category,
        Span::styled(change, change_style),
    ]))
}

/// Truncates on a char boundary, marking the cut with an ellipsis.
fn snippet(text: &str) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= SNIPPET_CHARS {
        return single_line;
    }
    let mut out: String = single_line.chars().take(SNIPPET_CHARS - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_truncates_on_char_boundaries() {
        assert_eq!(snippet("short"), "short");
        let long = "é".repeat(40);
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), SNIPPET_CHARS);
        assert!(cut.ends_with('…'));
    }
}
