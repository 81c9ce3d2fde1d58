//! Detail panel: everything known about the selected issue, its decision,
//! and the session's review notes.

use proofdesk_core::{DecisionOrigin, Issue, Placement, Review};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
};

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::panel_block;

pub fn render_detail(frame: &mut Frame, area: Rect, focus: PanelFocus, state: &AppState, theme: &Theme) {
    let block = panel_block("Detail", focus == PanelFocus::Detail, theme);
    let text = match state.session.review() {
        Some(review) => detail_text(review, theme),
        None => Text::default(),
    };
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }).scroll((state.detail_scroll, 0)),
        area,
    );
}

fn detail_text(review: &Review, theme: &Theme) -> Text<'static> {
    let heading = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(theme.decision_pending);
    let mut lines: Vec<Line<'static>> = Vec::new();

    match review.selected_issue() {
        Some(issue) => issue_lines(review, issue, theme, &mut lines),
        None => lines.push(Line::styled("No issue selected", dim)),
    }

    lines.push(Line::raw(""));
    lines.push(Line::styled("Review notes", heading));
    if review.notes().trim().is_empty() {
        lines.push(Line::styled("  (none, press n to write)", dim));
    } else {
        lines.extend(review.notes().lines().map(|l| Line::raw(format!("  {l}"))));
    }
    Text::from(lines)
}

fn issue_lines(review: &Review, issue: &Issue, theme: &Theme, lines: &mut Vec<Line<'static>>) {
    let heading = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(theme.decision_pending);

    lines.push(Line::from(vec![
        Span::styled(
            issue.category.clone(),
            Style::default()
                .fg(theme.severity(issue.severity.as_deref()))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  #{}", issue.id), dim),
    ]));
    let mut facts = Vec::new();
    if let Some(severity) = &issue.severity {
        facts.push(format!("severity {severity}"));
    }
    if let Some(confidence) = issue.confidence {
        facts.push(format!("confidence {:.0}%", confidence * 100.0));
    }
    if let Some(rule) = &issue.rule_id {
        facts.push(format!("rule {rule}"));
    }
    if !facts.is_empty() {
        lines.push(Line::styled(facts.join(" · "), dim));
    }

    let placement = match review.placement(&issue.id) {
        Some(Placement::Highlighted(position)) => {
            format!("highlighted at {}..{}", position.start, position.end)
        }
        Some(Placement::Hidden(position)) => format!(
            "found at {}..{} but overlaps another issue; not highlighted",
            position.start, position.end
        ),
        Some(Placement::Unresolved) | None => "could not be located in the article".to_owned(),
    };
    lines.push(Line::styled(placement, dim));

    lines.push(Line::raw(""));
    lines.push(Line::styled("Original", heading));
    lines.push(Line::raw(format!("  {}", issue.original_text().unwrap_or("(none)"))));
    lines.push(Line::styled("Suggestion", heading));
    lines.push(Line::styled(
        format!("  {}", issue.suggestion().unwrap_or("(no replacement)")),
        Style::default().fg(theme.text_added),
    ));
    if let Some(explanation) = &issue.explanation {
        lines.push(Line::styled("Why", heading));
        lines.push(Line::raw(format!("  {explanation}")));
    }

    lines.push(Line::raw(""));
    lines.push(Line::styled("Decision", heading));
    match review.decision_for(&issue.id) {
        None => lines.push(Line::styled("  pending (a accept, r reject, m modify)", dim)),
        Some((decision, origin)) => {
            let origin = match origin {
                DecisionOrigin::Unsaved => "unsaved",
                DecisionOrigin::Saved => "saved",
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {}", decision.decision_type.as_str()),
                    Style::default().fg(theme.decision(Some(decision.decision_type))).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" ({origin})"), dim),
            ]));
            if let Some(content) = &decision.modified_content {
                lines.push(Line::raw(format!("  replacement: {content}")));
            }
            if let Some(rationale) = &decision.decision_rationale {
                lines.push(Line::raw(format!("  rationale: {rationale}")));
            }
            if decision.feedback_provided {
                let category = decision.feedback_category.as_deref().unwrap_or("general");
                let notes = decision.feedback_notes.as_deref().unwrap_or("");
                lines.push(Line::raw(format!("  feedback [{category}]: {notes}")));
            }
        }
    }
    if review.is_in_batch(&issue.id) {
        lines.push(Line::styled("  in batch selection", Style::default().fg(theme.border_active)));
    }
}
