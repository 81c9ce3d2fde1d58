//! Modal dialogs and the full-screen states shown when there is no review
//! to display (loading, error, empty, closed).

use proofdesk_core::SessionState;
use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::app::{AppState, Editor};
use crate::theme::Theme;

pub fn render_confirm_quit(frame: &mut Frame, theme: &Theme) {
    let area = frame.area().centered(Constraint::Length(52), Constraint::Length(5));
    frame.render_widget(Clear, area);
    let block = Block::bordered()
        .title(" Unsaved changes ")
        .border_style(Style::default().fg(theme.toast_warning));
    let text = Text::from(vec![
        Line::from("Leave and discard unsaved decisions and notes?"),
        Line::from(""),
        Line::from("y  leave      n / Esc  stay").centered(),
    ]);
    frame.render_widget(Paragraph::new(text).block(block), area);
}

/// The inline editor, with a block cursor at the end of the buffer.
pub fn render_editor(frame: &mut Frame, editor: &Editor, theme: &Theme) {
    let area = frame.area().centered(Constraint::Percentage(60), Constraint::Length(8));
    frame.render_widget(Clear, area);
    let block = Block::bordered()
        .title(editor.target.title())
        .title_bottom(Line::from(" Enter commit · Esc cancel ").right_aligned())
        .border_style(Style::default().fg(theme.status_mode_insert));
    let mut text = Text::raw(editor.buffer.clone());
    text.push_span(ratatui::text::Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED)));
    frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: false }), area);
}

/// Fills `area` with a message for sessions that have no review to show.
pub fn render_session_screen(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let (title, color, body): (&str, _, Vec<String>) = match state.session.state() {
        SessionState::Loading { worklist_id } => (
            " Loading ",
            theme.toast_info,
            vec![format!("Fetching worklist item {worklist_id}…")],
        ),
        SessionState::Error { worklist_id, message } => (
            " Error ",
            theme.toast_error,
            vec![
                format!("Worklist item {worklist_id} could not be reviewed."),
                String::new(),
                message.clone(),
                String::new(),
                "Press q to leave.".to_owned(),
            ],
        ),
        SessionState::Empty { item } => (
            " Nothing to review ",
            theme.toast_success,
            vec![
                item.title.clone(),
                String::new(),
                "No proofreading issues were found for this article.".to_owned(),
                String::new(),
                "Press q to leave.".to_owned(),
            ],
        ),
        SessionState::Closed { transition, .. } => (
            " Done ",
            theme.toast_success,
            vec![format!("Decisions saved; item moved to {}.", transition.as_str())],
        ),
        SessionState::Reviewing(_) | SessionState::Saving { .. } => return,
    };

    let block = Block::bordered().title(title).border_style(Style::default().fg(color));
    let text = Text::from(body.into_iter().map(Line::from).collect::<Vec<_>>()).centered();
    let dialog = area.centered(Constraint::Percentage(70), Constraint::Length(9));
    frame.render_widget(Clear, dialog);
    frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: false }), dialog);
}
