//! Help overlay renderer for proofdesk.
//!
//! Draws a centred modal box over the panel layout using ratatui's `Clear`
//! widget to erase the background first, inside the same `terminal.draw()`
//! closure as all other panels.

use ratatui::{
    Frame,
    layout::Constraint,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::theme::Theme;

/// Renders the help overlay, scrolled vertically by `help_scroll` rows.
///
/// Skipped on terminals narrower than 60 columns to avoid a zero-height `Rect`.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 60 {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));

    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help · j/k scroll, ? or Esc to dismiss ")
        .border_style(ratatui::style::Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(build_help_text())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn build_help_text() -> Text<'static> {
    Text::from(vec![
        Line::from("Review (selected issue)"),
        Line::from("  a / A         Accept the suggestion"),
        Line::from("  r / R         Reject the suggestion"),
        Line::from("  m             Modify: write your own replacement"),
        Line::from("  e             Edit the rationale"),
        Line::from("  f             Leave feedback (#category notes)"),
        Line::from("  c             Clear the unsaved decision"),
        Line::from("  Space         Add to / remove from the batch"),
        Line::from("  Up / Down     Previous / next issue (no wraparound)"),
        Line::from(""),
        Line::from("Batch"),
        Line::from("  *             Put every issue in the batch"),
        Line::from("  b / B         Accept / reject every batch issue"),
        Line::from("  X             Clear all unsaved decisions and the batch"),
        Line::from(""),
        Line::from("Navigation"),
        Line::from("  j / k         Scroll the focused panel (issue list moves selection)"),
        Line::from("  g / G         Top / bottom of the focused panel"),
        Line::from("  Ctrl-d / u    Half page down / up"),
        Line::from("  Ctrl-f / b    Full page down / up"),
        Line::from("  H / L         Move panel focus left / right"),
        Line::from("  Enter         Show the selected issue in the article"),
        Line::from("  < / >         Shrink / grow the article panel by 5%"),
        Line::from(""),
        Line::from("Article view  (v or Tab cycles)"),
        Line::from("  Original  ->  Preview  ->  Diff  ->  HTML"),
        Line::from(""),
        Line::from("Saving"),
        Line::from("  n             Edit review notes"),
        Line::from("  s             Save decisions"),
        Line::from("  p             Save and mark ready to publish"),
        Line::from("  P             Save and send back to proofreading"),
        Line::from("  F             Save and mark failed"),
        Line::from(""),
        Line::from("Editing"),
        Line::from("  Enter         Commit     Esc  Cancel"),
        Line::from(""),
        Line::from("General"),
        Line::from("  ?             Open / close this help overlay"),
        Line::from("  Esc           Dismiss an error notification, otherwise leave"),
        Line::from("  q             Leave (confirms if there are unsaved changes)"),
    ])
}
