//! Article panel renderer for proofdesk.
//!
//! The article is flattened into styled runs for the current view mode, then
//! wrapped to the panel width once and cached in `AppState::article` until the
//! session changes. Rendering uses manual virtual scrolling: only
//! `lines[article_scroll..article_scroll + viewport_height]` are materialised per
//! frame, so long articles cost O(viewport).

use std::collections::HashMap;
use std::sync::LazyLock;

use proofdesk_core::suggest::Segment;
use proofdesk_core::{DecisionType, Review, ViewMode};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
};
use similar::{ChangeTag, TextDiff};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

static PS: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static TS: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Marker drawn for zero-width (insertion point) issues.
const INSERTION_MARK: &str = "‸";

/// A styled stretch of article text, optionally belonging to an issue.
#[derive(Debug, Clone, PartialEq)]
struct Run {
    text: String,
    style: Style,
    anchor: Option<String>,
}

impl Run {
    fn plain(text: impl Into<String>, style: Style) -> Self {
        Self { text: text.into(), style, anchor: None }
    }

    fn anchored(text: impl Into<String>, style: Style, issue_id: &str) -> Self {
        Self { text: text.into(), style, anchor: Some(issue_id.to_owned()) }
    }
}

pub fn render_article(frame: &mut Frame, area: Rect, focus: PanelFocus, state: &mut AppState, theme: &Theme) {
    let is_focused = focus == PanelFocus::Article;
    let inner = inner_rect(area);

    let Some(review) = state.session.review() else {
        frame.render_widget(panel_block("Article", is_focused, theme), area);
        return;
    };
    let title = format!("{} · {}", review.item().title, review.view_mode().label());

    if !state.article_is_fresh(inner.width) {
        let runs = article_runs(review, theme);
        let (lines, anchors) = wrap_runs(runs, inner.width);
        state.store_article(lines, anchors, inner.width);
    }

    frame.render_widget(panel_block(title, is_focused, theme), area);

    let Some(view) = state.article.as_ref() else { return };
    if view.lines.is_empty() {
        frame.render_widget(List::new(vec![ListItem::new(Line::raw("(empty article)"))]), inner);
        return;
    }

    let total = view.lines.len();
    let visible_start = state.article_scroll.min(total.saturating_sub(1));
    let visible_end = (visible_start + usize::from(inner.height)).min(total);

    let items: Vec<ListItem> =
        view.lines[visible_start..visible_end].iter().map(|line| ListItem::new(line.clone())).collect();
    frame.render_widget(List::new(items), inner);
}

fn article_runs(review: &Review, theme: &Theme) -> Vec<Run> {
    match review.view_mode() {
        ViewMode::Original => original_runs(review, theme),
        ViewMode::Preview => preview_runs(review, theme),
        ViewMode::Diff => match review.suggested_content() {
            Some(suggested) => word_diff_runs(review.plain().as_str(), &suggested, theme),
            None => vec![Run::plain(
                "No suggestions to apply.",
                Style::default().fg(theme.decision_pending),
            )],
        },
        ViewMode::Rendered => html_runs(&review.item().content),
    }
}

/// Plain text with every surfaced issue highlighted by its decision state.
fn original_runs(review: &Review, theme: &Theme) -> Vec<Run> {
    let selected = review.selected_issue().map(|issue| issue.id.as_str());
    let base = Style::default().fg(theme.text_context);
    review
        .segments()
        .into_iter()
        .map(|segment| match segment {
            Segment::Plain(text) => Run::plain(text, base),
            Segment::Anchored { issue_id, text } => {
                let decision = review.decision_for(issue_id).map(|(d, _)| d.decision_type);
                let style = anchor_style(decision, selected == Some(issue_id), theme);
                let text = if text.is_empty() { INSERTION_MARK } else { text };
                Run::anchored(text, style, issue_id)
            }
        })
        .collect()
}

/// The document as it will read once the reviewer's decisions are applied.
fn preview_runs(review: &Review, theme: &Theme) -> Vec<Run> {
    let selected = review.selected_issue().map(|issue| issue.id.as_str());
    let base = Style::default().fg(theme.text_context);
    review
        .preview()
        .into_iter()
        .map(|piece| match piece.issue_id {
            None => Run::plain(piece.text, base),
            Some(issue_id) => {
                let mut style = match piece.applied {
                    Some(DecisionType::Accepted | DecisionType::Modified) => {
                        Style::default().fg(theme.text_added).add_modifier(Modifier::UNDERLINED)
                    }
                    Some(DecisionType::Rejected) => base,
                    None => Style::default().bg(theme.highlight_pending),
                };
                if selected == Some(issue_id.as_str()) {
                    style = style.bg(theme.highlight_selected).add_modifier(Modifier::BOLD);
                }
                let text = if piece.text.is_empty() { INSERTION_MARK.to_owned() } else { piece.text };
                Run::anchored(text, style, &issue_id)
            }
        })
        .collect()
}

fn anchor_style(decision: Option<DecisionType>, is_selected: bool, theme: &Theme) -> Style {
    let style = match decision {
        None => Style::default().bg(theme.highlight_pending),
        Some(decision) => {
            Style::default().fg(theme.decision(Some(decision))).add_modifier(Modifier::UNDERLINED)
        }
    };
    if is_selected {
        style.bg(theme.highlight_selected).add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

/// Inline word diff of the original against the reconstruction.
///
/// Deleted words are struck through, inserted words colored; the changed
/// characters inside a word are emphasised bold.
fn word_diff_runs(old: &str, new: &str, theme: &Theme) -> Vec<Run> {
    let diff = TextDiff::from_words(old, new);
    let mut runs = Vec::new();

    for op in diff.ops() {
        for change in diff.iter_inline_changes(op) {
            for (emphasized, value) in change.iter_strings_lossy() {
                let style = match change.tag() {
                    ChangeTag::Delete => Style::default()
                        .fg(theme.text_removed)
                        .add_modifier(Modifier::CROSSED_OUT),
                    ChangeTag::Insert => Style::default().fg(theme.text_added),
                    ChangeTag::Equal => Style::default().fg(theme.text_context),
                };
                let style = if emphasized { style.add_modifier(Modifier::BOLD) } else { style };
                runs.push(Run::plain(value.into_owned(), style));
            }
        }
    }
    runs
}

/// Syntax-highlighted stored HTML. Falls back to unstyled text when no
/// highlighting theme is available.
fn html_runs(html: &str) -> Vec<Run> {
    let Some(theme) = TS.themes.get("base16-ocean.dark").or_else(|| TS.themes.values().next()) else {
        return vec![Run::plain(html, Style::default())];
    };
    let syntax = PS.find_syntax_by_extension("html").unwrap_or_else(|| PS.find_syntax_plain_text());
    let mut highlighter = HighlightLines::new(syntax, theme);

    let mut runs = Vec::new();
    for line in LinesWithEndings::from(html) {
        match highlighter.highlight_line(line, &PS) {
            Ok(ranges) if !ranges.is_empty() => {
                runs.extend(ranges.into_iter().map(|(style, text)| Run::plain(text, syntect_style(style))));
            }
            _ => runs.push(Run::plain(line, Style::default())),
        }
    }
    runs
}

/// Converts a syntect style to a ratatui one. The theme background is left
/// out so the panel keeps the terminal background.
fn syntect_style(style: syntect::highlighting::Style) -> Style {
    use syntect::highlighting::FontStyle;

    let mut out = Style::default();
    let fg = style.foreground;
    if fg.a > 0 {
        out = out.fg(Color::Rgb(fg.r, fg.g, fg.b));
    }
    if style.font_style.contains(FontStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    out
}

/// Greedy word wrap of styled runs to `width` columns.
///
/// Returns the lines and, for every anchored run, the line it starts on.
/// Whitespace that falls on a wrap point is dropped; words longer than the
/// width are split.
fn wrap_runs(runs: Vec<Run>, width: u16) -> (Vec<Line<'static>>, HashMap<String, usize>) {
    let width = usize::from(width.max(1));
    let mut wrapper = Wrapper { width, lines: Vec::new(), current: Vec::new(), used: 0 };
    let mut anchors = HashMap::new();

    for run in runs {
        let mut anchor = run.anchor;
        for token in tokens(&run.text) {
            if token == "\n" {
                wrapper.flush();
                continue;
            }
            if let Some(id) = anchor.take() {
                if wrapper.used > 0 && wrapper.used + token.chars().count() > width {
                    wrapper.flush();
                }
                anchors.entry(id).or_insert(wrapper.lines.len());
            }
            wrapper.place(token, run.style);
        }
    }
    if !wrapper.current.is_empty() {
        wrapper.flush();
    }
    (wrapper.lines, anchors)
}

struct Wrapper {
    width: usize,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    used: usize,
}

impl Wrapper {
    fn flush(&mut self) {
        self.lines.push(Line::from(std::mem::take(&mut self.current)));
        self.used = 0;
    }

    fn place(&mut self, token: &str, style: Style) {
        let is_space = token.chars().all(char::is_whitespace);
        let mut rest = token;
        loop {
            let room = self.width - self.used;
            let len = rest.chars().count();
            if len <= room {
                self.push(rest, style);
                self.used += len;
                return;
            }
            if is_space {
                self.flush();
                return;
            }
            if self.used > 0 {
                self.flush();
                continue;
            }
            let split = rest.char_indices().nth(room).map_or(rest.len(), |(i, _)| i);
            self.push(&rest[..split], style);
            self.flush();
            rest = &rest[split..];
        }
    }

    fn push(&mut self, text: &str, style: Style) {
        match self.current.last_mut() {
            Some(last) if last.style == style => last.content.to_mut().push_str(text),
            _ => self.current.push(Span::styled(text.to_owned(), style)),
        }
    }
}

/// Splits text into words, runs of non-newline whitespace, and single `\n`s.
fn tokens(text: &str) -> Vec<&str> {
    #[derive(PartialEq)]
    enum Class {
        Newline,
        Space,
        Word,
    }
    let class = |c: char| match c {
        '\n' => Class::Newline,
        c if c.is_whitespace() => Class::Space,
        _ => Class::Word,
    };

    let mut out = Vec::new();
    let mut start = 0;
    let mut previous: Option<Class> = None;
    for (i, c) in text.char_indices() {
        let current = class(c);
        let boundary = match &previous {
            None => false,
            Some(Class::Newline) => true,
            Some(p) => *p != current,
        };
        if boundary {
            out.push(&text[start..i]);
            start = i;
        }
        previous = Some(current);
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(lines: &[Line<'_>]) -> Vec<String> {
        lines.iter().map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect()).collect()
    }

    #[test]
    fn tokens_split_words_spaces_and_newlines() {
        assert_eq!(tokens("ab  cd\n\nef"), vec!["ab", "  ", "cd", "\n", "\n", "ef"]);
        assert_eq!(tokens(""), Vec::<&str>::new());
    }

    #[test]
    fn wraps_on_word_boundaries_and_drops_wrap_whitespace() {
        let runs = vec![Run::plain("hello world again", Style::default())];
        let (lines, _) = wrap_runs(runs, 11);
        assert_eq!(texts(&lines), vec!["hello world", "again"]);
    }

    #[test]
    fn long_words_are_split() {
        let runs = vec![Run::plain("abcdefghij", Style::default())];
        let (lines, _) = wrap_runs(runs, 4);
        assert_eq!(texts(&lines), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn anchors_record_the_line_an_issue_starts_on() {
        let runs = vec![
            Run::plain("one two ", Style::default()),
            Run::anchored("three", Style::default().bg(Color::Blue), "i1"),
            Run::plain("\nfour ", Style::default()),
            Run::anchored("five", Style::default().bg(Color::Blue), "i2"),
        ];
        let (lines, anchors) = wrap_runs(runs, 10);
        assert_eq!(texts(&lines), vec!["one two ", "three", "four five"]);
        assert_eq!(anchors["i1"], 1);
        assert_eq!(anchors["i2"], 2);
    }

    #[test]
    fn diff_marks_replaced_words() {
        let runs = word_diff_runs("teh cat", "the cat", &Theme::dark());
        let removed: String = runs
            .iter()
            .filter(|r| r.style.add_modifier.contains(Modifier::CROSSED_OUT))
            .map(|r| r.text.as_str())
            .collect();
        let all: String = runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(removed, "teh");
        assert!(all.contains("the"));
        assert!(all.ends_with("cat"));
    }

    #[test]
    fn html_highlighting_keeps_the_markup_text() {
        let html = "<p>Hello <b>world</b></p>\n<p>Again</p>";
        let text: String = html_runs(html).iter().map(|r| r.text.as_str()).collect();
        assert_eq!(text, html);
    }
}
