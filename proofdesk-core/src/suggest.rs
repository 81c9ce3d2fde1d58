//! Suggested-Content Builder and the text selectors the views are built from.
//!
//! All functions here take the overlap-pruned positions (ascending, disjoint).
//! Ranges that violate that contract are skipped rather than trusted.

use std::collections::HashMap;

use tracing::debug;

use crate::position::ResolvedPosition;
use crate::text::PlainText;
use crate::types::{Decision, DecisionType, Issue};

/// Reconstructs the document as if every surfaced suggestion were applied.
///
/// Reviewer decisions are deliberately ignored; this feeds the diff view,
/// which always compares against "all suggestions applied". Returns `None`
/// when there is no content or no issues so the caller can fall back to an
/// original-only display.
pub fn build_suggested_content(
    plain: &PlainText,
    kept: &[ResolvedPosition],
    issues: &[Issue],
) -> Option<String> {
    if plain.is_empty() || issues.is_empty() {
        return None;
    }
    let by_id = index_issues(issues);

    let mut out = String::with_capacity(plain.as_str().len());
    let mut cursor = 0;
    for position in usable(plain, kept) {
        out.push_str(plain.slice(cursor, position.start).unwrap_or_default());
        let original = plain.slice(position.start, position.end).unwrap_or_default();
        let replacement = by_id
            .get(position.issue_id.as_str())
            .and_then(|issue| issue.suggestion())
            .unwrap_or(original);
        out.push_str(replacement);
        cursor = position.end;
    }
    out.push_str(plain.slice(cursor, plain.len_chars()).unwrap_or_default());
    Some(out)
}

/// A run of the plain text, either untouched or anchored to an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    /// `text` is empty for zero-width (insertion point) anchors.
    Anchored { issue_id: &'a str, text: &'a str },
}

/// Splits `plain` into alternating plain and anchored runs for highlighting.
pub fn segments<'a>(plain: &'a PlainText, kept: &'a [ResolvedPosition]) -> Vec<Segment<'a>> {
    let mut out = Vec::with_capacity(kept.len() * 2 + 1);
    let mut cursor = 0;
    for position in usable(plain, kept) {
        if position.start > cursor {
            out.push(Segment::Plain(plain.slice(cursor, position.start).unwrap_or_default()));
        }
        out.push(Segment::Anchored {
            issue_id: &position.issue_id,
            text: plain.slice(position.start, position.end).unwrap_or_default(),
        });
        cursor = position.end;
    }
    if cursor < plain.len_chars() {
        out.push(Segment::Plain(plain.slice(cursor, plain.len_chars()).unwrap_or_default()));
    }
    out
}

/// One run of the decision-gated preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewPiece {
    pub text: String,
    pub issue_id: Option<String>,
    /// The reviewer decision recorded for this run, if any.
    pub applied: Option<DecisionType>,
}

/// Renders the document with reviewer decisions applied: accepted issues take
/// their suggestion, modified issues take the reviewer's content, rejected
/// and undecided issues keep the original text.
pub fn build_preview<'d>(
    plain: &PlainText,
    kept: &[ResolvedPosition],
    issues: &[Issue],
    decision_of: impl Fn(&str) -> Option<&'d Decision>,
) -> Vec<PreviewPiece> {
    let by_id = index_issues(issues);
    let mut pieces = Vec::new();
    let mut cursor = 0;
    for position in usable(plain, kept) {
        if position.start > cursor {
            pieces.push(PreviewPiece {
                text: plain.slice(cursor, position.start).unwrap_or_default().to_owned(),
                issue_id: None,
                applied: None,
            });
        }
        let original = plain.slice(position.start, position.end).unwrap_or_default();
        let issue = by_id.get(position.issue_id.as_str());
        let decision = decision_of(&position.issue_id);
        let (text, applied) = match decision.map(|d| (d.decision_type, d)) {
            Some((DecisionType::Accepted, _)) => (
                issue.and_then(|i| i.suggestion()).unwrap_or(original),
                Some(DecisionType::Accepted),
            ),
            Some((DecisionType::Modified, d)) => (
                d.modified_content.as_deref().unwrap_or(original),
                Some(DecisionType::Modified),
            ),
            Some((DecisionType::Rejected, _)) => (original, Some(DecisionType::Rejected)),
            None => (original, None),
        };
        pieces.push(PreviewPiece {
            text: text.to_owned(),
            issue_id: Some(position.issue_id.clone()),
            applied,
        });
        cursor = position.end;
    }
    if cursor < plain.len_chars() {
        pieces.push(PreviewPiece {
            text: plain.slice(cursor, plain.len_chars()).unwrap_or_default().to_owned(),
            issue_id: None,
            applied: None,
        });
    }
    pieces
}

pub fn preview_text(pieces: &[PreviewPiece]) -> String {
    pieces.iter().map(|p| p.text.as_str()).collect()
}

fn index_issues(issues: &[Issue]) -> HashMap<&str, &Issue> {
    issues.iter().map(|issue| (issue.id.as_str(), issue)).collect()
}

/// Yields the positions that respect the ascending/disjoint/in-bounds
/// contract, skipping any that do not.
fn usable<'a>(
    plain: &'a PlainText,
    kept: &'a [ResolvedPosition],
) -> impl Iterator<Item = &'a ResolvedPosition> + 'a {
    let len = plain.len_chars();
    let mut cursor = 0usize;
    let mut last_start: Option<usize> = None;
    kept.iter().filter(move |position| {
        let in_order = position.start >= cursor && last_start.map_or(true, |s| position.start > s);
        let in_bounds = position.start <= position.end && position.end <= len;
        if in_order && in_bounds {
            cursor = position.end;
            last_start = Some(position.start);
            true
        } else {
            debug!(issue_id = %position.issue_id, "skipping out-of-order position");
            false
        }
    })
}
