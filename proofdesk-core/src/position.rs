//! Position Resolver: anchors issues to char ranges in the live plain text.
//!
//! Stored offsets go stale whenever the article is re-rendered or the issues
//! were generated against a slightly different projection. Resolution first
//! trusts the stored offsets when the text under them still matches, then
//! falls back to a literal search for the issue's original text. Issues that
//! cannot be located are reported as unresolved; they stay listed and
//! decidable but get no highlight.

use tracing::debug;

use crate::text::{normalize_whitespace, PlainText};
use crate::types::Issue;

/// How a position was found. The derived ordering doubles as overlap
/// priority: `Primary` outranks `Fallback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchStrategy {
    /// The issue's stored offsets were confirmed against the text.
    Primary,
    /// The stored offsets did not match; found by searching for the text.
    Fallback,
}

/// A concrete `[start, end)` char range for one issue.
///
/// Invariant: `start <= end <= plain.len_chars()` for the text it was
/// resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPosition {
    pub issue_id: String,
    pub start: usize,
    pub end: usize,
    pub strategy: MatchStrategy,
}

impl ResolvedPosition {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Half-open interval intersection.
    pub fn overlaps(&self, other: &ResolvedPosition) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Two positions cannot both be surfaced when they intersect or share a
    /// start (a zero-width insertion point at the start of another range
    /// would otherwise be ambiguous to splice).
    pub fn conflicts_with(&self, other: &ResolvedPosition) -> bool {
        self.start == other.start || self.overlaps(other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedPosition),
    Unresolved,
}

impl Resolution {
    pub fn position(&self) -> Option<&ResolvedPosition> {
        match self {
            Resolution::Resolved(position) => Some(position),
            Resolution::Unresolved => None,
        }
    }
}

/// Resolves one issue against `plain`. Pure; never panics on bad offsets.
pub fn resolve(plain: &PlainText, issue: &Issue) -> Resolution {
    if let Some((start, end)) = confirm_stored_offsets(plain, issue) {
        return Resolution::Resolved(ResolvedPosition {
            issue_id: issue.id.clone(),
            start,
            end,
            strategy: MatchStrategy::Primary,
        });
    }

    let found = issue.original_text().and_then(|needle| plain.find(needle));
    match found {
        Some((start, end)) => {
            debug!(
                issue_id = %issue.id,
                claimed = ?issue.span.offsets(),
                start,
                end,
                "stored offsets stale, anchored by search"
            );
            Resolution::Resolved(ResolvedPosition {
                issue_id: issue.id.clone(),
                start,
                end,
                strategy: MatchStrategy::Fallback,
            })
        }
        None => {
            debug!(issue_id = %issue.id, "issue could not be anchored");
            Resolution::Unresolved
        }
    }
}

/// Resolves every issue, preserving list order.
pub fn resolve_all(plain: &PlainText, issues: &[Issue]) -> Vec<(String, Resolution)> {
    issues.iter().map(|issue| (issue.id.clone(), resolve(plain, issue))).collect()
}

fn confirm_stored_offsets(plain: &PlainText, issue: &Issue) -> Option<(usize, usize)> {
    let (start, end) = issue.span.offsets()?;
    let actual = plain.slice(start, end)?;
    match issue.original_text() {
        None => Some((start, end)),
        Some(expected) if actual == expected => Some((start, end)),
        Some(expected) if normalize_whitespace(actual) == normalize_whitespace(expected) => {
            Some((start, end))
        }
        Some(_) => None,
    }
}
