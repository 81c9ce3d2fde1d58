use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Numeric identifier of a worklist item on the server.
pub type WorklistId = i64;

/// Which wire format an issue arrived in. Recorded for diagnostics only; the
/// rest of the engine never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    /// `original_text` / `suggested_text` / `explanation` / `rule_category`.
    Frontend,
    /// `evidence` / `suggestion` / `message` / `category`.
    Api,
}

/// The span an issue claims in the article's plain text.
///
/// Offsets are char indices and may be stale; `text` is the literal original
/// substring used to re-locate the span when the offsets drift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueSpan {
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub text: Option<String>,
}

impl IssueSpan {
    pub fn offsets(&self) -> Option<(usize, usize)> {
        Some((self.start?, self.end?))
    }
}

/// An AI-flagged span with a proposed replacement. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: String,
    pub span: IssueSpan,
    /// Replacement text with HTML entities already decoded. `None` means the
    /// issue carries no concrete replacement.
    pub suggested_text: Option<String>,
    pub category: String,
    pub rule_id: Option<String>,
    pub severity: Option<String>,
    pub confidence: Option<f64>,
    pub explanation: Option<String>,
    pub shape: WireShape,
}

impl Issue {
    pub fn original_text(&self) -> Option<&str> {
        self.span.text.as_deref()
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggested_text.as_deref()
    }
}

/// Reviewer verdict on one issue.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    #[default]
    Accepted,
    Rejected,
    Modified,
}

impl DecisionType {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionType::Accepted => "accepted",
            DecisionType::Rejected => "rejected",
            DecisionType::Modified => "modified",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "accepted" => Some(DecisionType::Accepted),
            "rejected" => Some(DecisionType::Rejected),
            "modified" => Some(DecisionType::Modified),
            _ => None,
        }
    }
}

/// A partial decision as produced by a reviewer action. Missing fields take
/// their defaults when the draft is recorded (`decision_type` -> accepted).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionDraft {
    pub decision_type: Option<DecisionType>,
    pub rationale: Option<String>,
    pub modified_content: Option<String>,
    pub feedback_category: Option<String>,
    pub feedback_notes: Option<String>,
}

impl DecisionDraft {
    pub fn accept() -> Self {
        Self { decision_type: Some(DecisionType::Accepted), ..Self::default() }
    }

    pub fn reject() -> Self {
        Self { decision_type: Some(DecisionType::Rejected), ..Self::default() }
    }

    pub fn modify(content: impl Into<String>) -> Self {
        Self {
            decision_type: Some(DecisionType::Modified),
            modified_content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn with_feedback(mut self, category: Option<String>, notes: impl Into<String>) -> Self {
        self.feedback_category = category;
        self.feedback_notes = Some(notes.into());
        self
    }

    /// Builds a draft that keeps every field of `existing` and overlays the
    /// fields set on `self`.
    pub fn merged_over(self, existing: &Decision) -> Self {
        Self {
            decision_type: self.decision_type.or(Some(existing.decision_type)),
            rationale: self.rationale.or_else(|| existing.decision_rationale.clone()),
            modified_content: self.modified_content.or_else(|| existing.modified_content.clone()),
            feedback_category: self
                .feedback_category
                .or_else(|| existing.feedback_category.clone()),
            feedback_notes: self.feedback_notes.or_else(|| existing.feedback_notes.clone()),
        }
    }
}

/// A recorded decision, shaped exactly like the per-issue wire payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub decision_type: DecisionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_content: Option<String>,
    #[serde(default)]
    pub feedback_provided: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_notes: Option<String>,
}

impl Decision {
    /// Resolves a draft into a full decision. Blank strings count as absent.
    pub fn from_draft(draft: DecisionDraft) -> Self {
        let feedback_category = non_blank(draft.feedback_category);
        let feedback_notes = non_blank(draft.feedback_notes);
        Self {
            decision_type: draft.decision_type.unwrap_or_default(),
            decision_rationale: non_blank(draft.rationale),
            modified_content: non_blank(draft.modified_content),
            feedback_provided: feedback_category.is_some() || feedback_notes.is_some(),
            feedback_category,
            feedback_notes,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// One entry of the batch sent on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPayload {
    pub issue_id: String,
    #[serde(flatten)]
    pub decision: Decision,
}

/// Workflow stage an item moves to when a save carries a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    ReadyToPublish,
    Proofreading,
    Failed,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::ReadyToPublish => "ready_to_publish",
            Transition::Proofreading => "proofreading",
            Transition::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ready_to_publish" => Some(Transition::ReadyToPublish),
            "proofreading" => Some(Transition::Proofreading),
            "failed" => Some(Transition::Failed),
            _ => None,
        }
    }
}

/// Body of the save-decisions call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDecisionsRequest {
    pub decisions: Vec<DecisionPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_to: Option<Transition>,
}

/// Server acknowledgement of a save. All fields are optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub saved_count: Option<usize>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Server-computed issue statistics shown next to the client-side counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofreadingStats {
    #[serde(default)]
    pub total_issues: usize,
    #[serde(default)]
    pub by_category: BTreeMap<String, usize>,
    #[serde(default)]
    pub by_severity: BTreeMap<String, usize>,
}

/// A worklist item after wire normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct WorklistItem {
    pub id: WorklistId,
    pub article_id: Option<i64>,
    pub title: String,
    /// Canonical stored HTML.
    pub content: String,
    pub status: Option<String>,
    pub issues: Vec<Issue>,
    pub stats: ProofreadingStats,
    /// Decisions saved in earlier sessions, latest per issue.
    pub persisted: BTreeMap<String, Decision>,
}

/// Cached server state that a successful save makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey {
    WorklistDetail(WorklistId),
    WorklistList,
    ArticleReview(i64),
}
