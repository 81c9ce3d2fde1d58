//! Boundary adapter for worklist payloads.
//!
//! Issues reach the client in two shapes: the "frontend" shape
//! (`original_text`, `suggested_text`, `explanation`, `rule_category`) and
//! the "API" shape (`evidence`, `suggestion`, `message`, `category`). The
//! shape is detected once per issue from its distinguishing fields and
//! normalised into [`Issue`]; nothing downstream sees wire shapes.

use std::collections::{BTreeMap, HashSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ApiError;
use crate::text::decode_entities;
use crate::types::{
    Decision, DecisionPayload, Issue, IssueSpan, ProofreadingStats, WireShape, WorklistId,
    WorklistItem,
};

const FRONTEND_FIELDS: &[&str] = &["original_text", "suggested_text", "rule_category"];
const API_FIELDS: &[&str] = &["evidence", "suggestion", "category"];
/// Only consulted when none of the primary fields are present.
const FRONTEND_HINTS: &[&str] = &["explanation"];
const API_HINTS: &[&str] = &["message"];
const DEFAULT_CATEGORY: &str = "general";

/// A worklist item exactly as served. Issues are kept as raw JSON until
/// [`normalize_item`] so both wire shapes survive storage untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawWorklistItem {
    pub id: WorklistId,
    #[serde(default)]
    pub article_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub proofreading_issues: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub proofreading_stats: Option<ProofreadingStats>,
    /// Kept raw so one unrecognised entry cannot reject the whole item.
    #[serde(default)]
    pub proofreading_decisions: Vec<Value>,
}

/// Reads an optional field, treating a value of the wrong type as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(text) => text,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawRange {
    #[serde(default, deserialize_with = "lenient")]
    start: Option<usize>,
    #[serde(default, deserialize_with = "lenient")]
    end: Option<usize>,
}

/// `original_text` is either the literal substring or an object carrying the
/// substring together with its claimed offsets.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOriginalText {
    Literal(String),
    Span {
        #[serde(default, deserialize_with = "lenient")]
        text: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        start: Option<usize>,
        #[serde(default, deserialize_with = "lenient")]
        end: Option<usize>,
    },
}

#[derive(Debug, Deserialize)]
struct FrontendIssue {
    id: RawId,
    #[serde(default, deserialize_with = "lenient")]
    original_text: Option<RawOriginalText>,
    #[serde(default, deserialize_with = "lenient")]
    suggested_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    explanation: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    rule_category: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    rule_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    severity: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    position: Option<RawRange>,
    #[serde(default, deserialize_with = "lenient")]
    start: Option<usize>,
    #[serde(default, deserialize_with = "lenient")]
    end: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    id: RawId,
    #[serde(default, deserialize_with = "lenient")]
    evidence: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    suggestion: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    message: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    rule_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    severity: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    location: Option<RawRange>,
    #[serde(default, deserialize_with = "lenient")]
    start: Option<usize>,
    #[serde(default, deserialize_with = "lenient")]
    end: Option<usize>,
}

/// Identifies the wire shape of one issue object by its distinguishing
/// fields. Frontend fields win when both sets are present; the explanation
/// fields (`explanation` / `message`) only decide when nothing else does.
pub fn detect_shape(value: &Value) -> Option<WireShape> {
    let object = value.as_object()?;
    let has_any = |fields: &[&str]| fields.iter().any(|field| object.contains_key(*field));
    if has_any(FRONTEND_FIELDS) {
        Some(WireShape::Frontend)
    } else if has_any(API_FIELDS) {
        Some(WireShape::Api)
    } else if has_any(FRONTEND_HINTS) {
        Some(WireShape::Frontend)
    } else if has_any(API_HINTS) {
        Some(WireShape::Api)
    } else {
        None
    }
}

/// Normalises one raw issue into the internal [`Issue`].
///
/// Optional fields of the wrong type are dropped rather than failing the
/// issue, so a bad offset only costs the highlight.
///
/// # Errors
///
/// `ApiError::Decode` when the shape cannot be detected or the issue has no
/// usable `id`.
pub fn normalize_issue(value: &Value) -> Result<Issue, ApiError> {
    let shape = detect_shape(value)
        .ok_or_else(|| ApiError::Decode("issue matches neither known wire shape".to_owned()))?;
    match shape {
        WireShape::Frontend => {
            let raw: FrontendIssue = serde_json::from_value(value.clone())
                .map_err(|e| ApiError::Decode(format!("frontend issue: {e}")))?;
            Ok(from_frontend(raw))
        }
        WireShape::Api => {
            let raw: ApiIssue = serde_json::from_value(value.clone())
                .map_err(|e| ApiError::Decode(format!("api issue: {e}")))?;
            Ok(from_api(raw))
        }
    }
}

fn from_frontend(raw: FrontendIssue) -> Issue {
    let position = raw.position.unwrap_or_default();
    let (text, embedded_start, embedded_end) = match raw.original_text {
        Some(RawOriginalText::Literal(text)) => (Some(text), None, None),
        Some(RawOriginalText::Span { text, start, end }) => (text, start, end),
        None => (None, None, None),
    };
    Issue {
        id: raw.id.into_string(),
        span: IssueSpan {
            start: embedded_start.or(position.start).or(raw.start),
            end: embedded_end.or(position.end).or(raw.end),
            text: text.map(|t| decode_entities(&t).into_owned()),
        },
        suggested_text: clean_suggestion(raw.suggested_text),
        category: raw.rule_category.unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
        rule_id: raw.rule_id,
        severity: raw.severity,
        confidence: raw.confidence,
        explanation: raw.explanation,
        shape: WireShape::Frontend,
    }
}

fn from_api(raw: ApiIssue) -> Issue {
    let location = raw.location.unwrap_or_default();
    Issue {
        id: raw.id.into_string(),
        span: IssueSpan {
            start: location.start.or(raw.start),
            end: location.end.or(raw.end),
            text: raw.evidence.map(|t| decode_entities(&t).into_owned()),
        },
        suggested_text: clean_suggestion(raw.suggestion),
        category: raw.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
        rule_id: raw.rule_id,
        severity: raw.severity,
        confidence: raw.confidence,
        explanation: raw.message,
        shape: WireShape::Api,
    }
}

/// Suggestions may arrive HTML-escaped; an empty suggestion means none.
fn clean_suggestion(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.is_empty()).map(|s| decode_entities(&s).into_owned())
}

/// Decodes persisted decisions one entry at a time, skipping (with a
/// warning) any entry this client does not understand.
pub fn decode_decisions(worklist_id: WorklistId, values: &[Value]) -> Vec<DecisionPayload> {
    values
        .iter()
        .filter_map(|value| match serde_json::from_value::<DecisionPayload>(value.clone()) {
            Ok(payload) => Some(payload),
            Err(error) => {
                warn!(worklist_id, %error, "persisted decision skipped");
                None
            }
        })
        .collect()
}

/// Normalises a whole item. Issues that fail to normalise and duplicate ids
/// are skipped with a warning; persisted decisions that do not decode or
/// name unknown issues are dropped.
pub fn normalize_item(raw: RawWorklistItem) -> WorklistItem {
    let mut seen = HashSet::new();
    let mut issues = Vec::with_capacity(raw.proofreading_issues.len());
    for value in &raw.proofreading_issues {
        match normalize_issue(value) {
            Ok(issue) if seen.insert(issue.id.clone()) => issues.push(issue),
            Ok(issue) => warn!(worklist_id = raw.id, issue_id = %issue.id, "duplicate issue id skipped"),
            Err(error) => warn!(worklist_id = raw.id, %error, "issue skipped"),
        }
    }

    let mut persisted: BTreeMap<String, Decision> = BTreeMap::new();
    for payload in decode_decisions(raw.id, &raw.proofreading_decisions) {
        if seen.contains(&payload.issue_id) {
            persisted.insert(payload.issue_id, payload.decision);
        }
    }

    WorklistItem {
        id: raw.id,
        article_id: raw.article_id,
        title: raw.title.unwrap_or_default(),
        content: raw.content.unwrap_or_default(),
        status: raw.status,
        issues,
        stats: raw.proofreading_stats.unwrap_or_default(),
        persisted,
    }
}

/// Parses a worklist item JSON document and normalises it.
pub fn parse_item(json: &str) -> Result<WorklistItem, ApiError> {
    let raw: RawWorklistItem =
        serde_json::from_str(json).map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(normalize_item(raw))
}
