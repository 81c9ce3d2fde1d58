use thiserror::Error;

use crate::types::WorklistId;

/// Failures at the worklist boundary: HTTP, local store, or payload decoding.
///
/// Every variant is cloneable so a single backend failure can be replayed to
/// each pending request and carried inside UI events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("worklist request failed: {0}")]
    Http(String),
    #[error("server rejected the request ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("local store error: {0}")]
    Storage(String),
    #[error("worklist item {0} not found")]
    NotFound(WorklistId),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    /// The text shown to the reviewer. Server-provided messages are surfaced
    /// verbatim; everything else uses the error's display form.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<tokio_rusqlite::Error> for ApiError {
    fn from(error: tokio_rusqlite::Error) -> Self {
        ApiError::Storage(error.to_string())
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(error: rusqlite::Error) -> Self {
        ApiError::Storage(error.to_string())
    }
}

/// Local validation failures when recording a reviewer decision.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecisionError {
    #[error("issue {0} is not part of this worklist item")]
    UnknownIssue(String),
    #[error("a modified decision for issue {0} needs replacement content")]
    MissingModifiedContent(String),
    #[error("batch decisions must be accepted or rejected")]
    InvalidBatchDecision,
    #[error("no issues are selected for a batch decision")]
    EmptyBatch,
}

/// Recoverable session-level failures. None of these touch server state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no decisions to save")]
    NothingToSave,
    #[error("the review session is not accepting changes")]
    NotReviewing,
    #[error("a save is already in progress")]
    SaveInFlight,
    #[error(transparent)]
    Decision(#[from] DecisionError),
}
