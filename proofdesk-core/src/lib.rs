//! Review engine for the proofreading stage of the content pipeline.
//!
//! `proofdesk-core` owns everything about a proofreading review that is not
//! presentation: normalising worklist items off the wire, projecting article
//! HTML to plain text, anchoring AI-detected issues to character ranges,
//! pruning overlapping anchors, reconstructing the "all suggestions applied"
//! document, holding the reviewer's unsaved decisions, and the session state
//! machine that drives load and save.
//!
//! The `proofdesk` binary renders this state in a terminal; nothing in this
//! crate depends on a UI toolkit.

pub mod api;
pub mod db;
pub mod decisions;
pub mod error;
pub mod overlap;
pub mod position;
pub mod schema;
pub mod session;
pub mod suggest;
pub mod text;
pub mod types;
pub mod wire;

pub use api::{Backend, HttpWorklistApi, WorklistApi};
pub use db::LocalStore;
pub use decisions::DecisionStore;
pub use error::{ApiError, DecisionError, SessionError};
pub use position::{MatchStrategy, Resolution, ResolvedPosition};
pub use session::{
    DecisionOrigin, LeaveCheck, Notice, NoticeLevel, Placement, Review, ReviewCommand,
    ReviewSession, ReviewStats, SaveOutcome, SessionState, ViewMode,
};
pub use text::PlainText;
pub use types::{
    CacheKey, Decision, DecisionDraft, DecisionPayload, DecisionType, Issue, IssueSpan,
    ProofreadingStats, SaveAck, SaveDecisionsRequest, Transition, WireShape, WorklistId,
    WorklistItem,
};
