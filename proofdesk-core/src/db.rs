use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use serde_json::Value;
use tokio_rusqlite::Connection;
use tracing::{info, warn};

use crate::api::WorklistApi;
use crate::error::ApiError;
use crate::types::{
    Decision, DecisionPayload, DecisionType, ProofreadingStats, SaveAck, SaveDecisionsRequest,
    WorklistId, WorklistItem,
};
use crate::wire::{decode_decisions, normalize_item, RawWorklistItem};

/// A SQLite-backed worklist: imported items plus every saved decision batch.
///
/// Implements [`WorklistApi`] so a review can run fully offline against
/// items exported from the pipeline.
#[derive(Clone)]
pub struct LocalStore {
    conn: Connection,
}

struct ItemRow {
    article_id: Option<i64>,
    title: String,
    content: String,
    issues_json: String,
    stats_json: Option<String>,
    status: String,
}

struct DecisionRow {
    issue_id: String,
    decision_type: String,
    rationale: Option<String>,
    modified_content: Option<String>,
    feedback_provided: bool,
    feedback_category: Option<String>,
    feedback_notes: Option<String>,
}

impl LocalStore {
    /// Opens (or creates) the database at `path`, configures WAL mode, and
    /// applies schema migrations.
    ///
    /// `busy_timeout` is set through the connection method rather than a
    /// PRAGMA string so it survives pragma caching.
    ///
    /// # Errors
    ///
    /// `ApiError::Storage` if the file cannot be opened, WAL configuration
    /// fails, or schema DDL fails.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let conn = Connection::open(path.as_ref()).await?;

        conn.call(|db| -> rusqlite::Result<_> {
            db.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA foreign_keys=ON;",
            )?;
            db.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        })
        .await?;

        // Leftover WAL from a previous run.
        conn.call(|db| -> rusqlite::Result<_> {
            db.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
            Ok(())
        })
        .await?;

        conn.call(|db| -> rusqlite::Result<_> {
            crate::schema::migrate(db)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Inserts or replaces an item exported from the pipeline. Decisions the
    /// export already carries are recorded as one submission.
    ///
    /// # Errors
    ///
    /// `ApiError::Storage` on any write failure.
    pub async fn import_item(&self, raw: &RawWorklistItem) -> Result<(), ApiError> {
        let issues_json = serde_json::to_string(&raw.proofreading_issues)
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        let stats_json = raw
            .proofreading_stats
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        let id = raw.id;
        let article_id = raw.article_id;
        let title = raw.title.clone().unwrap_or_default();
        let content = raw.content.clone().unwrap_or_default();
        let status = raw.status.clone();
        let decisions = decode_decisions(id, &raw.proofreading_decisions);

        self.conn
            .call(move |db| -> rusqlite::Result<_> {
                let now = now_secs();
                let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                tx.execute(
                    "INSERT INTO worklist_items
                         (id, article_id, title, content, issues_json, stats_json, status, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, COALESCE(?7, 'proofreading_review'), ?8)
                     ON CONFLICT(id) DO UPDATE SET
                         article_id  = excluded.article_id,
                         title       = excluded.title,
                         content     = excluded.content,
                         issues_json = excluded.issues_json,
                         stats_json  = excluded.stats_json,
                         status      = excluded.status,
                         updated_at  = excluded.updated_at",
                    rusqlite::params![id, article_id, &title, &content, &issues_json, &stats_json, &status, now],
                )?;
                if !decisions.is_empty() {
                    insert_submission(&tx, id, &decisions, None, None, now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;

        info!(worklist_id = id, "worklist item imported");
        Ok(())
    }

    /// Current workflow status of an item, `None` if it was never imported.
    ///
    /// # Errors
    ///
    /// `ApiError::Storage` if the query fails.
    pub async fn item_status(&self, worklist_id: WorklistId) -> Result<Option<String>, ApiError> {
        let status = self
            .conn
            .call(move |db| -> rusqlite::Result<_> {
                let status = db
                    .query_row(
                        "SELECT status FROM worklist_items WHERE id = ?1",
                        rusqlite::params![worklist_id],
                        |r| r.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(status)
            })
            .await?;
        Ok(status)
    }

    /// Number of save batches recorded for an item.
    ///
    /// # Errors
    ///
    /// `ApiError::Storage` if the query fails.
    pub async fn submission_count(&self, worklist_id: WorklistId) -> Result<usize, ApiError> {
        let count = self
            .conn
            .call(move |db| -> rusqlite::Result<_> {
                let count: i64 = db.query_row(
                    "SELECT COUNT(*) FROM review_submissions WHERE worklist_id = ?1",
                    rusqlite::params![worklist_id],
                    |r| r.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl WorklistApi for LocalStore {
    async fn fetch_item(&self, worklist_id: WorklistId) -> Result<WorklistItem, ApiError> {
        let loaded = self
            .conn
            .call(move |db| -> rusqlite::Result<_> {
                let item = db
                    .query_row(
                        "SELECT article_id, title, content, issues_json, stats_json, status
                         FROM worklist_items WHERE id = ?1",
                        rusqlite::params![worklist_id],
                        |r| {
                            Ok(ItemRow {
                                article_id: r.get(0)?,
                                title: r.get(1)?,
                                content: r.get(2)?,
                                issues_json: r.get(3)?,
                                stats_json: r.get(4)?,
                                status: r.get(5)?,
                            })
                        },
                    )
                    .optional()?;
                let Some(item) = item else {
                    return Ok(None);
                };

                let mut stmt = db.prepare(
                    "SELECT issue_id, decision_type, rationale, modified_content,
                            feedback_provided, feedback_category, feedback_notes
                     FROM review_decisions
                     WHERE worklist_id = ?1
                     ORDER BY created_at, rowid",
                )?;
                let decisions = stmt
                    .query_map(rusqlite::params![worklist_id], |r| {
                        Ok(DecisionRow {
                            issue_id: r.get(0)?,
                            decision_type: r.get(1)?,
                            rationale: r.get(2)?,
                            modified_content: r.get(3)?,
                            feedback_provided: r.get(4)?,
                            feedback_category: r.get(5)?,
                            feedback_notes: r.get(6)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(Some((item, decisions)))
            })
            .await?;

        let (item, decisions) = loaded.ok_or(ApiError::NotFound(worklist_id))?;
        let proofreading_issues: Vec<Value> = serde_json::from_str(&item.issues_json)
            .map_err(|e| ApiError::Decode(format!("stored issues: {e}")))?;
        let proofreading_stats: Option<ProofreadingStats> = item
            .stats_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| ApiError::Decode(format!("stored stats: {e}")))?;

        let proofreading_decisions = decisions
            .into_iter()
            .filter_map(|row| {
                let Some(decision_type) = DecisionType::parse(&row.decision_type) else {
                    warn!(worklist_id, issue_id = %row.issue_id, "unknown stored decision type");
                    return None;
                };
                let payload = DecisionPayload {
                    issue_id: row.issue_id,
                    decision: Decision {
                        decision_type,
                        decision_rationale: row.rationale,
                        modified_content: row.modified_content,
                        feedback_provided: row.feedback_provided,
                        feedback_category: row.feedback_category,
                        feedback_notes: row.feedback_notes,
                    },
                };
                serde_json::to_value(payload).ok()
            })
            .collect();

        Ok(normalize_item(RawWorklistItem {
            id: worklist_id,
            article_id: item.article_id,
            title: Some(item.title),
            content: Some(item.content),
            status: Some(item.status),
            proofreading_issues,
            proofreading_stats,
            proofreading_decisions,
        }))
    }

    async fn save_decisions(
        &self,
        worklist_id: WorklistId,
        request: &SaveDecisionsRequest,
    ) -> Result<SaveAck, ApiError> {
        let decisions = request.decisions.clone();
        let notes = request.review_notes.clone();
        let transition = request.transition_to.map(|t| t.as_str());

        let status = self
            .conn
            .call(move |db| -> rusqlite::Result<_> {
                let now = now_secs();
                let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                let current: Option<String> = tx
                    .query_row(
                        "SELECT status FROM worklist_items WHERE id = ?1",
                        rusqlite::params![worklist_id],
                        |r| r.get(0),
                    )
                    .optional()?;
                let Some(mut status) = current else {
                    return Ok(None);
                };

                insert_submission(&tx, worklist_id, &decisions, notes.as_deref(), transition, now)?;
                if let Some(target) = transition {
                    tx.execute(
                        "UPDATE worklist_items SET status = ?1, updated_at = ?2 WHERE id = ?3",
                        rusqlite::params![target, now, worklist_id],
                    )?;
                    status = target.to_owned();
                }
                tx.commit()?;
                Ok(Some(status))
            })
            .await?;

        let status = status.ok_or(ApiError::NotFound(worklist_id))?;
        info!(worklist_id, saved = request.decisions.len(), %status, "decisions stored locally");
        Ok(SaveAck {
            message: None,
            saved_count: Some(request.decisions.len()),
            status: Some(status),
        })
    }
}

fn insert_submission(
    tx: &rusqlite::Transaction<'_>,
    worklist_id: WorklistId,
    decisions: &[DecisionPayload],
    notes: Option<&str>,
    transition: Option<&str>,
    now: i64,
) -> rusqlite::Result<()> {
    let submission_id = uuid::Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO review_submissions (id, worklist_id, review_notes, transition_to, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![&submission_id, worklist_id, notes, transition, now],
    )?;
    let mut stmt = tx.prepare(
        "INSERT INTO review_decisions
             (id, submission_id, worklist_id, issue_id, decision_type, rationale,
              modified_content, feedback_provided, feedback_category, feedback_notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for payload in decisions {
        let d = &payload.decision;
        stmt.execute(rusqlite::params![
            uuid::Uuid::new_v4().to_string(),
            &submission_id,
            worklist_id,
            &payload.issue_id,
            d.decision_type.as_str(),
            &d.decision_rationale,
            &d.modified_content,
            d.feedback_provided,
            &d.feedback_category,
            &d.feedback_notes,
            now,
        ])?;
    }
    Ok(())
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
