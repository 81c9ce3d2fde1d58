/// DDL for the schema_version tracking table.
///
/// Applied on every open before the version check; `IF NOT EXISTS` keeps it
/// idempotent.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the v1 schema of the local review store.
///
/// - `worklist_items`: imported items; issues and stats are kept as the JSON
///   they arrived in so both wire shapes survive a round trip.
/// - `review_submissions`: one row per successful save batch.
/// - `review_decisions`: append-only decision history. The latest row per
///   `(worklist_id, issue_id)` is the persisted decision.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS worklist_items (
        id          INTEGER PRIMARY KEY,
        article_id  INTEGER,
        title       TEXT    NOT NULL DEFAULT '',
        content     TEXT    NOT NULL DEFAULT '',
        issues_json TEXT    NOT NULL DEFAULT '[]',
        stats_json  TEXT,
        status      TEXT    NOT NULL DEFAULT 'proofreading_review',
        updated_at  INTEGER NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS review_submissions (
        id            TEXT    PRIMARY KEY,
        worklist_id   INTEGER NOT NULL REFERENCES worklist_items(id) ON DELETE CASCADE,
        review_notes  TEXT,
        transition_to TEXT
                      CHECK(transition_to IN ('ready_to_publish', 'proofreading', 'failed')),
        created_at    INTEGER NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS review_decisions (
        id                TEXT    PRIMARY KEY,
        submission_id     TEXT    NOT NULL REFERENCES review_submissions(id) ON DELETE CASCADE,
        worklist_id       INTEGER NOT NULL REFERENCES worklist_items(id) ON DELETE CASCADE,
        issue_id          TEXT    NOT NULL,
        decision_type     TEXT    NOT NULL
                          CHECK(decision_type IN ('accepted', 'rejected', 'modified')),
        rationale         TEXT,
        modified_content  TEXT,
        feedback_provided INTEGER NOT NULL DEFAULT 0,
        feedback_category TEXT,
        feedback_notes    TEXT,
        created_at        INTEGER NOT NULL
    ) STRICT;

    CREATE INDEX IF NOT EXISTS review_decisions_by_issue
        ON review_decisions (worklist_id, issue_id);
";

/// Forward-only migration to the latest schema version. Idempotent.
///
/// # Errors
///
/// Returns `rusqlite::Error` if the DDL fails or the version row cannot be read.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let version: i64 = db.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(SCHEMA_V1_SQL)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
    }

    Ok(())
}
