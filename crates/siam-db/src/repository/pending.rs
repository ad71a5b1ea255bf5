//! # Pending Queue Repository
//!
//! Durable FIFO of writes that have not reached the remote store yet.
//!
//! ## The Pending Queue
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Pending Write Lifecycle                              │
//! │                                                                         │
//! │  LOCAL WRITE (entry, exit, create, delete)                             │
//! │       │                                                                 │
//! │       ├── Online and remote confirms ──► nothing queued                │
//! │       │                                                                 │
//! │       └── Offline, or remote failed                                    │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  INSERT INTO pending_queue (operation_kind, target_collection,         │
//! │                             payload_json, created_at)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            REPLAY (manual sync)                                 │   │
//! │  │                                                                 │   │
//! │  │  1. SELECT * ORDER BY created_at, id  (oldest first)           │   │
//! │  │  2. For each entry, re-invoke the remote write                 │   │
//! │  │     a. Confirmed: DELETE the row                               │   │
//! │  │     b. Failed:    attempt_count += 1, last_error = ?           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Rows are never edited except for attempt accounting.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use siam_core::{OperationKind, PendingOperation};

#[derive(Debug, sqlx::FromRow)]
struct PendingRow {
    id: i64,
    operation_kind: String,
    target_collection: String,
    payload_json: String,
    created_at: DateTime<Utc>,
    attempt_count: i64,
    last_error: Option<String>,
    last_attempt_at: Option<DateTime<Utc>>,
}

impl TryFrom<PendingRow> for PendingOperation {
    type Error = DbError;

    fn try_from(row: PendingRow) -> DbResult<Self> {
        let kind: OperationKind = row
            .operation_kind
            .parse()
            .map_err(|e: siam_core::ValidationError| DbError::Serialization(e.to_string()))?;

        Ok(PendingOperation {
            id: row.id,
            kind,
            collection: row.target_collection,
            payload: serde_json::from_str(&row.payload_json)?,
            created_at: row.created_at,
            attempt_count: row.attempt_count,
            last_error: row.last_error,
            last_attempt_at: row.last_attempt_at,
        })
    }
}

/// Repository for pending write queue operations.
#[derive(Debug, Clone)]
pub struct PendingQueueRepository {
    pool: SqlitePool,
}

impl PendingQueueRepository {
    /// Creates a new PendingQueueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PendingQueueRepository { pool }
    }

    /// Appends an operation to the queue.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let payload = serde_json::to_value(&product)?;
    /// repo.enqueue(OperationKind::Create, "products", &payload).await?;
    /// ```
    pub async fn enqueue(
        &self,
        kind: OperationKind,
        collection: &str,
        payload: &Value,
    ) -> DbResult<PendingOperation> {
        let now = Utc::now();
        let payload_json = serde_json::to_string(payload)?;

        debug!(kind = %kind, collection = %collection, "Queuing pending operation");

        let result = sqlx::query(
            r#"
            INSERT INTO pending_queue (
                operation_kind, target_collection, payload_json, created_at, attempt_count
            ) VALUES (?1, ?2, ?3, ?4, 0)
            "#,
        )
        .bind(kind.as_str())
        .bind(collection)
        .bind(&payload_json)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(PendingOperation {
            id: result.last_insert_rowid(),
            kind,
            collection: collection.to_string(),
            payload: payload.clone(),
            created_at: now,
            attempt_count: 0,
            last_error: None,
            last_attempt_at: None,
        })
    }

    /// Lists every pending operation, oldest first.
    ///
    /// Rows whose kind or payload cannot be decoded are logged and skipped.
    /// They stay in the table, so `count` still reports them.
    pub async fn list(&self) -> DbResult<Vec<PendingOperation>> {
        let rows: Vec<PendingRow> = sqlx::query_as::<_, PendingRow>(
            r#"
            SELECT
                id, operation_kind, target_collection, payload_json,
                created_at, attempt_count, last_error, last_attempt_at
            FROM pending_queue
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut operations = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match PendingOperation::try_from(row) {
                Ok(op) => operations.push(op),
                Err(e) => warn!(id, error = %e, "Skipping undecodable pending operation"),
            }
        }
        Ok(operations)
    }

    /// Removes a confirmed operation.
    pub async fn dequeue(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM pending_queue WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PendingOperation", id.to_string()));
        }

        debug!(id, "Pending operation dequeued");
        Ok(())
    }

    /// Records a failed replay attempt.
    pub async fn record_attempt(&self, id: i64, error: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE pending_queue SET
                attempt_count = attempt_count + 1,
                last_error = ?2,
                last_attempt_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PendingOperation", id.to_string()));
        }

        Ok(())
    }

    /// Counts pending operations.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_queue")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Drops every pending operation, returning how many were removed.
    pub async fn clear(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM pending_queue")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
