//! # Pending Queue Replay
//!
//! Pushes queued writes to the remote catalog once it is reachable again.
//!
//! ## Replay Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pending Queue Replay                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    pending_queue (FIFO)                         │   │
//! │  │                                                                 │   │
//! │  │  id | kind     | collection | payload               | attempts │   │
//! │  │  ───┼──────────┼────────────┼───────────────────────┼──────────│   │
//! │  │  1  │ create   │ products   │ {code, name, ...}     │ 0        │   │
//! │  │  2  │ movement │ movements  │ {movement, resulting} │ 0        │   │
//! │  │  3  │ movement │ movements  │ {movement, resulting} │ 10  skip │   │
//! │  │  4  │ delete   │ products   │ {code}                │ 0        │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │  oldest first                          │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                        Replayer                                 │   │
//! │  │                                                                 │   │
//! │  │  attempts >= max_attempts  → warn, leave in queue, continue    │   │
//! │  │  re-invoke remote write                                         │   │
//! │  │    ok   → dequeue, continue                                    │   │
//! │  │    err  → attempt_count += 1, last_error, STOP                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Stopping at the first failure keeps later movements from landing      │
//! │  before earlier ones. Quantity writes are absolute and movement ids    │
//! │  are stable, so replaying an entry twice has no extra effect.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::client::RemoteCatalog;
use crate::error::{SyncError, SyncResult};
use siam_core::{Movement, OperationKind, PendingOperation, Product};
use siam_db::LocalCache;

/// Default number of failed attempts before an entry is skipped.
pub const DEFAULT_MAX_ATTEMPTS: i64 = 10;

// =============================================================================
// Payloads
// =============================================================================

/// Payload of a `movement` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementPayload {
    pub movement: Movement,
    /// Stock level after the movement, written as an absolute value.
    pub resulting_quantity: i64,
}

/// Payload of an `update` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityPayload {
    pub code: String,
    pub quantity: i64,
}

/// Payload of a `delete` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePayload {
    pub code: String,
}

fn decode<T: DeserializeOwned>(operation: &PendingOperation) -> SyncResult<T> {
    serde_json::from_value(operation.payload.clone()).map_err(|e| SyncError::InvalidPayload {
        id: operation.id,
        reason: e.to_string(),
    })
}

/// Product code a queued payload refers to.
pub fn payload_code(payload: &Value) -> Option<&str> {
    payload
        .get("code")
        .or_else(|| payload.get("movement").and_then(|m| m.get("code")))
        .and_then(Value::as_str)
}

/// Codes with live (not dead-lettered) pending writes.
///
/// A catalog download must not overwrite these rows, or the local change
/// would disappear from the cache until its replay succeeds.
pub fn pending_codes(operations: &[PendingOperation], max_attempts: i64) -> HashSet<String> {
    operations
        .iter()
        .filter(|op| op.attempt_count < max_attempts)
        .filter_map(|op| payload_code(&op.payload))
        .map(str::to_string)
        .collect()
}

/// Pushes a movement: absolute quantity first, then the movement record.
pub async fn push_movement(
    remote: &dyn RemoteCatalog,
    movement: &Movement,
    resulting_quantity: i64,
) -> SyncResult<()> {
    remote
        .update_quantity(&movement.code, resulting_quantity)
        .await?;
    remote.record_movement(movement).await
}

// =============================================================================
// Replay Report
// =============================================================================

/// What one replay pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplayReport {
    /// Entries confirmed remotely and removed.
    pub replayed: usize,
    /// Entries skipped for exceeding the attempt limit.
    pub dead_lettered: usize,
    /// Entry the pass stopped at, if any.
    pub stopped_at: Option<i64>,
    pub last_error: Option<String>,
    /// Queue length after the pass.
    pub remaining: i64,
}

impl ReplayReport {
    /// True if the pass reached the end of the queue.
    pub fn completed(&self) -> bool {
        self.stopped_at.is_none()
    }
}

// =============================================================================
// Replayer
// =============================================================================

/// Drains the pending queue against a remote catalog.
pub struct Replayer<'a> {
    cache: &'a LocalCache,
    remote: &'a dyn RemoteCatalog,
    max_attempts: i64,
}

impl<'a> Replayer<'a> {
    pub fn new(cache: &'a LocalCache, remote: &'a dyn RemoteCatalog, max_attempts: i64) -> Self {
        Replayer {
            cache,
            remote,
            max_attempts,
        }
    }

    /// Runs one pass over the queue, oldest entry first.
    pub async fn run(&self) -> ReplayReport {
        let pending = self.cache.list_pending().await;
        let mut report = ReplayReport::default();

        if pending.is_empty() {
            debug!("No pending operations to replay");
            return report;
        }

        info!(count = pending.len(), "Replaying pending operations");

        for operation in &pending {
            if operation.attempt_count >= self.max_attempts {
                warn!(
                    id = operation.id,
                    kind = %operation.kind,
                    attempts = operation.attempt_count,
                    last_error = ?operation.last_error,
                    "Skipping pending operation that exceeded max attempts"
                );
                report.dead_lettered += 1;
                continue;
            }

            match self.apply(operation).await {
                Ok(()) => {
                    if !self.cache.dequeue_pending(operation.id).await {
                        error!(id = operation.id, "Replayed operation could not be dequeued");
                    }
                    debug!(id = operation.id, kind = %operation.kind, "Pending operation replayed");
                    report.replayed += 1;
                }
                Err(e) => {
                    warn!(
                        id = operation.id,
                        kind = %operation.kind,
                        error = %e,
                        "Replay failed, stopping"
                    );
                    self.cache
                        .record_failed_attempt(operation.id, &e.to_string())
                        .await;
                    report.stopped_at = Some(operation.id);
                    report.last_error = Some(e.to_string());
                    break;
                }
            }
        }

        report.remaining = self.cache.stats().await.pending_count;

        info!(
            replayed = report.replayed,
            dead_lettered = report.dead_lettered,
            remaining = report.remaining,
            "Replay pass finished"
        );
        report
    }

    /// Re-invokes the remote effect of one operation.
    async fn apply(&self, operation: &PendingOperation) -> SyncResult<()> {
        match operation.kind {
            OperationKind::Create => {
                let product: Product = decode(operation)?;
                self.remote.create(&product).await
            }
            OperationKind::Update => {
                let payload: QuantityPayload = decode(operation)?;
                self.remote
                    .update_quantity(&payload.code, payload.quantity)
                    .await
            }
            OperationKind::Delete => {
                let payload: DeletePayload = decode(operation)?;
                self.remote.delete(&payload.code).await
            }
            OperationKind::Movement => {
                let payload: MovementPayload = decode(operation)?;
                push_movement(self.remote, &payload.movement, payload.resulting_quantity).await
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
