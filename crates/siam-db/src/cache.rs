//! # Local Cache
//!
//! The storage boundary the orchestrator talks to.
//!
//! Every method here swallows storage faults: the fault is logged and the
//! caller receives `false`, `None`, an empty list or a zero count. Callers
//! drive an interactive front end and must stay responsive when the disk
//! misbehaves. "The cache has no data" and "the cache could not answer"
//! look the same from the outside.
//!
//! ```text
//! ┌────────────────────┐   DbResult<T>   ┌────────────────────┐   T / bool
//! │ ProductRepository  │ ──────────────► │                    │ ───────────►
//! │ PendingQueueRepo   │                 │     LocalCache     │  orchestrator
//! └────────────────────┘   Err(e) ──────►│ error!(..) + empty │
//!                                        └────────────────────┘
//! ```

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::pending::PendingQueueRepository;
use crate::repository::product::ProductRepository;
use siam_core::{CacheStats, OperationKind, PendingOperation, Product};

/// Fault-absorbing facade over the product and pending-queue repositories.
#[derive(Debug, Clone)]
pub struct LocalCache {
    products: ProductRepository,
    pending: PendingQueueRepository,
}

/// Unwraps a repository result, logging and substituting `fallback` on error.
fn absorb<T>(result: DbResult<T>, fallback: T, operation: &'static str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!(operation, error = %e, "Local cache operation failed");
            fallback
        }
    }
}

impl LocalCache {
    pub fn new(products: ProductRepository, pending: PendingQueueRepository) -> Self {
        LocalCache { products, pending }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Point lookup by code.
    pub async fn get(&self, code: &str) -> Option<Product> {
        absorb(self.products.get_by_code(code).await, None, "get")
    }

    /// Full catalog ordered by name.
    pub async fn list_all(&self) -> Vec<Product> {
        absorb(self.products.list_all().await, Vec::new(), "list_all")
    }

    /// Products of one category ordered by name.
    pub async fn list_by_category(&self, category: &str) -> Vec<Product> {
        absorb(
            self.products.list_by_category(category).await,
            Vec::new(),
            "list_by_category",
        )
    }

    /// Substring search over name and code (ASCII case-insensitive).
    pub async fn search(&self, term: &str) -> Vec<Product> {
        absorb(self.products.search(term).await, Vec::new(), "search")
    }

    /// Inserts or replaces a product.
    pub async fn upsert(&self, product: &Product) -> bool {
        absorb(self.products.upsert(product).await.map(|_| true), false, "upsert")
    }

    /// Sets the quantity of an existing product.
    ///
    /// Returns `false` if no row matched or the quantity is negative.
    pub async fn set_quantity(&self, code: &str, quantity: i64) -> bool {
        if quantity < 0 {
            warn!(code = %code, quantity, "Refusing negative quantity");
            return false;
        }

        match self.products.set_quantity(code, quantity).await {
            Ok(()) => true,
            Err(DbError::NotFound { .. }) => {
                debug!(code = %code, "No cached product to update");
                false
            }
            Err(e) => absorb(Err(e), false, "set_quantity"),
        }
    }

    /// Deletes a product. Returns `false` if it was not cached.
    pub async fn delete(&self, code: &str) -> bool {
        match self.products.delete(code).await {
            Ok(()) => true,
            Err(DbError::NotFound { .. }) => false,
            Err(e) => absorb(Err(e), false, "delete"),
        }
    }

    /// Upserts every product, returning how many were applied.
    ///
    /// Not atomic: a fault mid-batch leaves the earlier rows applied. Calling
    /// again with the same list converges to the same contents.
    pub async fn bulk_sync(&self, products: &[Product]) -> usize {
        let mut applied = 0;

        for product in products {
            match self.products.upsert(product).await {
                Ok(_) => applied += 1,
                Err(e) => {
                    error!(code = %product.code, error = %e, "Failed to merge product into cache")
                }
            }
        }

        info!(applied, total = products.len(), "Catalog merged into cache");
        applied
    }

    // =========================================================================
    // Pending Queue
    // =========================================================================

    /// Appends a pending operation.
    pub async fn enqueue_pending(&self, kind: OperationKind, collection: &str, payload: &Value) -> bool {
        absorb(
            self.pending
                .enqueue(kind, collection, payload)
                .await
                .map(|_| true),
            false,
            "enqueue_pending",
        )
    }

    /// Pending operations, oldest first.
    pub async fn list_pending(&self) -> Vec<PendingOperation> {
        absorb(self.pending.list().await, Vec::new(), "list_pending")
    }

    /// Removes a confirmed operation.
    pub async fn dequeue_pending(&self, id: i64) -> bool {
        absorb(self.pending.dequeue(id).await.map(|_| true), false, "dequeue_pending")
    }

    /// Records a failed replay attempt.
    pub async fn record_failed_attempt(&self, id: i64, reason: &str) -> bool {
        absorb(
            self.pending.record_attempt(id, reason).await.map(|_| true),
            false,
            "record_failed_attempt",
        )
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Product and pending counts. Unanswerable counts read as zero.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            total_products: absorb(self.products.count().await, 0, "stats"),
            pending_count: absorb(self.pending.count().await, 0, "stats"),
        }
    }

    /// Deletes every product and pending operation.
    pub async fn clear(&self) -> bool {
        let products = absorb(self.products.clear().await.map(Some), None, "clear");
        let pending = absorb(self.pending.clear().await.map(Some), None, "clear");

        match (products, pending) {
            (Some(products), Some(pending)) => {
                info!(products, pending, "Cache cleared");
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
