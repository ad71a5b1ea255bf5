//! # Inventory Repository
//!
//! The single entry point for product data. Decides, per call, whether the
//! local cache or the remote catalog answers, and what happens to writes the
//! remote cannot take right now.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Uninitialized ──connect()──┬──► Online   credentials ok, probe ok     │
//! │                              └──► Offline  otherwise                    │
//! │                                                                         │
//! │   Offline ──sync()── re-probe ──► Online                                │
//! │   Online  ──sync()── re-probe ──► Offline                               │
//! │                                                                         │
//! │   No background polling: the state only moves on connect() / sync().   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read and Write Paths
//! ```text
//! find_by_code(code)
//!   cache hit ────────────────────────────────► Some(product)
//!   miss + Online ── remote.get ── hit ── cache.upsert ──► Some(product)
//!   miss + Offline ───────────────────────────► None
//!
//! register_entry / register_exit
//!   validate ─► resolve ─► stock rule ─► cache.set_quantity
//!     Online:  update_quantity + record_movement ── ok ──► Synced
//!                                                └─ err ─► enqueue ─► Queued
//!     Offline: enqueue ──────────────────────────────────► Queued
//!     enqueue refused by storage ────────────────────────► LocalOnly
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let remote = Arc::new(FirestoreClient::new(config.remote.clone())?);
//! let repo = InventoryRepository::new(db.cache(), remote, RepositorySettings::from(&config));
//! repo.connect().await;
//!
//! let change = repo.register_exit("7591002200046", 2, "clerk", "").await?;
//! ```

use chrono::Local;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::client::RemoteCatalog;
use crate::config::AppConfig;
use crate::replay::{
    pending_codes, push_movement, DeletePayload, MovementPayload, QuantityPayload, ReplayReport,
    Replayer, DEFAULT_MAX_ATTEMPTS,
};
use siam_core::alerts::{self, AlertThresholds, Alerts};
use siam_core::report::InventorySummary;
use siam_core::validation::{
    validate_code, validate_movement_quantity, validate_new_product, validate_stock_level,
};
use siam_core::{
    CacheStats, CoreError, CoreResult, Movement, MovementKind, OperationKind, PendingOperation,
    Product, RemoteWrite, StockChange, MOVEMENTS_COLLECTION, PRODUCTS_COLLECTION,
};
use siam_db::LocalCache;

// =============================================================================
// Settings and Reports
// =============================================================================

/// Orchestrator behavior settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositorySettings {
    pub max_attempts: i64,
    pub refresh_on_connect: bool,
    pub alerts: AlertThresholds,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        RepositorySettings {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            refresh_on_connect: true,
            alerts: AlertThresholds::default(),
        }
    }
}

impl From<&AppConfig> for RepositorySettings {
    fn from(config: &AppConfig) -> Self {
        RepositorySettings {
            max_attempts: config.sync.max_attempts,
            refresh_on_connect: config.sync.refresh_on_connect,
            alerts: config.alerts.thresholds(),
        }
    }
}

/// Where the repository gets remote data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// `connect()` has not run yet.
    Uninitialized,
    Online,
    Offline,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Uninitialized => write!(f, "uninitialized"),
            ConnectionState::Online => write!(f, "online"),
            ConnectionState::Offline => write!(f, "offline"),
        }
    }
}

/// How a sync or refresh ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed,
    /// The remote is not configured or did not answer the probe.
    Offline,
    /// Another sync held the guard; nothing was done.
    AlreadyRunning,
    /// Replay ran but the catalog download failed.
    CatalogUnavailable,
}

/// Result of [`InventoryRepository::sync`] and
/// [`InventoryRepository::refresh_catalog`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub replay: ReplayReport,
    /// Products downloaded.
    pub fetched: usize,
    /// Products written to the cache.
    pub merged: usize,
    /// Downloaded products not merged because a local change is still queued.
    pub held_back: usize,
    pub error: Option<String>,
}

impl SyncReport {
    fn new(outcome: SyncOutcome) -> Self {
        SyncReport {
            outcome,
            replay: ReplayReport::default(),
            fetched: 0,
            merged: 0,
            held_back: 0,
            error: None,
        }
    }
}

/// Snapshot for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryStatus {
    pub stats: CacheStats,
    pub state: ConnectionState,
    pub is_online: bool,
    /// The remote accepted its credentials.
    pub remote_available: bool,
    pub sync_in_progress: bool,
}

/// Holds the sync flag; clears it on drop.
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncGuard(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Inventory Repository
// =============================================================================

/// Offline-first product repository.
///
/// Built once at startup and shared behind an `Arc`; every flag is atomic.
pub struct InventoryRepository {
    cache: LocalCache,
    remote: Arc<dyn RemoteCatalog>,
    settings: RepositorySettings,
    initialized: AtomicBool,
    online: AtomicBool,
    sync_in_progress: AtomicBool,
}

impl InventoryRepository {
    pub fn new(cache: LocalCache, remote: Arc<dyn RemoteCatalog>, settings: RepositorySettings) -> Self {
        InventoryRepository {
            cache,
            remote,
            settings,
            initialized: AtomicBool::new(false),
            online: AtomicBool::new(false),
            sync_in_progress: AtomicBool::new(false),
        }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    /// Result of the last probe. Not re-verified per call.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ConnectionState {
        if !self.initialized.load(Ordering::Acquire) {
            ConnectionState::Uninitialized
        } else if self.is_online() {
            ConnectionState::Online
        } else {
            ConnectionState::Offline
        }
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Checks credentials and probes the remote.
    async fn probe(&self) -> bool {
        let online = if !self.remote.connect() {
            false
        } else {
            match self.remote.probe().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Remote catalog unreachable");
                    false
                }
            }
        };

        self.online.store(online, Ordering::Release);
        self.initialized.store(true, Ordering::Release);
        online
    }

    /// Moves out of `Uninitialized`.
    ///
    /// When Online and `refresh_on_connect` is set, queued writes are
    /// replayed and the catalog is downloaded before returning.
    pub async fn connect(&self) -> ConnectionState {
        let online = self.probe().await;
        let state = self.state();
        info!(state = %state, "Repository connected");

        if online && self.settings.refresh_on_connect {
            if let Some(_guard) = SyncGuard::acquire(&self.sync_in_progress) {
                let report = self.replay_and_refresh().await;
                debug!(outcome = ?report.outcome, merged = report.merged, "Initial sync finished");
            }
        }

        state
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Cache-first lookup.
    ///
    /// The remote is asked only when Online and the cache has no row; a
    /// remote hit is cached before it is returned. Remote failures read as
    /// "not found".
    pub async fn find_by_code(&self, code: &str) -> Option<Product> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }

        if let Some(product) = self.cache.get(code).await {
            debug!(code = %code, "Served from cache");
            return Some(product);
        }

        if !self.is_online() {
            debug!(code = %code, "Not cached and offline");
            return None;
        }

        match self.remote.get_by_code(code).await {
            Ok(Some(product)) => {
                if !self.cache.upsert(&product).await {
                    warn!(code = %code, "Remote product could not be cached");
                }
                debug!(code = %code, "Served from remote catalog");
                Some(self.cache.get(code).await.unwrap_or(product))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(code = %code, error = %e, "Remote lookup failed");
                None
            }
        }
    }

    /// [`find_by_code`](Self::find_by_code) for callback-style callers.
    pub async fn find_by_code_with<F>(&self, code: &str, callback: F)
    where
        F: FnOnce(Option<Product>),
    {
        callback(self.find_by_code(code).await);
    }

    pub async fn list_all(&self) -> Vec<Product> {
        self.cache.list_all().await
    }

    pub async fn list_by_category(&self, category: &str) -> Vec<Product> {
        self.cache.list_by_category(category).await
    }

    pub async fn search(&self, term: &str) -> Vec<Product> {
        self.cache.search(term).await
    }

    // =========================================================================
    // Stock Movements
    // =========================================================================

    /// Adds stock.
    pub async fn register_entry(
        &self,
        code: &str,
        quantity: i64,
        user: &str,
        notes: &str,
    ) -> CoreResult<StockChange> {
        self.register_movement(MovementKind::Entry, code, quantity, user, notes)
            .await
    }

    /// Removes stock. Never drives the quantity below zero.
    pub async fn register_exit(
        &self,
        code: &str,
        quantity: i64,
        user: &str,
        notes: &str,
    ) -> CoreResult<StockChange> {
        self.register_movement(MovementKind::Exit, code, quantity, user, notes)
            .await
    }

    async fn register_movement(
        &self,
        kind: MovementKind,
        code: &str,
        quantity: i64,
        user: &str,
        notes: &str,
    ) -> CoreResult<StockChange> {
        validate_movement_quantity(quantity)?;

        let product = self
            .find_by_code(code)
            .await
            .ok_or_else(|| CoreError::ProductNotFound(code.to_string()))?;

        let new_quantity = product.apply_movement(kind, quantity)?;

        if !self.cache.set_quantity(&product.code, new_quantity).await {
            return Err(CoreError::Storage(format!(
                "could not save the new quantity of {}",
                product.code
            )));
        }

        let movement = Movement::new(&product.code, kind, quantity, user, notes);
        let remote = self.write_movement(movement, new_quantity).await;

        info!(
            code = %product.code,
            kind = %kind,
            quantity,
            previous = product.quantity,
            new_quantity,
            remote = ?remote,
            "Stock movement registered"
        );

        Ok(StockChange {
            code: product.code,
            kind,
            quantity,
            previous_quantity: product.quantity,
            new_quantity,
            remote,
        })
    }

    async fn write_movement(&self, movement: Movement, resulting_quantity: i64) -> RemoteWrite {
        if self.can_push(&movement.code).await {
            match push_movement(self.remote.as_ref(), &movement, resulting_quantity).await {
                Ok(()) => return RemoteWrite::Synced,
                Err(e) => warn!(code = %movement.code, error = %e, "Remote movement failed, queuing"),
            }
        }

        let payload = MovementPayload {
            movement,
            resulting_quantity,
        };
        self.enqueue(OperationKind::Movement, MOVEMENTS_COLLECTION, &payload)
            .await
    }

    /// Sets the quantity after a physical count.
    pub async fn adjust_quantity(&self, code: &str, quantity: i64) -> CoreResult<RemoteWrite> {
        validate_stock_level(quantity)?;

        let product = self
            .find_by_code(code)
            .await
            .ok_or_else(|| CoreError::ProductNotFound(code.to_string()))?;

        if !self.cache.set_quantity(&product.code, quantity).await {
            return Err(CoreError::Storage(format!(
                "could not save the new quantity of {}",
                product.code
            )));
        }

        if self.can_push(&product.code).await {
            match self.remote.update_quantity(&product.code, quantity).await {
                Ok(()) => return Ok(RemoteWrite::Synced),
                Err(e) => warn!(code = %product.code, error = %e, "Remote update failed, queuing"),
            }
        }

        let payload = QuantityPayload {
            code: product.code,
            quantity,
        };
        Ok(self
            .enqueue(OperationKind::Update, PRODUCTS_COLLECTION, &payload)
            .await)
    }

    // =========================================================================
    // Catalog Writes
    // =========================================================================

    /// Registers a new product. Also the path every import record takes.
    pub async fn create_product(&self, mut product: Product) -> CoreResult<RemoteWrite> {
        validate_new_product(&product)?;
        product.code = product.code.trim().to_string();

        if !self.cache.upsert(&product).await {
            return Err(CoreError::Storage(format!(
                "could not save product {}",
                product.code
            )));
        }

        if self.can_push(&product.code).await {
            match self.remote.create(&product).await {
                Ok(()) => return Ok(RemoteWrite::Synced),
                Err(e) => warn!(code = %product.code, error = %e, "Remote create failed, queuing"),
            }
        }

        Ok(self
            .enqueue(OperationKind::Create, PRODUCTS_COLLECTION, &product)
            .await)
    }

    /// Removes a product locally and remotely.
    pub async fn delete_product(&self, code: &str) -> CoreResult<RemoteWrite> {
        validate_code(code)?;
        let code = code.trim();

        let cached = self.cache.get(code).await.is_some();
        if !cached {
            if !self.is_online() {
                return Err(CoreError::ProductNotFound(code.to_string()));
            }
            if let Ok(None) = self.remote.get_by_code(code).await {
                return Err(CoreError::ProductNotFound(code.to_string()));
            }
        }

        if cached && !self.cache.delete(code).await {
            return Err(CoreError::Storage(format!("could not delete product {}", code)));
        }

        if self.can_push(code).await {
            match self.remote.delete(code).await {
                Ok(()) => return Ok(RemoteWrite::Synced),
                Err(e) => warn!(code = %code, error = %e, "Remote delete failed, queuing"),
            }
        }

        let payload = DeletePayload {
            code: code.to_string(),
        };
        Ok(self
            .enqueue(OperationKind::Delete, PRODUCTS_COLLECTION, &payload)
            .await)
    }

    /// A direct push is allowed only while online and with no live queued
    /// write for the same code. Otherwise the new write goes to the back of
    /// the queue so replay applies it after the older ones.
    async fn can_push(&self, code: &str) -> bool {
        if !self.is_online() {
            return false;
        }
        let queued = pending_codes(&self.cache.list_pending().await, self.settings.max_attempts);
        if queued.contains(code) {
            debug!(code = %code, "Older writes still queued, queuing behind them");
            return false;
        }
        true
    }

    async fn enqueue<T: Serialize>(
        &self,
        kind: OperationKind,
        collection: &str,
        payload: &T,
    ) -> RemoteWrite {
        let payload = match serde_json::to_value(payload) {
            Ok(payload) => payload,
            Err(e) => {
                error!(kind = %kind, error = %e, "Pending payload could not be serialized");
                return RemoteWrite::LocalOnly;
            }
        };

        if self.cache.enqueue_pending(kind, collection, &payload).await {
            RemoteWrite::Queued
        } else {
            error!(kind = %kind, "Write kept on this device only: pending queue refused it");
            RemoteWrite::LocalOnly
        }
    }

    // =========================================================================
    // Synchronization
    // =========================================================================

    /// Re-probes, replays the pending queue and downloads the catalog.
    pub async fn sync(&self) -> SyncReport {
        let Some(_guard) = SyncGuard::acquire(&self.sync_in_progress) else {
            debug!("Sync already running");
            return SyncReport::new(SyncOutcome::AlreadyRunning);
        };

        if !self.probe().await {
            info!("Sync skipped: remote catalog unavailable");
            return SyncReport::new(SyncOutcome::Offline);
        }

        self.replay_and_refresh().await
    }

    /// Downloads the catalog into the cache without replaying.
    pub async fn refresh_catalog(&self) -> SyncReport {
        let Some(_guard) = SyncGuard::acquire(&self.sync_in_progress) else {
            debug!("Sync already running");
            return SyncReport::new(SyncOutcome::AlreadyRunning);
        };

        if !self.is_online() {
            return SyncReport::new(SyncOutcome::Offline);
        }

        self.download_catalog(SyncReport::new(SyncOutcome::Completed))
            .await
    }

    async fn replay_and_refresh(&self) -> SyncReport {
        let mut report = SyncReport::new(SyncOutcome::Completed);
        report.replay = Replayer::new(&self.cache, self.remote.as_ref(), self.settings.max_attempts)
            .run()
            .await;

        self.download_catalog(report).await
    }

    async fn download_catalog(&self, mut report: SyncReport) -> SyncReport {
        let products = match self.remote.list_all().await {
            Ok(products) => products,
            Err(e) => {
                error!(error = %e, "Catalog download failed");
                report.outcome = SyncOutcome::CatalogUnavailable;
                report.error = Some(e.to_string());
                return report;
            }
        };

        let protected = pending_codes(&self.cache.list_pending().await, self.settings.max_attempts);
        let (held, fresh): (Vec<Product>, Vec<Product>) = products
            .into_iter()
            .partition(|p| protected.contains(&p.code));

        report.fetched = held.len() + fresh.len();
        report.held_back = held.len();
        report.merged = self.cache.bulk_sync(&fresh).await;

        info!(
            fetched = report.fetched,
            merged = report.merged,
            held_back = report.held_back,
            "Catalog refreshed"
        );
        report
    }

    // =========================================================================
    // Diagnostics, Alerts and Reports
    // =========================================================================

    pub async fn status(&self) -> RepositoryStatus {
        RepositoryStatus {
            stats: self.cache.stats().await,
            state: self.state(),
            is_online: self.is_online(),
            remote_available: self.remote.is_connected(),
            sync_in_progress: self.sync_in_progress.load(Ordering::Acquire),
        }
    }

    /// Read-only view of the pending queue.
    pub async fn pending_operations(&self) -> Vec<PendingOperation> {
        self.cache.list_pending().await
    }

    /// Drops every cached product and pending operation.
    pub async fn clear_cache(&self) -> bool {
        self.cache.clear().await
    }

    pub async fn low_stock_alerts(&self) -> Vec<Product> {
        alerts::low_stock(&self.cache.list_all().await, self.settings.alerts.low_stock_ratio)
    }

    pub async fn expiring_alerts(&self) -> Vec<Product> {
        alerts::expiring_soon(
            &self.cache.list_all().await,
            Local::now().date_naive(),
            self.settings.alerts.expiry_window_days,
        )
    }

    pub async fn alerts(&self) -> Alerts {
        alerts::collect_alerts(
            &self.cache.list_all().await,
            Local::now().date_naive(),
            self.settings.alerts,
        )
    }

    /// Totals for the report generator.
    pub async fn summary(&self) -> InventorySummary {
        InventorySummary::from_products(
            &self.cache.list_all().await,
            self.settings.alerts.low_stock_ratio,
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRemote;
    use serde_json::json;
    use siam_core::ValidationError;
    use siam_db::{Database, DbConfig};

    const TONER: &str = "7591002200046";

    fn settings() -> RepositorySettings {
        RepositorySettings {
            refresh_on_connect: false,
            ..Default::default()
        }
    }

    async fn repository(remote: Arc<FakeRemote>) -> (Database, InventoryRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = InventoryRepository::new(db.cache(), remote, settings());
        repo.connect().await;
        (db, repo)
    }

    fn product(code: &str, name: &str, quantity: i64) -> Product {
        Product {
            quantity,
            ..Product::new(code, name)
        }
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cold_cache_lookup_populates_cache() {
        let remote = FakeRemote::online();
        remote.insert(product(TONER, "Toner HP 12A", 10));
        let (_db, repo) = repository(remote.clone()).await;
        assert_eq!(repo.state(), ConnectionState::Online);

        let found = repo.find_by_code(TONER).await.unwrap();
        assert_eq!(found.name, "Toner HP 12A");
        assert_eq!(found.quantity, 10);
        assert!(found.last_sync_timestamp.is_some());
        assert!(repo.cache().get(TONER).await.is_some());

        remote.set_reachable(false);
        assert_eq!(repo.find_by_code(TONER).await.unwrap().quantity, 10);
        assert_eq!(remote.gets(), 1);
    }

    #[tokio::test]
    async fn test_cached_products_never_hit_the_remote() {
        let remote = FakeRemote::online();
        remote.insert(product("A1", "Remote name", 99));
        let (_db, repo) = repository(remote.clone()).await;
        repo.cache().upsert(&product("A1", "Cached name", 1)).await;

        let found = repo.find_by_code("A1").await.unwrap();
        assert_eq!(found.name, "Cached name");
        assert_eq!(remote.gets(), 0);
    }

    #[tokio::test]
    async fn test_offline_miss_is_none_without_remote_call() {
        let remote = FakeRemote::unconfigured();
        let (_db, repo) = repository(remote.clone()).await;

        assert_eq!(repo.state(), ConnectionState::Offline);
        assert!(repo.find_by_code(TONER).await.is_none());
        assert_eq!(remote.gets(), 0);
    }

    #[tokio::test]
    async fn test_remote_failure_reads_as_not_found() {
        let remote = FakeRemote::online();
        let (_db, repo) = repository(remote.clone()).await;
        remote.set_reachable(false);

        assert!(repo.find_by_code(TONER).await.is_none());
        assert_eq!(remote.gets(), 1);
    }

    #[tokio::test]
    async fn test_find_by_code_with_callback() {
        let (_db, repo) = repository(FakeRemote::unconfigured()).await;
        repo.cache().upsert(&product("A1", "Cable", 4)).await;

        let mut seen = None;
        repo.find_by_code_with("A1", |p| seen = p.map(|p| p.quantity))
            .await;
        assert_eq!(seen, Some(4));
    }

    // -------------------------------------------------------------------------
    // Stock Movements
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_exit_beyond_stock_is_rejected_without_mutation() {
        let remote = FakeRemote::online();
        let (_db, repo) = repository(remote.clone()).await;
        repo.cache().upsert(&product(TONER, "Toner HP 12A", 10)).await;

        let err = repo.register_exit(TONER, 15, "clerk", "").await.unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 10, requested: 15, .. }
        ));
        assert_eq!(repo.cache().get(TONER).await.unwrap().quantity, 10);
        assert!(repo.pending_operations().await.is_empty());
        assert_eq!(remote.writes(), 0);
    }

    #[tokio::test]
    async fn test_offline_entry_is_applied_and_queued() {
        let (_db, repo) = repository(FakeRemote::unconfigured()).await;
        repo.cache().upsert(&product("A1", "Cable", 3)).await;

        let change = repo.register_entry("A1", 5, "clerk", "delivery").await.unwrap();

        assert_eq!(change.previous_quantity, 3);
        assert_eq!(change.new_quantity, 8);
        assert_eq!(change.remote, RemoteWrite::Queued);
        assert_eq!(repo.cache().get("A1").await.unwrap().quantity, 8);

        let pending = repo.pending_operations().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, OperationKind::Movement);
        assert_eq!(pending[0].collection, MOVEMENTS_COLLECTION);
        let payload: MovementPayload = serde_json::from_value(pending[0].payload.clone()).unwrap();
        assert_eq!(payload.resulting_quantity, 8);
        assert_eq!(payload.movement.notes, "delivery");
    }

    #[tokio::test]
    async fn test_online_exit_is_pushed() {
        let remote = FakeRemote::online();
        remote.insert(product("A1", "Cable", 6));
        let (_db, repo) = repository(remote.clone()).await;

        let change = repo.register_exit("A1", 6, "clerk", "").await.unwrap();

        assert_eq!(change.new_quantity, 0);
        assert_eq!(change.remote, RemoteWrite::Synced);
        assert_eq!(remote.product("A1").unwrap().quantity, 0);
        assert_eq!(remote.movements()[0].kind, MovementKind::Exit);
        assert!(repo.pending_operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_remote_write_queues_one_operation() {
        let remote = FakeRemote::online();
        remote.insert(product("A1", "Cable", 2));
        let (_db, repo) = repository(remote.clone()).await;
        remote.set_fail_writes(true);

        let change = repo.register_entry("A1", 1, "clerk", "").await.unwrap();

        assert_eq!(change.remote, RemoteWrite::Queued);
        assert_eq!(repo.pending_operations().await.len(), 1);
        assert_eq!(repo.cache().get("A1").await.unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_direct_write_waits_behind_queued_writes() {
        let remote = FakeRemote::online();
        remote.insert(product("A1", "Cable", 2));
        let (_db, repo) = repository(remote.clone()).await;
        repo.find_by_code("A1").await;

        remote.set_fail_writes(true);
        let entry = repo.register_entry("A1", 5, "clerk", "").await.unwrap();
        assert_eq!(entry.remote, RemoteWrite::Queued);

        remote.set_fail_writes(false);
        let writes_before = remote.writes();
        let exit = repo.register_exit("A1", 3, "clerk", "").await.unwrap();

        assert_eq!(exit.new_quantity, 4);
        assert_eq!(exit.remote, RemoteWrite::Queued);
        assert_eq!(remote.writes(), writes_before);
        assert_eq!(remote.product("A1").unwrap().quantity, 2);
        assert_eq!(repo.pending_operations().await.len(), 2);

        let report = repo.sync().await;

        assert_eq!(report.outcome, SyncOutcome::Completed);
        assert_eq!(report.replay.replayed, 2);
        assert_eq!(remote.product("A1").unwrap().quantity, 4);
        assert_eq!(repo.cache().get("A1").await.unwrap().quantity, 4);
        assert_eq!(remote.movements().len(), 2);
        assert!(repo.pending_operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_other_codes_push_while_writes_are_queued() {
        let remote = FakeRemote::online();
        remote.insert(product("A1", "Cable", 2));
        remote.insert(product("B2", "Binder", 7));
        let (_db, repo) = repository(remote.clone()).await;
        repo.find_by_code("A1").await;
        repo.find_by_code("B2").await;

        remote.set_fail_writes(true);
        repo.register_entry("A1", 1, "clerk", "").await.unwrap();
        remote.set_fail_writes(false);

        let change = repo.register_exit("B2", 2, "clerk", "").await.unwrap();

        assert_eq!(change.remote, RemoteWrite::Synced);
        assert_eq!(remote.product("B2").unwrap().quantity, 5);
        assert_eq!(repo.pending_operations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_and_negative_quantities_are_rejected() {
        let (_db, repo) = repository(FakeRemote::unconfigured()).await;
        repo.cache().upsert(&product("A1", "Cable", 3)).await;

        for quantity in [0, -2] {
            let err = repo.register_entry("A1", quantity, "clerk", "").await.unwrap_err();
            assert!(err.to_string().contains("must be greater than zero"));
        }
        let err = repo.register_exit("missing", 0, "clerk", "").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::MustBePositive { .. })));

        assert_eq!(repo.cache().get("A1").await.unwrap().quantity, 3);
        assert!(repo.pending_operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let (_db, repo) = repository(FakeRemote::online()).await;

        let err = repo.register_entry("missing", 1, "clerk", "").await.unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(code) if code == "missing"));
    }

    #[tokio::test]
    async fn test_adjust_quantity_offline_queues_update() {
        let (_db, repo) = repository(FakeRemote::unconfigured()).await;
        repo.cache().upsert(&product("A1", "Cable", 3)).await;

        assert_eq!(repo.adjust_quantity("A1", 11).await.unwrap(), RemoteWrite::Queued);
        assert!(repo.adjust_quantity("A1", -1).await.is_err());

        let pending = repo.pending_operations().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, OperationKind::Update);
        assert_eq!(pending[0].payload, json!({"code": "A1", "quantity": 11}));
    }

    // -------------------------------------------------------------------------
    // Catalog Writes
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_product_validation() {
        let (_db, repo) = repository(FakeRemote::online()).await;

        let err = repo.create_product(Product::new("", "X")).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Required { .. })));

        assert!(repo.create_product(Product::new("A/1", "X")).await.is_err());
        assert!(repo.create_product(product("A1", "X", -1)).await.is_err());

        let mut priced = Product::new("A1", "X");
        priced.unit_price = Some(-3.0);
        assert!(repo.create_product(priced).await.is_err());

        assert_eq!(repo.status().await.stats, CacheStats::default());
    }

    #[tokio::test]
    async fn test_create_product_online_and_offline() {
        let remote = FakeRemote::online();
        let (_db, repo) = repository(remote.clone()).await;

        let write = repo.create_product(product(" A1 ", "Cable", 3)).await.unwrap();
        assert_eq!(write, RemoteWrite::Synced);
        assert!(remote.product("A1").is_some());
        assert!(repo.cache().get("A1").await.is_some());

        let (_db, offline) = repository(FakeRemote::unconfigured()).await;
        let write = offline.create_product(product("B2", "Binder", 0)).await.unwrap();
        assert_eq!(write, RemoteWrite::Queued);
        assert_eq!(offline.pending_operations().await[0].kind, OperationKind::Create);
        assert!(offline.cache().get("B2").await.is_some());
    }

    #[tokio::test]
    async fn test_create_product_reports_storage_failure() {
        let remote = FakeRemote::online();
        let (db, repo) = repository(remote.clone()).await;
        db.close().await;

        let err = repo.create_product(product("A1", "Cable", 1)).await.unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert_eq!(remote.writes(), 0);
    }

    #[tokio::test]
    async fn test_delete_product() {
        let remote = FakeRemote::online();
        remote.insert(product("A1", "Cable", 1));
        let (_db, repo) = repository(remote.clone()).await;
        repo.find_by_code("A1").await;

        assert_eq!(repo.delete_product("A1").await.unwrap(), RemoteWrite::Synced);
        assert!(repo.cache().get("A1").await.is_none());
        assert!(remote.product("A1").is_none());

        let (_db, offline) = repository(FakeRemote::unconfigured()).await;
        assert!(matches!(
            offline.delete_product("A1").await,
            Err(CoreError::ProductNotFound(_))
        ));
        offline.cache().upsert(&product("A1", "Cable", 1)).await;
        assert_eq!(offline.delete_product("A1").await.unwrap(), RemoteWrite::Queued);
        assert_eq!(offline.pending_operations().await[0].kind, OperationKind::Delete);
    }

    #[tokio::test]
    async fn test_delete_unknown_product_online_is_not_found() {
        let remote = FakeRemote::online();
        let (_db, repo) = repository(remote.clone()).await;

        assert!(matches!(
            repo.delete_product("ghost").await,
            Err(CoreError::ProductNotFound(_))
        ));
        assert_eq!(remote.writes(), 0);
        assert!(repo.pending_operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_remote_only_product_online() {
        let remote = FakeRemote::online();
        remote.insert(product("A1", "Cable", 1));
        let (_db, repo) = repository(remote.clone()).await;

        assert_eq!(repo.delete_product("A1").await.unwrap(), RemoteWrite::Synced);
        assert!(remote.product("A1").is_none());
    }

    // -------------------------------------------------------------------------
    // Synchronization
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sync_moves_offline_to_online_and_replays() {
        let remote = FakeRemote::online();
        remote.insert(product("A1", "Cable", 3));
        remote.insert(product("B2", "Binder", 7));
        remote.set_reachable(false);

        let (_db, repo) = repository(remote.clone()).await;
        assert_eq!(repo.state(), ConnectionState::Offline);

        repo.cache().upsert(&product("A1", "Cable", 3)).await;
        repo.register_entry("A1", 5, "clerk", "").await.unwrap();

        remote.set_reachable(true);
        let report = repo.sync().await;

        assert_eq!(report.outcome, SyncOutcome::Completed);
        assert_eq!(repo.state(), ConnectionState::Online);
        assert_eq!(report.replay.replayed, 1);
        assert_eq!(report.fetched, 2);
        assert_eq!(report.merged, 2);
        assert_eq!(remote.product("A1").unwrap().quantity, 8);
        assert_eq!(repo.cache().get("B2").await.unwrap().quantity, 7);
        assert!(repo.pending_operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_sync_keeps_queued_local_changes_in_cache() {
        let remote = FakeRemote::online();
        remote.insert(product("A1", "Cable", 3));
        let (_db, repo) = repository(remote.clone()).await;
        repo.find_by_code("A1").await;

        remote.set_fail_writes(true);
        repo.register_entry("A1", 5, "clerk", "").await.unwrap();

        let report = repo.sync().await;

        assert_eq!(report.outcome, SyncOutcome::Completed);
        assert!(!report.replay.completed());
        assert_eq!(report.held_back, 1);
        assert_eq!(repo.cache().get("A1").await.unwrap().quantity, 8);
        assert_eq!(repo.pending_operations().await[0].attempt_count, 1);
    }

    #[tokio::test]
    async fn test_sync_while_running_returns_immediately() {
        let remote = FakeRemote::online();
        let (_db, repo) = repository(remote.clone()).await;
        let lists_before = remote.lists();

        let held = SyncGuard::acquire(&repo.sync_in_progress).unwrap();
        assert!(repo.status().await.sync_in_progress);
        assert_eq!(repo.sync().await.outcome, SyncOutcome::AlreadyRunning);
        assert_eq!(repo.refresh_catalog().await.outcome, SyncOutcome::AlreadyRunning);
        assert_eq!(remote.lists(), lists_before);
        drop(held);

        assert_eq!(repo.sync().await.outcome, SyncOutcome::Completed);
        assert!(!repo.status().await.sync_in_progress);
    }

    #[tokio::test]
    async fn test_sync_when_unconfigured_is_offline() {
        let (_db, repo) = repository(FakeRemote::unconfigured()).await;

        assert_eq!(repo.sync().await.outcome, SyncOutcome::Offline);
        assert_eq!(repo.refresh_catalog().await.outcome, SyncOutcome::Offline);
    }

    #[tokio::test]
    async fn test_connect_refreshes_catalog_when_configured() {
        let remote = FakeRemote::online();
        remote.insert(product("A1", "Cable", 3));
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = InventoryRepository::new(db.cache(), remote.clone(), RepositorySettings::default());

        assert_eq!(repo.state(), ConnectionState::Uninitialized);
        assert_eq!(repo.connect().await, ConnectionState::Online);

        assert_eq!(remote.lists(), 1);
        assert_eq!(repo.cache().stats().await.total_products, 1);
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let remote = FakeRemote::online();
        remote.insert(product("A1", "Cable", 3));
        remote.insert(product("B2", "Binder", 1));
        let (_db, repo) = repository(remote).await;

        let first = repo.refresh_catalog().await;
        let listing = repo.list_all().await;
        let second = repo.refresh_catalog().await;

        assert_eq!(first.merged, 2);
        assert_eq!(second.merged, 2);
        assert_eq!(repo.list_all().await.len(), listing.len());
    }

    #[tokio::test]
    async fn test_failed_download_leaves_cache_alone() {
        let remote = FakeRemote::online();
        let (_db, repo) = repository(remote.clone()).await;
        repo.cache().upsert(&product("A1", "Cable", 3)).await;
        remote.set_reachable(false);

        let report = repo.refresh_catalog().await;

        assert_eq!(report.outcome, SyncOutcome::CatalogUnavailable);
        assert!(report.error.is_some());
        assert_eq!(repo.list_all().await.len(), 1);
    }

    // -------------------------------------------------------------------------
    // Diagnostics, Alerts and Reports
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_status_alerts_and_summary() {
        let (_db, repo) = repository(FakeRemote::unconfigured()).await;

        let mut toner = product(TONER, "Toner HP 12A", 2);
        toner.category = "Office".into();
        toner.extra_fields.insert("max_stock".into(), json!(40));
        let mut milk = product("M1", "Milk", 20);
        milk.extra_fields.insert(
            "expiration_date".into(),
            json!(Local::now().date_naive().format("%Y-%m-%d").to_string()),
        );
        repo.create_product(toner).await.unwrap();
        repo.create_product(milk).await.unwrap();

        let status = repo.status().await;
        assert_eq!(status.state, ConnectionState::Offline);
        assert!(!status.is_online);
        assert!(!status.remote_available);
        assert_eq!(status.stats.total_products, 2);
        assert_eq!(status.stats.pending_count, 2);

        assert_eq!(repo.low_stock_alerts().await[0].code, TONER);
        assert_eq!(repo.expiring_alerts().await[0].code, "M1");
        assert!(!repo.alerts().await.is_empty());

        let summary = repo.summary().await;
        assert_eq!(summary.total_products, 2);
        assert_eq!(summary.total_units, 22);
        assert_eq!(summary.low_stock, 1);

        assert!(repo.clear_cache().await);
        assert_eq!(repo.status().await.stats, CacheStats::default());
    }
}
