//! # siam-db: Local Cache Store for SIAM
//!
//! This crate keeps the device-local copy of the product catalog and the
//! queue of writes that still have to reach the remote catalog. It uses
//! SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SIAM Data Flow                                   │
//! │                                                                         │
//! │  InventoryRepository (siam-sync)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     siam-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  LocalCache   │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (cache.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ bool / Option │───►│ PendingQueue  │    │ 001_init.sql │  │   │
//! │  │   │ never errors  │    │ Repo          │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │            ▲                                                    │   │
//! │  │   Database (pool.rs): SqlitePool, WAL                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/inventory/siam.db (per-platform data dir)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Product and pending-queue repositories
//! - [`cache`] - Fault-absorbing facade used by the orchestrator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use siam_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/siam.db")).await?;
//! let cache = db.cache();
//!
//! cache.bulk_sync(&remote_products).await;
//! let hits = cache.search("toner").await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::LocalCache;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::pending::PendingQueueRepository;
pub use repository::product::ProductRepository;
