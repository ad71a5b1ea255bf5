//! # siam-sync: Remote Catalog and Sync Orchestration for SIAM
//!
//! This crate connects the device-local cache to the remote product catalog
//! (Firestore over REST) and decides, for every read and write, which side
//! serves it.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Offline-First Repository                          │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │              InventoryRepository (Main Orchestrator)             │  │
//! │  │                                                                  │  │
//! │  │  Uninitialized ──connect()──► Online | Offline                   │  │
//! │  │  Cache-first reads, stock rules, write-or-enqueue                │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │   Replayer     │  │ FirestoreClient│  │  LocalCache (siam-db)  │    │
//! │  │                │  │                │  │                        │    │
//! │  │ Drains the     │  │ REST + JSON    │  │ products +             │    │
//! │  │ pending queue  │  │ 10s/15s limits │  │ pending_queue          │    │
//! │  │ oldest first   │  │ typed values   │  │ never errors           │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  SUPPORT:                                                              │
//! │  • codec   - Firestore typed-value documents <-> Product / Movement    │
//! │  • config  - siam.toml, legacy firebase-config.json, SIAM_* env vars   │
//! │  • notice  - user-facing success/failure messages                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`repository`] - Main `InventoryRepository` orchestrator
//! - [`client`] - `RemoteCatalog` trait and the Firestore REST client
//! - [`codec`] - Firestore document encoding
//! - [`replay`] - Pending queue replay
//! - [`config`] - Application configuration
//! - [`notice`] - Result messages for the front end
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use siam_sync::{AppConfig, FirestoreClient, InventoryRepository, RepositorySettings};
//!
//! let config = AppConfig::load_or_default(None);
//! let remote = Arc::new(FirestoreClient::new(config.remote.clone())?);
//! let repo = InventoryRepository::new(db.cache(), remote, RepositorySettings::from(&config));
//!
//! repo.connect().await;
//! let report = repo.sync().await;
//! println!("Replayed: {}", report.replay.replayed);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod notice;
pub mod replay;
pub mod repository;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use client::{spawn_get_by_code, spawn_list_all, FirestoreClient, RemoteCatalog};
pub use config::{AlertSettings, AppConfig, CacheSettings, RemoteSettings, SyncSettings};
pub use error::{SyncError, SyncResult};
pub use notice::Notice;
pub use replay::{ReplayReport, Replayer};
pub use repository::{
    ConnectionState, InventoryRepository, RepositorySettings, RepositoryStatus, SyncOutcome,
    SyncReport,
};
