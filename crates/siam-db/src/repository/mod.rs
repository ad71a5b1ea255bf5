//! # Repository Module
//!
//! Database repository implementations for the SIAM cache.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  LocalCache (fault-absorbing facade)                                   │
//! │       │                                                                 │
//! │       │  cache.get("7591002200046")                                    │
//! │       ▼                                                                 │
//! │  ProductRepository               PendingQueueRepository                │
//! │  ├── get_by_code(&self, code)    ├── enqueue(&self, kind, ...)         │
//! │  ├── search(&self, term)         ├── list(&self)                       │
//! │  ├── upsert(&self, product)      ├── dequeue(&self, id)                │
//! │  └── set_quantity(&self, ...)    └── record_attempt(&self, id, err)    │
//! │       │                                                                 │
//! │       │  SQL Query (DbResult<T>)                                        │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD and search
//! - [`PendingQueueRepository`](pending::PendingQueueRepository) - Pending write queue

pub mod pending;
pub mod product;
