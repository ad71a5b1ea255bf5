//! # siam-core: Pure Inventory Logic for SIAM
//!
//! This crate is the **heart** of SIAM. It contains the inventory rules as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SIAM Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Front end (siam-cli / UI)                      │   │
//! │  │     Scan ──► Lookup ──► Entry / Exit ──► Alerts / Report        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            siam-sync (InventoryRepository orchestrator)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ siam-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ validation│  │  alerts   │  │  report   │  │   │
//! │  │   │  Product  │  │   rules   │  │ low stock │  │  summary  │  │   │
//! │  │   │ Movement  │  │  checks   │  │ expiring  │  │ by categ. │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Movement, PendingOperation, etc.)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`alerts`] - Low-stock and expiring-soon rules
//! - [`report`] - Inventory summary for the report generator
//!
//! ## Example Usage
//!
//! ```rust
//! use siam_core::types::{MovementKind, Product};
//!
//! let mut product = Product::new("7591002200046", "Toner HP 12A");
//! product.quantity = 10;
//!
//! // Exits may never drive stock below zero
//! assert!(product.apply_movement(MovementKind::Exit, 15).is_err());
//! assert_eq!(product.apply_movement(MovementKind::Entry, 5).unwrap(), 15);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod error;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use siam_core::Product` instead of
// `use siam_core::types::Product`

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Remote collection holding one document per product.
pub const PRODUCTS_COLLECTION: &str = "products";

/// Remote collection holding the immutable movement history.
pub const MOVEMENTS_COLLECTION: &str = "movements";

/// Unit assigned to products that do not declare one.
pub const DEFAULT_UNIT: &str = "units";
