//! # Inventory Summary
//!
//! Aggregates a flat catalog snapshot into the figures the report generator
//! prints: totals, stock-outs, low-stock count and a per-category breakdown.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::alerts::is_low_stock;
use crate::types::Product;

/// Label used for products without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Per-category figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub products: usize,
    pub units: i64,
}

/// Catalog-wide figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_products: usize,
    pub total_units: i64,
    pub out_of_stock: usize,
    pub low_stock: usize,
    /// Sorted by category name.
    pub by_category: BTreeMap<String, CategoryTotals>,
}

impl InventorySummary {
    /// Builds the summary from a catalog snapshot.
    pub fn from_products(products: &[Product], low_stock_ratio: f64) -> Self {
        let mut summary = InventorySummary {
            total_products: products.len(),
            ..Default::default()
        };

        for product in products {
            summary.total_units += product.quantity;

            if product.quantity == 0 {
                summary.out_of_stock += 1;
            }
            if is_low_stock(product, low_stock_ratio) {
                summary.low_stock += 1;
            }

            let category = match product.category.trim() {
                "" => UNCATEGORIZED,
                other => other,
            };
            let totals = summary.by_category.entry(category.to_string()).or_default();
            totals.products += 1;
            totals.units += product.quantity;
        }

        summary
    }
}
