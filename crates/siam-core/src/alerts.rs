//! # Stock Alerts
//!
//! Read-only rules that flag products for attention. They drive UI
//! notifications and never take part in the write path.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LOW STOCK (either condition)                                           │
//! │    max_stock > 0  and  quantity <= max_stock × ratio   (ratio = 0.15)   │
//! │    min_stock > 0  and  quantity <= min_stock                            │
//! │                                                                         │
//! │  EXPIRING SOON                                                          │
//! │    expiration_date <= today + window   (window = 30 days)               │
//! │    already expired products are included                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The thresholds live in `extra_fields`, so products imported without them
//! simply never alert.

use chrono::{DateTime, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::Product;

/// Extra field holding the reorder point.
pub const MIN_STOCK_FIELD: &str = "min_stock";

/// Extra field holding the shelf capacity.
pub const MAX_STOCK_FIELD: &str = "max_stock";

/// Extra field holding the expiration date.
pub const EXPIRATION_FIELD: &str = "expiration_date";

/// Tunable alert thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Fraction of `max_stock` at or below which stock counts as low.
    pub low_stock_ratio: f64,

    /// How many days ahead an expiration date triggers an alert.
    pub expiry_window_days: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        AlertThresholds {
            low_stock_ratio: 0.15,
            expiry_window_days: 30,
        }
    }
}

/// Both alert lists at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alerts {
    pub low_stock: Vec<Product>,
    pub expiring: Vec<Product>,
}

impl Alerts {
    pub fn is_empty(&self) -> bool {
        self.low_stock.is_empty() && self.expiring.is_empty()
    }
}

/// Returns true if the product is at or below its low-stock threshold.
pub fn is_low_stock(product: &Product, ratio: f64) -> bool {
    let max_stock = product.extra_i64(MAX_STOCK_FIELD).unwrap_or(0);
    let min_stock = product.extra_i64(MIN_STOCK_FIELD).unwrap_or(0);

    (max_stock > 0 && (product.quantity as f64) <= (max_stock as f64) * ratio)
        || (min_stock > 0 && product.quantity <= min_stock)
}

/// Parses the product's expiration date.
///
/// Accepts `YYYY-MM-DD` and full RFC 3339 timestamps.
pub fn expiration_date(product: &Product) -> Option<NaiveDate> {
    let raw = product.extra_str(EXPIRATION_FIELD)?.trim();

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Returns true if the product expires within `window_days` of `today`.
pub fn is_expiring(product: &Product, today: NaiveDate, window_days: i64) -> bool {
    match expiration_date(product) {
        Some(date) => date <= today + Duration::days(window_days),
        None => false,
    }
}

/// Products at or below their low-stock threshold, in input order.
pub fn low_stock(products: &[Product], ratio: f64) -> Vec<Product> {
    products
        .iter()
        .filter(|p| is_low_stock(p, ratio))
        .cloned()
        .collect()
}

/// Products expiring within the window, soonest first.
pub fn expiring_soon(products: &[Product], today: NaiveDate, window_days: i64) -> Vec<Product> {
    let mut dated: Vec<(NaiveDate, &Product)> = products
        .iter()
        .filter_map(|p| expiration_date(p).map(|d| (d, p)))
        .filter(|(d, _)| *d <= today + Duration::days(window_days))
        .collect();

    dated.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(&b.1.name)));
    dated.into_iter().map(|(_, p)| p.clone()).collect()
}

/// Evaluates every alert rule over a catalog snapshot.
pub fn collect_alerts(products: &[Product], today: NaiveDate, thresholds: AlertThresholds) -> Alerts {
    Alerts {
        low_stock: low_stock(products, thresholds.low_stock_ratio),
        expiring: expiring_soon(products, today, thresholds.expiry_window_days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(code: &str, quantity: i64, extras: serde_json::Value) -> Product {
        let mut p = Product::new(code, format!("Product {code}"));
        p.quantity = quantity;
        if let serde_json::Value::Object(map) = extras {
            p.extra_fields.extend(map);
        }
        p
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_low_stock_by_max_ratio() {
        // 15% of 100 = 15
        assert!(is_low_stock(&product("A", 15, json!({"max_stock": 100})), 0.15));
        assert!(!is_low_stock(&product("A", 16, json!({"max_stock": 100})), 0.15));
    }

    #[test]
    fn test_low_stock_by_min() {
        assert!(is_low_stock(&product("A", 5, json!({"min_stock": 5})), 0.15));
        assert!(!is_low_stock(&product("A", 6, json!({"min_stock": 5})), 0.15));
    }

    #[test]
    fn test_no_thresholds_never_alerts() {
        assert!(!is_low_stock(&product("A", 0, json!({})), 0.15));
        assert!(!is_low_stock(&product("A", 0, json!({"min_stock": 0})), 0.15));
    }

    #[test]
    fn test_expiring_window() {
        let today = day("2026-03-01");
        let soon = product("S", 1, json!({"expiration_date": "2026-03-31"}));
        let later = product("L", 1, json!({"expiration_date": "2026-04-01"}));
        let expired = product("E", 1, json!({"expiration_date": "2025-12-24T00:00:00Z"}));
        let undated = product("U", 1, json!({}));

        assert!(is_expiring(&soon, today, 30));
        assert!(!is_expiring(&later, today, 30));
        assert!(is_expiring(&expired, today, 30));
        assert!(!is_expiring(&undated, today, 30));

        let list = expiring_soon(&[later, soon, undated, expired], today, 30);
        let codes: Vec<&str> = list.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["E", "S"]);
    }

    #[test]
    fn test_garbage_dates_are_ignored() {
        let p = product("G", 1, json!({"expiration_date": "next tuesday"}));
        assert_eq!(expiration_date(&p), None);
    }

    #[test]
    fn test_collect_alerts() {
        let products = vec![
            product("A", 1, json!({"min_stock": 3})),
            product("B", 50, json!({"max_stock": 60})),
        ];
        let alerts = collect_alerts(&products, day("2026-01-01"), AlertThresholds::default());
        assert_eq!(alerts.low_stock.len(), 1);
        assert!(alerts.expiring.is_empty());
        assert!(!alerts.is_empty());
    }
}
