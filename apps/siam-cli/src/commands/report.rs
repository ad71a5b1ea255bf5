//! # Report Commands
//!
//! Alert lists and the inventory summary.

use chrono::Local;
use serde::Serialize;
use siam_core::alerts::expiration_date;
use siam_core::report::InventorySummary;

use super::product::product_line;
use crate::error::CliResult;
use crate::AppContext;

pub async fn alerts(ctx: &AppContext) -> CliResult<()> {
    let alerts = ctx.repo.alerts().await;

    ctx.output.emit(&alerts, || {
        if alerts.is_empty() {
            return "✓ No alerts".to_string();
        }

        let mut lines = Vec::new();
        if !alerts.low_stock.is_empty() {
            lines.push(format!("Low stock ({}):", alerts.low_stock.len()));
            lines.extend(alerts.low_stock.iter().map(|p| format!("  {}", product_line(p))));
        }
        if !alerts.expiring.is_empty() {
            lines.push(format!("Expiring ({}):", alerts.expiring.len()));
            lines.extend(alerts.expiring.iter().map(|p| {
                let date = expiration_date(p)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                format!("  {}  {}", date, product_line(p))
            }));
        }
        lines.join("\n")
    })
}

#[derive(Debug, Serialize)]
struct Report {
    generated_at: String,
    #[serde(flatten)]
    summary: InventorySummary,
}

/// Plain-text rendering of a summary.
pub fn summary_text(summary: &InventorySummary, generated_at: &str) -> String {
    let mut text = format!(
        "INVENTORY REPORT  {}\n\nProducts:      {}\nUnits on hand: {}\nOut of stock:  {}\nLow stock:     {}\n",
        generated_at,
        summary.total_products,
        summary.total_units,
        summary.out_of_stock,
        summary.low_stock
    );

    if !summary.by_category.is_empty() {
        text.push_str(&format!("\n{:<24} {:>8} {:>10}\n", "Category", "Products", "Units"));
        for (category, totals) in &summary.by_category {
            text.push_str(&format!(
                "{:<24} {:>8} {:>10}\n",
                category, totals.products, totals.units
            ));
        }
    }
    text
}

pub async fn report(ctx: &AppContext) -> CliResult<()> {
    let report = Report {
        generated_at: Local::now().format("%Y-%m-%d %H:%M").to_string(),
        summary: ctx.repo.summary().await,
    };

    ctx.output
        .emit(&report, || summary_text(&report.summary, &report.generated_at))
}

// =============================================================================
// Unit Tests
// =============================================================================
