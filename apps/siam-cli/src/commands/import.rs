//! # Catalog Import
//!
//! Loads a JSON array of products, the format produced by the scraping and
//! Open Food Facts tools.
//!
//! ## Import Flow
//! ```text
//! catalog.json ──► [ {record}, {record}, ... ]
//!                         │
//!                         ▼
//!                 decode as Product   (unknown keys ──► extra_fields)
//!                         │
//!          ┌──────────────┴──────────────┐
//!          ▼                             ▼
//!      --dry-run                    create_product
//!   validate only           same validation + cache upsert +
//!                           remote create or pending "create"
//!                                        │
//!                                        ▼
//!               ImportReport { imported, synced, queued, invalid[] }
//! ```
//!
//! Invalid records are reported and skipped; they never stop the import.

use serde::Serialize;
use serde_json::Value;
use siam_core::validation::validate_new_product;
use siam_core::{CoreError, Product, RemoteWrite};
use siam_sync::Notice;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{CliError, CliResult};
use crate::AppContext;

/// A record that could not be imported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportIssue {
    /// Position in the input array.
    pub index: usize,
    pub code: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub total: usize,
    pub imported: usize,
    pub synced: usize,
    pub queued: usize,
    pub local_only: usize,
    pub dry_run: bool,
    pub invalid: Vec<ImportIssue>,
}

impl ImportReport {
    fn record(&mut self, write: RemoteWrite) {
        self.imported += 1;
        match write {
            RemoteWrite::Synced => self.synced += 1,
            RemoteWrite::Queued => self.queued += 1,
            RemoteWrite::LocalOnly => self.local_only += 1,
        }
    }

    fn text(&self) -> String {
        let verb = if self.dry_run { "valid" } else { "imported" };
        let mut text = format!("✓ {} of {} products {}", self.imported, self.total, verb);
        if !self.dry_run && self.imported > 0 {
            text.push_str(&format!(
                " (synced: {}, pending sync: {}, device only: {})",
                self.synced, self.queued, self.local_only
            ));
        }
        for issue in &self.invalid {
            text.push_str(&format!(
                "\n  ✗ #{} {}: {}",
                issue.index,
                issue.code.as_deref().unwrap_or("?"),
                issue.reason
            ));
        }
        text
    }
}

/// Splits an input document into raw records.
pub fn parse_records(contents: &str) -> CliResult<Vec<Value>> {
    match serde_json::from_str::<Value>(contents)? {
        Value::Array(records) => Ok(records),
        _ => Err(CliError::input("Expected a JSON array of products")),
    }
}

/// Decodes one record. Numeric codes are accepted and kept as text.
pub fn decode_record(mut record: Value) -> Result<Product, String> {
    if let Some(Value::Number(n)) = record.get("code") {
        let code = n.to_string();
        record["code"] = Value::String(code);
    }
    serde_json::from_value(record).map_err(|e| e.to_string())
}

fn record_code(record: &Value) -> Option<String> {
    match record.get("code")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub async fn import(ctx: &AppContext, file: &Path, dry_run: bool) -> CliResult<()> {
    let contents = std::fs::read_to_string(file)
        .map_err(|e| CliError::input(format!("Could not read {}: {}", file.display(), e)))?;
    let records = parse_records(&contents)?;

    if !dry_run {
        ctx.connect().await;
    }

    let report = import_records(ctx, records, dry_run).await;
    info!(
        total = report.total,
        imported = report.imported,
        invalid = report.invalid.len(),
        dry_run,
        "Import finished"
    );

    ctx.output.emit(&report, || report.text())
}

/// Sends every record through the product-creation path.
pub async fn import_records(ctx: &AppContext, records: Vec<Value>, dry_run: bool) -> ImportReport {
    let mut report = ImportReport {
        total: records.len(),
        dry_run,
        ..Default::default()
    };

    for (index, record) in records.into_iter().enumerate() {
        let code = record_code(&record);
        let outcome = match decode_record(record) {
            Err(reason) => Err(reason),
            Ok(product) if dry_run => validate_new_product(&product)
                .map(|_| None)
                .map_err(|e| Notice::from_error(&CoreError::from(e)).message),
            Ok(product) => ctx
                .repo
                .create_product(product)
                .await
                .map(Some)
                .map_err(|e| Notice::from_error(&e).message),
        };

        match outcome {
            Ok(Some(write)) => report.record(write),
            Ok(None) => report.imported += 1,
            Err(reason) => {
                warn!(index, code = ?code, reason = %reason, "Skipping import record");
                report.invalid.push(ImportIssue { index, code, reason });
            }
        }
    }

    report
}

// =============================================================================
// Unit Tests
// =============================================================================
