//! # Sync Commands
//!
//! Connection status, manual sync, the pending queue and cache reset.

use serde::Serialize;
use siam_core::PendingOperation;
use siam_sync::replay::payload_code;
use siam_sync::{RepositoryStatus, SyncOutcome, SyncReport};
use tracing::info;

use crate::error::{CliError, CliResult, ErrorCode};
use crate::AppContext;

pub async fn status(ctx: &AppContext) -> CliResult<()> {
    let status: RepositoryStatus = ctx.repo.status().await;

    ctx.output.emit(&status, || {
        format!(
            "State:            {}\nProducts cached:  {}\nPending writes:   {}",
            status.state, status.stats.total_products, status.stats.pending_count
        )
    })
}

fn sync_text(report: &SyncReport) -> String {
    let mut text = match report.outcome {
        SyncOutcome::Completed => "✓ Sync completed".to_string(),
        SyncOutcome::Offline => "✗ Remote catalog unavailable, working offline".to_string(),
        SyncOutcome::AlreadyRunning => "✗ A sync is already running".to_string(),
        SyncOutcome::CatalogUnavailable => "✗ Catalog download failed".to_string(),
    };

    let replay = &report.replay;
    if replay.replayed > 0 || replay.dead_lettered > 0 || replay.stopped_at.is_some() {
        text.push_str(&format!(
            "\n  replayed: {}  dead-lettered: {}  still pending: {}",
            replay.replayed, replay.dead_lettered, replay.remaining
        ));
    }
    if let Some(error) = &replay.last_error {
        text.push_str(&format!("\n  replay stopped: {}", error));
    }
    if report.fetched > 0 {
        text.push_str(&format!(
            "\n  downloaded: {}  merged: {}  kept local: {}",
            report.fetched, report.merged, report.held_back
        ));
    }
    if let Some(error) = &report.error {
        text.push_str(&format!("\n  {}", error));
    }
    text
}

fn finish(ctx: &AppContext, report: SyncReport) -> CliResult<()> {
    ctx.output.emit(&report, || sync_text(&report))?;

    match report.outcome {
        SyncOutcome::Completed => Ok(()),
        SyncOutcome::Offline => Err(CliError::new(ErrorCode::RemoteError, "Remote catalog unavailable")),
        SyncOutcome::AlreadyRunning => Err(CliError::new(ErrorCode::RemoteError, "A sync is already running")),
        SyncOutcome::CatalogUnavailable => Err(CliError::new(
            ErrorCode::RemoteError,
            report.error.unwrap_or_else(|| "Catalog download failed".to_string()),
        )),
    }
}

pub async fn sync(ctx: &AppContext) -> CliResult<()> {
    if ctx.is_offline() {
        return Err(CliError::new(ErrorCode::ConfigError, "Cannot sync with --offline"));
    }
    let report = ctx.repo.sync().await;
    finish(ctx, report)
}

pub async fn refresh(ctx: &AppContext) -> CliResult<()> {
    if ctx.is_offline() {
        return Err(CliError::new(ErrorCode::ConfigError, "Cannot refresh with --offline"));
    }
    let connected = ctx.connect().await;
    info!(state = %connected, "Refreshing catalog");
    let report = ctx.repo.refresh_catalog().await;
    finish(ctx, report)
}

#[derive(Debug, Serialize)]
struct PendingView<'a> {
    #[serde(flatten)]
    operation: &'a PendingOperation,
    dead_lettered: bool,
}

pub async fn pending(ctx: &AppContext) -> CliResult<()> {
    let operations = ctx.repo.pending_operations().await;
    let max_attempts = ctx.repo.settings().max_attempts;
    let views: Vec<PendingView> = operations
        .iter()
        .map(|operation| PendingView {
            operation,
            dead_lettered: operation.attempt_count >= max_attempts,
        })
        .collect();

    ctx.output.emit(&views, || {
        if views.is_empty() {
            return "No pending writes".to_string();
        }
        views
            .iter()
            .map(|view| {
                let op = view.operation;
                let mut line = format!(
                    "#{:<5} {:<8} {:<16} {}  attempts: {}",
                    op.id,
                    op.kind.as_str(),
                    payload_code(&op.payload).unwrap_or("-"),
                    op.created_at.format("%Y-%m-%d %H:%M:%S"),
                    op.attempt_count
                );
                if view.dead_lettered {
                    line.push_str("  [dead-lettered]");
                }
                if let Some(error) = &op.last_error {
                    line.push_str(&format!("\n       last error: {}", error));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}

pub async fn clear(ctx: &AppContext, confirmed: bool) -> CliResult<()> {
    if !confirmed {
        return Err(CliError::new(
            ErrorCode::ValidationError,
            "This deletes every cached product and pending write; pass --yes to confirm",
        ));
    }

    if !ctx.repo.clear_cache().await {
        return Err(CliError::new(ErrorCode::StorageError, "Could not clear the local cache"));
    }

    ctx.output.emit(&serde_json::json!({ "cleared": true }), || {
        "✓ Local cache cleared".to_string()
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::offline_context;
    use siam_core::Product;
    use siam_sync::ReplayReport;

    #[tokio::test]
    async fn test_unconfigured_sync_fails_offline() {
        let ctx = offline_context().await;

        let err = sync(&ctx).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RemoteError);
    }

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let ctx = offline_context().await;
        ctx.repo.cache().upsert(&Product::new("A1", "Cable")).await;

        assert_eq!(clear(&ctx, false).await.unwrap_err().code, ErrorCode::ValidationError);
        assert_eq!(ctx.repo.list_all().await.len(), 1);

        clear(&ctx, true).await.unwrap();
        assert!(ctx.repo.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_status_and_pending_render() {
        let ctx = offline_context().await;
        ctx.repo.create_product(Product::new("A1", "Cable")).await.unwrap();

        status(&ctx).await.unwrap();
        pending(&ctx).await.unwrap();
    }

    #[test]
    fn test_sync_text() {
        let report = SyncReport {
            outcome: SyncOutcome::Completed,
            replay: ReplayReport {
                replayed: 2,
                ..Default::default()
            },
            fetched: 5,
            merged: 4,
            held_back: 1,
            error: None,
        };

        let text = sync_text(&report);
        assert!(text.starts_with("✓ Sync completed"));
        assert!(text.contains("replayed: 2"));
        assert!(text.contains("kept local: 1"));
    }
}
