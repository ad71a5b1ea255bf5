//! # Stock Commands
//!
//! Entries, exits and count adjustments.
//!
//! ## User Workflow
//! ```text
//! siam exit 7591002200046 15
//!      │
//!      ▼
//! register_exit ── stock 10 < 15 ──► ✗ Insufficient stock. Available: 10
//!      │
//!      └── stock 20 ──► ✓ Exit registered. New stock: 5 (pending sync)
//! ```

use serde_json::json;
use siam_core::{CoreResult, StockChange};
use siam_sync::Notice;

use super::product::remote_suffix;
use crate::error::CliResult;
use crate::{AppContext, MovementArgs};

fn emit_change(ctx: &AppContext, result: CoreResult<StockChange>) -> CliResult<()> {
    let notice = Notice::from_stock_result(&result);
    let change = result?;
    ctx.output.emit(&change, || notice.to_string())
}

pub async fn entry(ctx: &AppContext, args: MovementArgs) -> CliResult<()> {
    ctx.connect().await;
    let result = ctx
        .repo
        .register_entry(&args.code, args.quantity, &args.user, &args.notes)
        .await;
    emit_change(ctx, result)
}

pub async fn exit(ctx: &AppContext, args: MovementArgs) -> CliResult<()> {
    ctx.connect().await;
    let result = ctx
        .repo
        .register_exit(&args.code, args.quantity, &args.user, &args.notes)
        .await;
    emit_change(ctx, result)
}

pub async fn adjust(ctx: &AppContext, code: &str, quantity: i64) -> CliResult<()> {
    ctx.connect().await;
    let write = ctx.repo.adjust_quantity(code, quantity).await?;

    ctx.output.emit(
        &json!({ "code": code.trim(), "quantity": quantity, "remote": write }),
        || format!("✓ Stock of {} set to {}{}", code.trim(), quantity, remote_suffix(write)),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::offline_context;
    use crate::error::ErrorCode;
    use siam_core::{OperationKind, Product};

    fn movement(code: &str, quantity: i64) -> MovementArgs {
        MovementArgs {
            code: code.into(),
            quantity,
            user: "clerk".into(),
            notes: String::new(),
        }
    }

    async fn stocked(quantity: i64) -> AppContext {
        let ctx = offline_context().await;
        let product = Product {
            quantity,
            ..Product::new("7591002200046", "Toner HP 12A")
        };
        ctx.repo.cache().upsert(&product).await;
        ctx
    }

    #[tokio::test]
    async fn test_entry_offline_queues_movement() {
        let ctx = stocked(3).await;

        entry(&ctx, movement("7591002200046", 5)).await.unwrap();

        let product = ctx.repo.cache().get("7591002200046").await.unwrap();
        assert_eq!(product.quantity, 8);
        let pending = ctx.repo.pending_operations().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, OperationKind::Movement);
    }

    #[tokio::test]
    async fn test_exit_beyond_stock() {
        let ctx = stocked(10).await;

        let err = exit(&ctx, movement("7591002200046", 15)).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.message, "Insufficient stock. Available: 10");
        assert_eq!(ctx.repo.cache().get("7591002200046").await.unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_zero_quantity() {
        let ctx = stocked(10).await;

        let err = entry(&ctx, movement("7591002200046", 0)).await.unwrap_err();
        assert_eq!(err.message, "Quantity must be greater than zero");
    }

    #[tokio::test]
    async fn test_adjust() {
        let ctx = stocked(10).await;

        adjust(&ctx, "7591002200046", 4).await.unwrap();
        assert_eq!(ctx.repo.cache().get("7591002200046").await.unwrap().quantity, 4);

        let err = adjust(&ctx, "7591002200046", -1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
