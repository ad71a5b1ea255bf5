//! # Commands Module
//!
//! Every subcommand of the `siam` binary.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (dispatch)
//! ├── product.rs  ◄─── Lookup, listing, create, delete
//! ├── stock.rs    ◄─── Entries, exits, adjustments
//! ├── sync.rs     ◄─── Status, sync, refresh, queue, clear
//! ├── report.rs   ◄─── Alerts and inventory summary
//! └── import.rs   ◄─── JSON catalog import
//! ```
//!
//! ## How Commands Work
//! ```text
//! siam exit 7591002200046 2
//!      │
//!      ▼
//! Cli::parse() ──► Command::Exit(MovementArgs)
//!      │
//!      ▼
//! dispatch(&ctx, command)
//!      │
//!      ▼
//! stock::exit(&ctx, args) ──► ctx.repo.register_exit(..)
//!      │
//!      ▼
//! ctx.output.emit(&change, || notice)   stdout: "✓ Exit registered. New stock: 8"
//! ```

pub mod import;
pub mod product;
pub mod report;
pub mod stock;
pub mod sync;

use crate::error::CliResult;
use crate::{AppContext, Command};

/// Runs one command against the context.
pub async fn dispatch(ctx: &AppContext, command: Command) -> CliResult<()> {
    match command {
        Command::Status => sync::status(ctx).await,
        Command::Lookup { code } => product::lookup(ctx, &code).await,
        Command::List { category, search } => {
            product::list(ctx, category.as_deref(), search.as_deref()).await
        }
        Command::Entry(args) => stock::entry(ctx, args).await,
        Command::Exit(args) => stock::exit(ctx, args).await,
        Command::Adjust { code, quantity } => stock::adjust(ctx, &code, quantity).await,
        Command::Create(args) => product::create(ctx, args).await,
        Command::Delete { code } => product::delete(ctx, &code).await,
        Command::Import { file, dry_run } => import::import(ctx, &file, dry_run).await,
        Command::Sync => sync::sync(ctx).await,
        Command::Refresh => sync::refresh(ctx).await,
        Command::Pending => sync::pending(ctx).await,
        Command::Alerts => report::alerts(ctx).await,
        Command::Report => report::report(ctx).await,
        Command::Clear { yes } => sync::clear(ctx, yes).await,
    }
}

/// Context over an in-memory cache and an unconfigured remote.
#[cfg(test)]
pub(crate) async fn offline_context() -> AppContext {
    use crate::Output;
    use siam_db::{Database, DbConfig};
    use siam_sync::{FirestoreClient, RemoteSettings, RepositorySettings};
    use std::sync::Arc;

    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let remote = Arc::new(FirestoreClient::new(RemoteSettings::default()).unwrap());
    let ctx = AppContext::from_parts(db, remote, RepositorySettings::default(), Output::Json, false);
    ctx.connect().await;
    ctx
}
