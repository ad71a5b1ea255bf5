//! # SIAM CLI Library
//!
//! Command-line front end for the SIAM offline-first inventory repository.
//!
//! ## Module Organization
//! ```text
//! siam_cli/
//! ├── lib.rs          ◄─── You are here (arguments, context, run)
//! ├── commands/
//! │   ├── mod.rs      ◄─── Dispatch + output helpers
//! │   ├── product.rs  ◄─── lookup, list, create, delete
//! │   ├── stock.rs    ◄─── entry, exit, adjust
//! │   ├── sync.rs     ◄─── status, sync, refresh, pending, clear
//! │   ├── report.rs   ◄─── alerts, report
//! │   └── import.rs   ◄─── JSON catalog import
//! └── error.rs        ◄─── CliError + ErrorCode
//! ```
//!
//! ## Connection Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cache-only commands      status, list, pending, alerts, report, clear │
//! │                           never touch the network                      │
//! │                                                                         │
//! │  Remote-aware commands    lookup, entry, exit, adjust, create, delete, │
//! │                           import, refresh                              │
//! │                           connect() first, unless --offline            │
//! │                                                                         │
//! │  sync                     re-probes on its own (--offline refuses it)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use error::{CliError, CliResult};
use siam_db::{Database, DbConfig};
use siam_sync::{
    AppConfig, ConnectionState, FirestoreClient, InventoryRepository, RemoteCatalog,
    RepositorySettings,
};

// =============================================================================
// Arguments
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "siam")]
#[command(about = "Offline-first inventory for small shops")]
#[command(long_about = "siam - offline-first product inventory

Reads are served from the local cache and fall back to the remote catalog.
Writes always land locally first; when the remote catalog cannot take them
they wait in the pending queue until 'siam sync'.

QUICK START:
  siam lookup 7591002200046          Show one product
  siam entry 7591002200046 12        Receive 12 units
  siam exit 7591002200046 2          Remove 2 units
  siam import catalog.json           Load a catalog file
  siam sync                          Push pending writes, refresh the cache")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Path to siam.toml (default: platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite cache (overrides [cache].database_path)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Do not contact the remote catalog
    #[arg(long, global = true)]
    pub offline: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show connection state and cache counts
    Status,

    /// Look up one product by code (cache first)
    Lookup {
        code: String,
    },

    /// List cached products
    List {
        /// Only products of this category
        #[arg(long, conflicts_with = "search")]
        category: Option<String>,

        /// Substring of the name or code
        #[arg(long)]
        search: Option<String>,
    },

    /// Register incoming stock
    Entry(MovementArgs),

    /// Register outgoing stock
    Exit(MovementArgs),

    /// Set the quantity after a physical count
    Adjust {
        code: String,
        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },

    /// Register a new product
    Create(CreateArgs),

    /// Delete a product
    Delete {
        code: String,
    },

    /// Import products from a JSON array file
    Import {
        file: PathBuf,

        /// Validate every record without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Replay pending writes, then download the catalog
    Sync,

    /// Download the catalog without replaying
    Refresh,

    /// Show the pending write queue
    Pending,

    /// Low-stock and expiring products
    Alerts,

    /// Inventory summary by category
    Report,

    /// Delete every cached product and pending write
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct MovementArgs {
    pub code: String,

    #[arg(allow_hyphen_values = true)]
    pub quantity: i64,

    /// Who performed the movement
    #[arg(short, long, default_value = "cli")]
    pub user: String,

    #[arg(short, long, default_value = "")]
    pub notes: String,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    pub code: String,
    pub name: String,

    #[arg(long, default_value = "")]
    pub category: String,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub quantity: i64,

    #[arg(long, default_value = siam_core::DEFAULT_UNIT)]
    pub unit: String,

    #[arg(long, default_value = "")]
    pub location: String,

    #[arg(long)]
    pub price: Option<f64>,

    #[arg(long)]
    pub image_url: Option<String>,

    /// Extra field as key=value (value parsed as JSON when possible)
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
}

// =============================================================================
// Output
// =============================================================================

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

impl Output {
    /// Prints `value` as pretty JSON, or the text rendering.
    pub fn emit<T, F>(self, value: &T, text: F) -> CliResult<()>
    where
        T: serde::Serialize,
        F: FnOnce() -> String,
    {
        match self {
            Output::Json => println!("{}", serde_json::to_string_pretty(value)?),
            Output::Text => println!("{}", text()),
        }
        Ok(())
    }

    /// Prints a command failure on stderr.
    pub fn report_error(self, err: &CliError) {
        match self {
            Output::Json => match serde_json::to_string(err) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", err),
            },
            Output::Text => eprintln!("{}", err),
        }
    }
}

// =============================================================================
// Application Context
// =============================================================================

/// Everything a command needs, built once per invocation.
pub struct AppContext {
    pub repo: InventoryRepository,
    pub db: Database,
    pub output: Output,
    offline: bool,
}

impl AppContext {
    /// Loads configuration and opens the cache.
    pub async fn open(cli: &Cli) -> CliResult<Self> {
        let mut config = AppConfig::load(cli.config.clone())?;
        if let Some(path) = &cli.db {
            config.cache.database_path = Some(path.clone());
        }

        let db_path = config.database_path();
        info!(path = %db_path.display(), "Opening local cache");
        let db = Database::new(DbConfig::new(db_path)).await?;

        let remote = Arc::new(FirestoreClient::new(config.remote.clone())?);
        let output = if cli.json { Output::Json } else { Output::Text };

        Ok(AppContext::from_parts(
            db,
            remote,
            RepositorySettings::from(&config),
            output,
            cli.offline,
        ))
    }

    pub fn from_parts(
        db: Database,
        remote: Arc<dyn RemoteCatalog>,
        settings: RepositorySettings,
        output: Output,
        offline: bool,
    ) -> Self {
        AppContext {
            repo: InventoryRepository::new(db.cache(), remote, settings),
            db,
            output,
            offline,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Connects the repository unless `--offline` was given.
    pub async fn connect(&self) -> ConnectionState {
        if self.offline {
            debug!("Offline mode, remote catalog not contacted");
            return self.repo.state();
        }
        self.repo.connect().await
    }
}

// =============================================================================
// Entry Points
// =============================================================================

/// Parses arguments, runs the command and maps the result to an exit status.
pub async fn run() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let output = if cli.json { Output::Json } else { Output::Text };

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.report_error(&err);
            ExitCode::from(err.code.exit_code())
        }
    }
}

/// Runs one parsed command line.
pub async fn execute(cli: Cli) -> CliResult<()> {
    let ctx = AppContext::open(&cli).await?;
    let result = commands::dispatch(&ctx, cli.command).await;
    ctx.db.close().await;
    result
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=siam_sync=trace` - Trace one crate
/// - Default: `info,siam=debug,sqlx=warn`
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,siam=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// =============================================================================
// Unit Tests
// =============================================================================
