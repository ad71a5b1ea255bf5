//! # SIAM Command-Line Entry Point
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging to stderr)
//! 2. Parse arguments
//! 3. Load configuration (siam.toml, legacy firebase-config.json, SIAM_* env)
//! 4. Open the local cache & run migrations
//! 5. Build the InventoryRepository
//! 6. Run the command, close the pool, exit with the command's status

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // The actual setup is in lib.rs so tests can drive it
    siam_cli::run().await
}
