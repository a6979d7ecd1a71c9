//! # chunkfund-server
//!
//! HTTP front end for the chunkfund ledger.
//!
//! This binary provides:
//! - **Invoice listing** where owners put an invoice up for sale in 100-unit
//!   chunks
//! - **Chunk purchases** that activate the invoice once fully funded
//! - **Owner payment settlement** splitting the debtor's payment between the
//!   platform fee and the buyers
//! - **Reports** over the append-only cash transfer log

mod api;
mod config;
mod context;
mod error;

use anyhow::Context as _;
use chunkfund_store::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,chunkfund_server=debug,chunkfund_store=debug")
        }))
        .init();

    info!("Starting chunkfund server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the ledger
    // -----------------------------------------------------------------------
    let db = Database::open_at(&config.database_path).with_context(|| {
        format!("opening ledger at {}", config.database_path.display())
    })?;

    let platform_owner = db.ensure_platform_owner()?;
    info!(user_id = %platform_owner, "Platform owner account ready");

    let http_addr = config.http_addr;
    let app_state = AppState::new(db, config);

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
