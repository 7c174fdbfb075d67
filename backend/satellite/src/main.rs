//! Waqf satellite: entry point.
//!
//! Hosts the tranche ledger over a SQLite document store. A background task
//! periodically sweeps the waqf collection for matured and soon-to-mature
//! endowments, while a small Axum REST API exposes balances, tranche returns
//! and rollovers to the frontend and admin tools.

mod api;
mod config;
mod db;
mod errors;
mod scanner;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use waqf_ledger::TrancheLedger;

use config::Config;
use db::SqliteStore;
use scanner::ScannerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    let ledger = Arc::new(
        TrancheLedger::new(SqliteStore::new(pool)).in_collection(config.collection.clone()),
    );

    // ─── Background maturity scanner ──────────────────────
    let scanner_state = Arc::new(ScannerState {
        ledger: Arc::clone(&ledger),
        config: config.clone(),
    });
    tokio::spawn(scanner::run(scanner_state));

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState {
        ledger,
        maturing_soon_days: config.maturing_soon_days,
    });

    let app = api::router(api_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
