//! Long-running background task that sweeps the waqf collection for matured
//! and soon-to-mature endowments.
//!
//! The sweep only identifies candidates and logs them; status transitions and
//! donor notifications are left to the operators acting on those logs.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use waqf_ledger::ScanReport;

use crate::api::Ledger;
use crate::config::Config;
use crate::errors::Result;

pub struct ScannerState {
    pub ledger: Arc<Ledger>,
    pub config: Config,
}

/// Spawn the scanner loop as a background [`tokio`] task.
pub async fn run(state: Arc<ScannerState>) {
    info!(
        "Maturity scanner starting: collection {}, every {}s",
        state.ledger.collection(),
        state.config.scan_interval_secs
    );

    loop {
        if let Err(e) = scan_once(&state.ledger, state.config.maturing_soon_days).await {
            error!("Maturity scan error: {e}");
        }

        tokio::time::sleep(Duration::from_secs(state.config.scan_interval_secs)).await;
    }
}

/// Perform a single sweep and log what it found.
async fn scan_once(ledger: &Ledger, soon_days: i64) -> Result<ScanReport> {
    let report = ledger.scan(soon_days).await?;

    for waqf_id in &report.matured {
        info!(waqf_id = %waqf_id, "Waqf has matured and is still active");
    }
    for waqf_id in &report.maturing_soon {
        info!(waqf_id = %waqf_id, soon_days, "Waqf matures soon");
    }
    info!(
        "Scan complete: {} matured, {} maturing within {soon_days} days",
        report.matured.len(),
        report.maturing_soon.len()
    );

    Ok(report)
}
