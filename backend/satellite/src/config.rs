//! Application configuration loaded from environment variables.

use crate::errors::{Result, SatelliteError};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) the maturity scanner sweeps the collection
    pub scan_interval_secs: u64,
    /// Look-ahead window for "maturing soon", in days
    pub maturing_soon_days: i64,
    /// Document collection holding the waqf profiles
    pub collection: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            database_url: var("DATABASE_URL", "sqlite:./waqf_satellite.db"),
            api_port: var("API_PORT", "3002")
                .parse()
                .map_err(|_| SatelliteError::Config("Invalid API_PORT".to_string()))?,
            scan_interval_secs: var("SCAN_INTERVAL_SECS", "300")
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| SatelliteError::Config("Invalid SCAN_INTERVAL_SECS".to_string()))?,
            maturing_soon_days: var("MATURING_SOON_DAYS", "30")
                .parse()
                .ok()
                .filter(|days| *days >= 0)
                .ok_or_else(|| SatelliteError::Config("Invalid MATURING_SOON_DAYS".to_string()))?,
            collection: non_empty(var("WAQF_COLLECTION", waqf_ledger::DEFAULT_COLLECTION))
                .ok_or_else(|| SatelliteError::Config("WAQF_COLLECTION is empty".to_string()))?,
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
