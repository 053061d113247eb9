use std::path::Path;
use std::str::FromStr;

use chrono_tz::Tz;
use serde::Deserialize;
use tracing::warn;

use crate::error::{AppError, Result};

pub const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4";
pub const EBAY_BROWSE_URL: &str = "https://api.ebay.com/buy/browse/v1";
pub const EBAY_TRADING_URL: &str = "https://api.ebay.com/ws/api.dll";

/// Used when `TIMEZONE` is unset or cannot be resolved.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Chicago;

/// Lookback window for the orders sync (days).
pub const DEFAULT_ORDER_LOOKBACK_DAYS: u32 = 30;

/// Windows zone ids seen in older deployments, mapped to IANA names.
const WINDOWS_ZONE_ALIASES: &[(&str, &str)] = &[
    ("Eastern Standard Time", "America/New_York"),
    ("Central Standard Time", "America/Chicago"),
    ("Mountain Standard Time", "America/Denver"),
    ("US Mountain Standard Time", "America/Phoenix"),
    ("Pacific Standard Time", "America/Los_Angeles"),
    ("Alaskan Standard Time", "America/Anchorage"),
    ("Hawaiian Standard Time", "Pacific/Honolulu"),
    ("UTC", "UTC"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackendKind {
    Sheets,
    Memory,
}

impl FromStr for StoreBackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sheets" | "google" => Ok(Self::Sheets),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(AppError::Config(format!(
                "STORE_BACKEND must be 'sheets' or 'memory', got '{other}'"
            ))),
        }
    }
}

/// One configured destination sheet and its searches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    pub sheet: String,
    #[serde(default)]
    pub queries: Vec<String>,
}

/// Contents of `RUNS_FILE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RunsFile {
    #[serde(default)]
    pub sellers: Vec<String>,
    #[serde(default)]
    pub runs: Vec<RunConfig>,
    /// Title words that exclude a listing (case-insensitive).
    #[serde(default)]
    pub filterwords: Vec<String>,
}

impl RunsFile {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// A missing file yields an empty run set.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Runs file not found, no auction runs configured");
            return Ok(Self::default());
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// IANA name, then Windows zone id, then [`DEFAULT_TIMEZONE`].
pub fn resolve_timezone(name: Option<&str>) -> Tz {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return DEFAULT_TIMEZONE;
    };
    if let Ok(tz) = name.parse::<Tz>() {
        return tz;
    }
    let alias = WINDOWS_ZONE_ALIASES
        .iter()
        .find(|(windows, _)| windows.eq_ignore_ascii_case(name))
        .and_then(|(_, iana)| iana.parse::<Tz>().ok());
    match alias {
        Some(tz) => tz,
        None => {
            warn!(
                timezone = name,
                fallback = %DEFAULT_TIMEZONE,
                "Unknown timezone, using fallback"
            );
            DEFAULT_TIMEZONE
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    /// Local zone for end dates and "today" (TIMEZONE)
    pub timezone: Tz,
    pub store_backend: StoreBackendKind,
    pub spreadsheet_id: String,
    pub sheets_api_url: String,
    pub sheets_access_token: String,
    pub ebay_browse_url: String,
    pub ebay_trading_url: String,
    pub ebay_access_token: String,
    pub ebay_marketplace_id: String,
    pub order_lookback_days: u32,
    /// Seconds between background syncs; 0 disables the loop (SYNC_INTERVAL_SECS)
    pub sync_interval_secs: u64,
    /// Install the "unbid, ending today" view on auction tabs (APPLY_AUCTION_VIEW)
    pub apply_auction_view: bool,
    pub runs: RunsFile,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let store_backend: StoreBackendKind = env_or("STORE_BACKEND", "sheets").parse()?;
        let spreadsheet_id = env_or("SPREADSHEET_ID", "");
        if store_backend == StoreBackendKind::Sheets && spreadsheet_id.is_empty() {
            return Err(AppError::Config(
                "SPREADSHEET_ID is required when STORE_BACKEND=sheets".to_string(),
            ));
        }

        let runs_path = env_or("RUNS_FILE", "runs.json");

        Ok(Self {
            log_level: env_or("LOG_LEVEL", "info"),
            api_port: env_or("API_PORT", "3000")
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            timezone: resolve_timezone(std::env::var("TIMEZONE").ok().as_deref()),
            store_backend,
            spreadsheet_id,
            sheets_api_url: env_or("SHEETS_API_URL", SHEETS_API_URL),
            sheets_access_token: env_or("SHEETS_ACCESS_TOKEN", ""),
            ebay_browse_url: env_or("EBAY_BROWSE_URL", EBAY_BROWSE_URL),
            ebay_trading_url: env_or("EBAY_TRADING_URL", EBAY_TRADING_URL),
            ebay_access_token: env_or("EBAY_ACCESS_TOKEN", ""),
            ebay_marketplace_id: env_or("EBAY_MARKETPLACE_ID", "EBAY_US"),
            order_lookback_days: env_or("ORDER_LOOKBACK_DAYS", "30")
                .parse::<u32>()
                .unwrap_or(DEFAULT_ORDER_LOOKBACK_DAYS),
            sync_interval_secs: env_or("SYNC_INTERVAL_SECS", "0")
                .parse::<u64>()
                .unwrap_or(0),
            apply_auction_view: env_or("APPLY_AUCTION_VIEW", "true")
                .parse::<bool>()
                .unwrap_or(true),
            runs: RunsFile::load(Path::new(&runs_path))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timezone_fallback_order() {
        assert_eq!(resolve_timezone(Some("America/New_York")), chrono_tz::America::New_York);
        assert_eq!(resolve_timezone(Some("Central Standard Time")), chrono_tz::America::Chicago);
        assert_eq!(
            resolve_timezone(Some("pacific standard time")),
            chrono_tz::America::Los_Angeles
        );
        assert_eq!(resolve_timezone(Some("Mars/Olympus")), DEFAULT_TIMEZONE);
        assert_eq!(resolve_timezone(Some("  ")), DEFAULT_TIMEZONE);
        assert_eq!(resolve_timezone(None), DEFAULT_TIMEZONE);
    }

    #[test]
    fn runs_file_parses_with_defaults() {
        let runs = RunsFile::from_json(
            r#"{
                "sellers": ["s1"],
                "runs": [{"sheet": "PC", "queries": ["topps&filter=price:[..5]"]}, {"sheet": "Empty"}]
            }"#,
        )
        .unwrap();
        assert_eq!(runs.sellers, vec!["s1"]);
        assert_eq!(runs.runs.len(), 2);
        assert!(runs.runs[1].queries.is_empty());
        assert!(runs.filterwords.is_empty());
    }

    #[test]
    fn missing_runs_file_is_empty() {
        let runs = RunsFile::load(Path::new("/definitely/not/here/runs.json")).unwrap();
        assert_eq!(runs, RunsFile::default());
    }

    #[test]
    fn backend_kind_parses() {
        assert_eq!("Sheets".parse::<StoreBackendKind>().unwrap(), StoreBackendKind::Sheets);
        assert_eq!("memory".parse::<StoreBackendKind>().unwrap(), StoreBackendKind::Memory);
        assert!("postgres".parse::<StoreBackendKind>().is_err());
    }
}
