use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use auction_sync::api::health::HealthState;
use auction_sync::api::routes::{router, ApiState};
use auction_sync::config::{Config, StoreBackendKind};
use auction_sync::error::Result;
use auction_sync::fetcher::EbayClient;
use auction_sync::service::{SyncService, SyncSettings};
use auction_sync::store::{MemoryBackend, SheetBackend, SheetsBackend, TabSync};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Tabular store ---
    let backend: Arc<dyn SheetBackend> = match cfg.store_backend {
        StoreBackendKind::Sheets => {
            info!(spreadsheet = %cfg.spreadsheet_id, "Using Google Sheets backend");
            Arc::new(SheetsBackend::new(
                &cfg.sheets_api_url,
                &cfg.spreadsheet_id,
                &cfg.sheets_access_token,
            )?)
        }
        StoreBackendKind::Memory => {
            warn!("Using in-memory store; nothing survives a restart");
            Arc::new(MemoryBackend::new())
        }
    };

    // --- Marketplace ---
    if cfg.ebay_access_token.is_empty() {
        warn!("EBAY_ACCESS_TOKEN not set; marketplace calls will be rejected");
    }
    let ebay = Arc::new(EbayClient::new(
        &cfg.ebay_browse_url,
        &cfg.ebay_trading_url,
        &cfg.ebay_access_token,
        &cfg.ebay_marketplace_id,
    )?);

    info!(
        sellers = cfg.runs.sellers.len(),
        runs = cfg.runs.runs.len(),
        filterwords = cfg.runs.filterwords.len(),
        timezone = %cfg.timezone,
        "Run configuration loaded"
    );

    let health = Arc::new(HealthState::new());
    let service = Arc::new(SyncService::new(
        TabSync::new(backend),
        ebay.clone(),
        ebay,
        SyncSettings {
            runs: cfg.runs.clone(),
            timezone: cfg.timezone,
            order_lookback_days: cfg.order_lookback_days,
            apply_auction_view: cfg.apply_auction_view,
        },
        health,
    ));

    // Periodic sync (background, every SYNC_INTERVAL_SECS)
    if cfg.sync_interval_secs > 0 {
        let periodic = Arc::clone(&service);
        let every = Duration::from_secs(cfg.sync_interval_secs);
        info!("Periodic sync every {}s", cfg.sync_interval_secs);
        tokio::spawn(async move { periodic.run_periodic(every).await });
    }

    // HTTP API server
    let app = router(ApiState { service });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
