use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::AppError;
use crate::service::SyncService;
use crate::types::RunResult;

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<SyncService>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/auctions/sync", post(sync_auctions))
        .route("/orders/sync", post(sync_orders))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub last_sync_at: Option<u64>,
    pub syncs_completed: u64,
    pub syncs_failed: u64,
    pub last_rows_written: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn sync_auctions(State(state): State<ApiState>) -> Result<Json<Vec<RunResult>>, AppError> {
    Ok(Json(state.service.sync_auctions().await?))
}

async fn sync_orders(State(state): State<ApiState>) -> Result<Json<RunResult>, AppError> {
    Ok(Json(state.service.sync_orders().await?))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let health = state.service.health();
    let last = health.last_sync_at_secs();
    Json(HealthResponse {
        status: "ok",
        last_sync_at: (last > 0).then_some(last),
        syncs_completed: health.syncs_completed(),
        syncs_failed: health.syncs_failed(),
        last_rows_written: health.last_rows_written(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::api::health::HealthState;
    use crate::config::RunsFile;
    use crate::error::Result;
    use crate::fetcher::{ListingSource, OrderSource};
    use crate::service::SyncSettings;
    use crate::store::{MemoryBackend, TabSync};
    use crate::types::{LineItem, ListingRecord};

    struct Nothing;

    #[async_trait]
    impl ListingSource for Nothing {
        async fn search(&self, _query: &str) -> Result<Vec<ListingRecord>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl OrderSource for Nothing {
        async fn line_items(&self, _days: u32) -> Result<Vec<LineItem>> {
            Err(AppError::Marketplace("down".to_string()))
        }
    }

    fn app() -> Router {
        let service = SyncService::new(
            TabSync::new(Arc::new(MemoryBackend::new())),
            Arc::new(Nothing),
            Arc::new(Nothing),
            SyncSettings {
                runs: RunsFile::default(),
                timezone: chrono_tz::America::Chicago,
                order_lookback_days: 30,
                apply_auction_view: true,
            },
            Arc::new(HealthState::new()),
        );
        router(ApiState {
            service: Arc::new(service),
        })
    }

    #[tokio::test]
    async fn auction_sync_returns_run_results() {
        let resp = app()
            .oneshot(Request::post("/auctions/sync").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn marketplace_failure_maps_to_bad_gateway() {
        let resp = app()
            .oneshot(Request::post("/orders/sync").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn health_is_ok_before_any_sync() {
        let resp = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
