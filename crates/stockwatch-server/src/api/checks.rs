use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use stockwatch_core::{AvailabilitySnapshot, StoreConfig};
use stockwatch_tracker::{
    CheckOutcome, CheckRecord, CheckSummary, GateStats, TrackerStatus, HISTORY_LIMIT,
};

use crate::middleware::RequestId;
use crate::scheduler::SchedulerStatus;

use super::{ApiError, ApiResponse, AppState};

const DEFAULT_HISTORY_LIMIT: i64 = 10;

#[derive(Debug, Serialize)]
pub(super) struct CatalogSummary {
    product_name: String,
    preferred_sku: String,
    variant_count: usize,
    stores: Vec<StoreConfig>,
}

#[derive(Debug, Serialize)]
pub(super) struct StatusData {
    scheduler: SchedulerStatus,
    tracker: TrackerStatus,
    notifications: GateStats,
    sms_configured: bool,
    catalog: CatalogSummary,
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct HistoryData {
    records: Vec<CheckRecord>,
    current: AvailabilitySnapshot,
}

pub(super) async fn status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<StatusData>> {
    let catalog = state.tracker.catalog();
    let notifier = state.tracker.notifier();

    let data = StatusData {
        scheduler: state.scheduler.status().await,
        tracker: state.tracker.status().await,
        notifications: notifier.stats().await,
        sms_configured: notifier.is_configured(),
        catalog: CatalogSummary {
            product_name: catalog.product_name.clone(),
            preferred_sku: catalog.preferred_sku.clone(),
            variant_count: catalog.variants.len(),
            stores: catalog.stores.clone(),
        },
    };

    Json(ApiResponse::new(req_id.0, data))
}

pub(super) async fn run_check(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CheckSummary>>, ApiError> {
    match state.scheduler.run_now().await {
        CheckOutcome::Completed(summary) => Ok(Json(ApiResponse::new(req_id.0, summary))),
        CheckOutcome::Busy => Err(ApiError::new(
            req_id.0,
            "conflict",
            "an availability check is already in progress",
        )),
        CheckOutcome::Failed(reason) => Err(ApiError::new(
            req_id.0,
            "upstream_error",
            format!("availability check failed: {reason}"),
        )),
    }
}

pub(super) async fn history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<HistoryData>>, ApiError> {
    let limit = validate_history_limit(query.limit).map_err(|message| {
        ApiError::new(req_id.0.clone(), "validation_error", message)
    })?;

    let data = HistoryData {
        records: state.tracker.history(limit).await,
        current: state.tracker.snapshot().await,
    };
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

pub(super) fn validate_history_limit(limit: Option<i64>) -> Result<usize, String> {
    let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    usize::try_from(limit)
        .ok()
        .filter(|n| (1..=HISTORY_LIMIT).contains(n))
        .ok_or_else(|| format!("limit must be between 1 and {HISTORY_LIMIT}"))
}
