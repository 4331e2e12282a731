use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use stockwatch_notify::NotifyError;

use crate::middleware::RequestId;
use crate::scheduler::{SchedulerError, SchedulerStatus};

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct IntervalBody {
    pub minutes: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct TestMessageData {
    message_id: String,
}

fn scheduler_error(request_id: String, error: &SchedulerError) -> ApiError {
    match error {
        SchedulerError::Interval(e) => ApiError::new(request_id, "validation_error", e.to_string()),
        SchedulerError::Job(e) => {
            tracing::error!(error = %e, "scheduler operation failed");
            ApiError::new(request_id, "internal_error", "scheduler operation failed")
        }
    }
}

pub(super) async fn update_interval(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<IntervalBody>, JsonRejection>,
) -> Result<Json<ApiResponse<SchedulerStatus>>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            format!(
                "check interval must be a whole number of minutes: {}",
                rejection.body_text()
            ),
        )
    })?;
    let minutes = u32::try_from(body.minutes).map_err(|_| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            format!(
                "check interval must be between 1 and 60 minutes, got {}",
                body.minutes
            ),
        )
    })?;

    state
        .scheduler
        .update_interval(minutes)
        .await
        .map_err(|e| scheduler_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, state.scheduler.status().await)))
}

pub(super) async fn pause(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SchedulerStatus>>, ApiError> {
    state
        .scheduler
        .pause()
        .await
        .map_err(|e| scheduler_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse::new(req_id.0, state.scheduler.status().await)))
}

pub(super) async fn resume(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SchedulerStatus>>, ApiError> {
    state
        .scheduler
        .resume()
        .await
        .map_err(|e| scheduler_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse::new(req_id.0, state.scheduler.status().await)))
}

pub(super) async fn send_test(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<TestMessageData>>, ApiError> {
    match state.tracker.notifier().send_test().await {
        Ok(id) => Ok(Json(ApiResponse::new(
            req_id.0,
            TestMessageData { message_id: id.0 },
        ))),
        Err(NotifyError::NotConfigured) => Err(ApiError::new(
            req_id.0,
            "not_configured",
            "SMS notifications are not configured",
        )),
        Err(e) => {
            tracing::error!(error = %e, "failed to send test SMS");
            Err(ApiError::new(
                req_id.0,
                "upstream_error",
                format!("failed to send test SMS: {e}"),
            ))
        }
    }
}
