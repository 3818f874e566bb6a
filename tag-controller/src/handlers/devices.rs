use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

use crate::models::PendingDevice;
use crate::reconciler::compute_pending;
use crate::startup::AppState;
use service_core::error::AppError;
use service_core::retry::retry_call;

#[derive(Debug, Serialize)]
pub struct PendingDevicesResponse {
    pub pending_devices: Vec<PendingDevice>,
}

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApproveRequest {
    #[validate(length(min = 1, message = "at least one tag is required"))]
    pub tags: Vec<String>,
}

/// GET /pending-devices - devices that are authorized but still untagged.
#[tracing::instrument(skip(state))]
pub async fn pending_devices(
    State(state): State<AppState>,
) -> Result<Json<PendingDevicesResponse>, AppError> {
    tracing::info!("Getting pending devices");

    let devices = retry_call(&state.retry, &state.cancel, "list_devices", || {
        state.directory.list()
    })
    .await
    .map_err(|e| AppError::BadGateway(e.to_string()))?;

    Ok(Json(PendingDevicesResponse {
        pending_devices: compute_pending(&devices),
    }))
}

/// GET /tags - tags offered by the network policy.
pub async fn available_tags(State(state): State<AppState>) -> Result<Json<TagsResponse>, AppError> {
    let tags = retry_call(&state.retry, &state.cancel, "available_tags", || {
        state.directory.available_tags()
    })
    .await
    .map_err(|e| AppError::BadGateway(e.to_string()))?;

    Ok(Json(TagsResponse { tags }))
}

/// POST /approve/{device_id} - apply the requested tags to a device.
///
/// Every requested tag must be present in the catalog current at
/// application time; validation happens before any mutation.
#[tracing::instrument(skip(state, request))]
pub async fn approve_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(request): Json<ApproveRequest>,
) -> Result<StatusCode, AppError> {
    request.validate()?;

    let available = retry_call(&state.retry, &state.cancel, "available_tags", || {
        state.directory.available_tags()
    })
    .await
    .map_err(|e| AppError::BadGateway(e.to_string()))?;

    let available: HashSet<&str> = available.iter().map(String::as_str).collect();
    for tag in &request.tags {
        if !available.contains(tag.as_str()) {
            tracing::warn!(tag = %tag, "Invalid tag requested");
            return Err(AppError::BadRequest(anyhow::anyhow!("invalid tag: {}", tag)));
        }
    }

    tracing::info!(device_id = %device_id, tags = ?request.tags, "Approve requested");

    retry_call(&state.retry, &state.cancel, "set_tags", || {
        state.directory.set_tags(&device_id, &request.tags)
    })
    .await
    .map_err(|e| AppError::BadGateway(e.to_string()))?;

    tracing::info!(device_id = %device_id, tags = ?request.tags, "Approved device");
    Ok(StatusCode::OK)
}

/// POST /decline/{device_id} - log-only acknowledgment, no mutation.
pub async fn decline_device(Path(device_id): Path<String>) -> StatusCode {
    tracing::info!(device_id = %device_id, "Device declined");
    StatusCode::OK
}
