use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::models::devices::{DeviceResponse, DevicesListResponse};
use crate::error::Result;
use crate::repositories::devices::{DeviceCreate, DeviceUpdate};

use super::AppState;

/// GET /devices
pub async fn get_all_devices(State(state): State<AppState>) -> Result<Json<DevicesListResponse>> {
    let devices = state.devices_repository.get_all().await?;

    Ok(Json(DevicesListResponse { devices }))
}

/// GET /device/{name}
pub async fn get_device(
    State(state): State<AppState>,
    Path(device_name): Path<String>,
) -> Result<Json<DeviceResponse>> {
    let device = state.devices_repository.get_by_name(&device_name).await?;

    Ok(Json(DeviceResponse { device }))
}

/// POST /devices
/// 400 on validation failure, 409 on duplicate name
pub async fn create_device(
    State(state): State<AppState>,
    Json(create): Json<DeviceCreate>,
) -> Result<(StatusCode, Json<DeviceResponse>)> {
    let device = state.devices_repository.create(&create).await?;

    Ok((StatusCode::CREATED, Json(DeviceResponse { device })))
}

/// PUT /device/{name}
/// Partial update: unsent fields keep their current values
pub async fn update_device(
    State(state): State<AppState>,
    Path(device_name): Path<String>,
    Json(update): Json<DeviceUpdate>,
) -> Result<Json<DeviceResponse>> {
    let device = state
        .devices_repository
        .update(&device_name, &update)
        .await?;

    Ok(Json(DeviceResponse { device }))
}

/// DELETE /device/{name}
/// Ledger entries for the device are kept and stay queryable by name
pub async fn delete_device(
    State(state): State<AppState>,
    Path(device_name): Path<String>,
) -> Result<StatusCode> {
    state.devices_repository.delete(&device_name).await?;

    Ok(StatusCode::NO_CONTENT)
}
