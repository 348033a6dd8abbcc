use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::api::models::savings::{SavingsQuery, SavingsResponse};
use crate::error::Result;

use super::AppState;

/// GET /device/{name}/savings?from=YYYY-MM-DD&to=YYYY-MM-DD
///
/// Deliberately does not check the registry: savings of a deleted device
/// remain queryable by its historical name.
pub async fn get_savings(
    State(state): State<AppState>,
    Path(device_name): Path<String>,
    Query(query): Query<SavingsQuery>,
) -> Result<Json<SavingsResponse>> {
    let entries = state
        .savings_repository
        .find_by_device(&device_name, query.from, query.to)
        .await?;
    let total_saved = state.savings_repository.total_saved(&device_name).await?;

    Ok(Json(SavingsResponse {
        device_name,
        entries,
        total_saved,
    }))
}
