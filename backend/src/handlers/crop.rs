//! Crop reference data handlers

use axum::{
    extract::{Path, State},
    Json,
};
use shared::models::Crop;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::CropService;
use crate::AppState;

/// List all crops
pub async fn list_crops(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Crop>>> {
    let service = CropService::new(state.db);
    Ok(Json(service.list().await?))
}

/// Get a crop by ID
pub async fn get_crop(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(crop_id): Path<Uuid>,
) -> AppResult<Json<Crop>> {
    let service = CropService::new(state.db);
    Ok(Json(service.get(crop_id).await?))
}
