//! Profile handlers

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::profile::{ProfilePage, UpdateProfileInput};
use crate::services::ProfileService;
use crate::AppState;

/// Get the current user's profile
pub async fn get_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ProfilePage>> {
    let service = ProfileService::new(state.db);
    Ok(Json(service.get(current_user.0.user_id).await?))
}

/// Update the current user's profile
pub async fn update_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<Json<ProfilePage>> {
    let service = ProfileService::new(state.db);
    Ok(Json(service.update(current_user.0.user_id, input).await?))
}
