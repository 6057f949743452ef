//! Farm handlers: list, detail page, create, update, delete

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::types::{PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::SoilProfile;
use crate::handlers::{created, farmer};
use crate::middleware::CurrentUser;
use crate::services::farm::{Farm, FarmInput, SavedFarm, FARMS_PER_PAGE};
use crate::services::recommendation::{live_recommendations, LiveRecommendation};
use crate::services::weather::{WeatherRecord, HISTORY_DAYS};
use crate::services::{CropService, FarmService, WeatherService};
use crate::AppState;

/// Query parameters for the farm list
#[derive(Debug, Deserialize)]
pub struct FarmListQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
}

/// Everything shown on a farm's page
#[derive(Debug, Serialize)]
pub struct FarmDetail {
    pub farm: Farm,
    /// Today's weather, fetched and stored on first view
    pub weather: Option<WeatherRecord>,
    /// Earlier days, newest first; today's record is not repeated here
    pub history: Vec<WeatherRecord>,
    pub soil: Option<SoilProfile>,
    pub recommendations: Vec<LiveRecommendation>,
    pub warnings: Vec<String>,
}

/// List the current farmer's farms
pub async fn list_farms(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<FarmListQuery>,
) -> AppResult<Json<PaginatedResponse<Farm>>> {
    let user = farmer(&current_user)?;
    let pagination = Pagination::new(query.page, FARMS_PER_PAGE);

    let service = FarmService::new(state.db);
    let farms = service
        .list(user.user_id, query.q.as_deref(), &pagination)
        .await?;
    Ok(Json(farms))
}

/// Create a farm
pub async fn create_farm(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<FarmInput>,
) -> AppResult<Response> {
    let user = farmer(&current_user)?;

    let service = FarmService::new(state.db);
    let saved = service.create(user.user_id, input, &state.geocoding).await?;
    Ok(created(format!("/api/v1/farms/{}", saved.farm.id), saved))
}

/// Farm detail page
pub async fn get_farm(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<FarmDetail>> {
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    let weather_service = WeatherService::new(state.db.clone());
    let today = Utc::now().date_naive();
    let outcome = weather_service
        .fetch_or_store(&farm, today, &state.weather)
        .await?;
    let mut warnings = outcome.warnings;
    let history = weather_service
        .history(farm.id, today, HISTORY_DAYS)
        .await?;

    let soil = match farm.location().and_then(|location| location.coordinates()) {
        Some(coords) => {
            let soil = state.soil.topsoil(&coords).await;
            if soil.is_none() {
                warnings.push("Soil data is not available for this farm".to_string());
            }
            soil
        }
        None => None,
    };

    let crops = CropService::new(state.db.clone()).list().await?;
    let observation = outcome
        .record
        .as_ref()
        .map(|record| record.to_observation(farm.location_name.clone()));
    let recommendations =
        live_recommendations(&crops, observation.as_ref(), farm.area_hectares());

    Ok(Json(FarmDetail {
        farm,
        weather: outcome.record,
        history,
        soil,
        recommendations,
        warnings,
    }))
}

/// Replace a farm's details
pub async fn update_farm(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<FarmInput>,
) -> AppResult<Json<SavedFarm>> {
    let user = farmer(&current_user)?;

    let service = FarmService::new(state.db);
    let saved = service
        .update(user, farm_id, input, &state.geocoding)
        .await?;
    Ok(Json(saved))
}

/// Delete a farm
pub async fn delete_farm(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let user = farmer(&current_user)?;

    let service = FarmService::new(state.db);
    service.delete(user, farm_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
