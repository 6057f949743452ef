//! Recommendation handlers

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use shared::models::ForecastDay;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::weather::forecast_for;
use crate::handlers::{created, farmer};
use crate::middleware::CurrentUser;
use crate::services::recommendation::{
    live_recommendations, CreateRecommendationInput, LiveRecommendation, StoredRecommendation,
};
use crate::services::{CropService, FarmService, RecommendationService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ForecastDayQuery {
    /// 0 is the first forecast day
    #[serde(default)]
    pub day: usize,
}

/// Recommendations for one forecast day
#[derive(Debug, Serialize)]
pub struct ForecastRecommendations {
    pub day: Option<ForecastDay>,
    pub recommendations: Vec<LiveRecommendation>,
    pub warnings: Vec<String>,
}

/// Stored recommendations for a farm
pub async fn list_recommendations(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Vec<StoredRecommendation>>> {
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    let recommendations = RecommendationService::new(state.db).list(farm.id).await?;
    Ok(Json(recommendations))
}

/// Save a recommendation for a farm
pub async fn create_recommendation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<CreateRecommendationInput>,
) -> AppResult<Response> {
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    let recommendation = RecommendationService::new(state.db)
        .create(farm.id, input)
        .await?;
    Ok(created(
        format!("/api/v1/farms/{}/recommendations", farm.id),
        recommendation,
    ))
}

/// Top crops for a selected forecast day
pub async fn forecast_recommendations(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<ForecastDayQuery>,
) -> AppResult<Json<ForecastRecommendations>> {
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    let forecast = forecast_for(&state, &farm).await;
    if !forecast.days.is_empty() && query.day >= forecast.days.len() {
        return Err(AppError::validation(
            "day",
            format!("Choose a day between 0 and {}", forecast.days.len() - 1),
        ));
    }

    let day = forecast.days.into_iter().nth(query.day);
    let observation = day
        .as_ref()
        .map(|d| d.to_observation(farm.location_name.clone()));

    let crops = CropService::new(state.db).list().await?;
    let recommendations =
        live_recommendations(&crops, observation.as_ref(), farm.area_hectares());

    Ok(Json(ForecastRecommendations {
        day,
        recommendations,
        warnings: forecast.warnings,
    }))
}
