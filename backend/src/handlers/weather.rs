//! HTTP handlers for farm weather and forecasts

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::models::ForecastDay;
use shared::types::{PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::{created, farmer};
use crate::middleware::CurrentUser;
use crate::services::farm::Farm;
use crate::services::weather::{AddWeatherInput, WeatherRecord};
use crate::services::{FarmService, WeatherService};
use crate::AppState;

/// Weather records shown per page
const WEATHER_PER_PAGE: u32 = 30;

#[derive(Debug, Deserialize)]
pub struct WeatherListQuery {
    pub page: Option<u32>,
}

/// Forecast for a farm
#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub days: Vec<ForecastDay>,
    pub warnings: Vec<String>,
}

/// List a farm's stored weather, newest first
pub async fn list_weather(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<WeatherListQuery>,
) -> AppResult<Json<PaginatedResponse<WeatherRecord>>> {
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    let pagination = Pagination::new(query.page, WEATHER_PER_PAGE);
    let records = WeatherService::new(state.db)
        .list(farm.id, &pagination)
        .await?;
    Ok(Json(records))
}

/// Add weather for a date: manual readings, or `{date}` alone to fetch it
pub async fn add_weather(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<AddWeatherInput>,
) -> AppResult<Response> {
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    let outcome = WeatherService::new(state.db)
        .add(&farm, input, &state.weather)
        .await?;

    if outcome.created {
        Ok(created(format!("/api/v1/farms/{}/weather", farm.id), outcome))
    } else {
        Ok(Json(outcome).into_response())
    }
}

/// Daily forecast for a farm
pub async fn get_forecast(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<ForecastResponse>> {
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    Ok(Json(forecast_for(&state, &farm).await))
}

/// Fetch a farm's forecast, turning provider failures into warnings
pub(crate) async fn forecast_for(state: &AppState, farm: &Farm) -> ForecastResponse {
    let Some(location) = farm.location() else {
        return ForecastResponse {
            days: Vec::new(),
            warnings: vec![format!("Farm \"{}\" has no location to forecast", farm.name)],
        };
    };

    match state.weather.forecast(&location).await {
        Some(days) => ForecastResponse {
            days,
            warnings: Vec::new(),
        },
        None => ForecastResponse {
            days: Vec::new(),
            warnings: vec![format!("Forecast is not available for {}", farm.name)],
        },
    }
}
