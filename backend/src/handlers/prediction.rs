//! Crop rotation and yield prediction handlers

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Datelike, Duration, Utc};
use shared::models::Conditions;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::{created, farmer};
use crate::middleware::CurrentUser;
use crate::services::farm::Farm;
use crate::services::prediction::{
    RotationInput, RotationPrediction, YieldInput, YieldPredictionRecord,
};
use crate::services::{CropService, FarmService, PredictionService, WeatherService};
use crate::AppState;

/// Days of stored weather averaged into a prediction
const PREDICTION_WINDOW_DAYS: i64 = 30;

/// Stored rotation picks for a farm
pub async fn list_rotation_predictions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Vec<RotationPrediction>>> {
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    let predictions = PredictionService::new(state.db).list_rotations(farm.id).await?;
    Ok(Json(predictions))
}

/// Suggest what to plant in a season, next year unless one is given
pub async fn predict_rotation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<RotationInput>,
) -> AppResult<Response> {
    input.validate()?;
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    let year = input.year.unwrap_or_else(|| Utc::now().year() + 1);
    let (conditions, mut warnings) = season_conditions(&state, &farm).await?;
    let soil_ph = soil_ph(&state, &farm, &mut warnings).await;
    let crops = CropService::new(state.db.clone()).list().await?;

    let mut outcome = PredictionService::new(state.db)
        .predict_rotation(&farm, year, &crops, conditions, soil_ph)
        .await?;
    warnings.append(&mut outcome.warnings);
    outcome.warnings = warnings;

    if outcome.created {
        Ok(created(
            format!("/api/v1/farms/{}/predictions/rotation", farm.id),
            outcome,
        ))
    } else {
        Ok(Json(outcome).into_response())
    }
}

/// Stored yield predictions for a farm
pub async fn list_yield_predictions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Vec<YieldPredictionRecord>>> {
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    let predictions = PredictionService::new(state.db).list_yields(farm.id).await?;
    Ok(Json(predictions))
}

/// Predict a crop's yield for a season, this year unless one is given
pub async fn predict_crop_yield(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<YieldInput>,
) -> AppResult<Response> {
    input.validate()?;
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    let crop = match CropService::new(state.db.clone()).get(input.crop_id).await {
        Ok(crop) => crop,
        Err(AppError::NotFound(_)) => {
            return Err(AppError::validation("crop_id", "Select a valid crop."))
        }
        Err(e) => return Err(e),
    };

    let year = input.year.unwrap_or_else(|| Utc::now().year());
    let (conditions, mut warnings) = season_conditions(&state, &farm).await?;

    let mut outcome = PredictionService::new(state.db)
        .predict_yield(&farm, &crop, year, conditions)
        .await?;
    warnings.append(&mut outcome.warnings);
    outcome.warnings = warnings;

    if outcome.created {
        Ok(created(
            format!("/api/v1/farms/{}/predictions/yield", farm.id),
            outcome,
        ))
    } else {
        Ok(Json(outcome).into_response())
    }
}

/// Mean of the farm's recent stored weather, falling back to today's
/// reading when nothing is stored yet
async fn season_conditions(
    state: &AppState,
    farm: &Farm,
) -> AppResult<(Option<Conditions>, Vec<String>)> {
    let weather = WeatherService::new(state.db.clone());
    let today = Utc::now().date_naive();

    let since = today - Duration::days(PREDICTION_WINDOW_DAYS);
    if let Some(conditions) = weather.average_conditions(farm.id, since).await? {
        return Ok((Some(conditions), Vec::new()));
    }

    let outcome = weather.fetch_or_store(farm, today, &state.weather).await?;
    let conditions = outcome
        .record
        .as_ref()
        .and_then(|record| Conditions::new(record.temperature, record.humidity, record.rainfall));
    Ok((conditions, outcome.warnings))
}

/// Topsoil pH at the farm; the soil point is skipped when it is unknown
async fn soil_ph(state: &AppState, farm: &Farm, warnings: &mut Vec<String>) -> Option<f64> {
    let Some(coords) = farm.location().and_then(|location| location.coordinates()) else {
        warnings.push(format!(
            "Farm \"{}\" has no coordinates; soil pH was not considered",
            farm.name
        ));
        return None;
    };

    let ph = state.soil.topsoil(&coords).await.and_then(|soil| soil.ph);
    if ph.is_none() {
        warnings.push("Soil pH is not available for this farm".to_string());
    }
    ph
}
