//! Weather alert handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::farmer;
use crate::handlers::weather::forecast_for;
use crate::middleware::CurrentUser;
use crate::services::alert::{Alert, AlertCheckReport};
use crate::services::{AlertService, FarmService};
use crate::AppState;

/// Alerts raised for a farm
pub async fn list_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Vec<Alert>>> {
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    Ok(Json(AlertService::new(state.db).list(farm.id).await?))
}

/// Screen the farm's forecast for hazards, raising and sending new alerts
pub async fn check_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<AlertCheckReport>> {
    let user = farmer(&current_user)?;
    let farm = FarmService::new(state.db.clone())
        .get_owned(user, farm_id)
        .await?;

    let forecast = forecast_for(&state, &farm).await;
    let mut report = AlertService::new(state.db)
        .check(&farm, &forecast.days, &state.notifier)
        .await?;
    report.warnings.splice(0..0, forecast.warnings);

    Ok(Json(report))
}
