//! Season-ahead crop rotation and yield predictions
//!
//! A farm gets at most one rotation pick per year and one yield prediction
//! per crop and year. Asking again for a season that is already stored
//! returns the stored prediction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{Conditions, Crop};
use shared::prediction::{
    predict_yield, suggest_rotation, RotationSuggestion, YieldPrediction, YIELD_HISTORY_LEN,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::services::farm::Farm;

/// Seasons a crop counts as recently planted
pub const ROTATION_LOOKBACK_YEARS: i32 = 3;

/// Prediction service
#[derive(Clone)]
pub struct PredictionService {
    db: PgPool,
}

/// Stored rotation pick with its crop name
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RotationPrediction {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub year: i32,
    pub crop_id: Uuid,
    pub crop_name: String,
    pub score: i16,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// Stored yield prediction with its crop name
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct YieldPredictionRecord {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub crop_id: Uuid,
    pub crop_name: String,
    pub year: i32,
    /// kg/ha
    pub predicted_yield: f64,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// Input for a rotation prediction
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RotationInput {
    /// Defaults to next year
    #[validate(range(min = 2000, max = 2100))]
    pub year: Option<i32>,
}

/// Input for a yield prediction
#[derive(Debug, Deserialize, Validate)]
pub struct YieldInput {
    pub crop_id: Uuid,
    /// Defaults to this year
    #[validate(range(min = 2000, max = 2100))]
    pub year: Option<i32>,
}

/// Result of asking for a season's rotation
#[derive(Debug, Serialize)]
pub struct RotationOutcome {
    pub prediction: Option<RotationPrediction>,
    /// Every crop that reached the threshold, best first
    pub suggestions: Vec<RotationSuggestion>,
    /// Whether this request stored the prediction
    pub created: bool,
    pub warnings: Vec<String>,
}

/// Result of asking for a season's yield
#[derive(Debug, Serialize)]
pub struct YieldOutcome {
    pub prediction: Option<YieldPredictionRecord>,
    /// How a new prediction was reached; absent when it was already stored
    pub details: Option<YieldPrediction>,
    /// Across the whole farm
    pub estimated_total_yield: Option<f64>,
    pub created: bool,
    pub warnings: Vec<String>,
}

const ROTATION_SELECT: &str = r#"
    SELECT r.id, r.farm_id, r.year, r.crop_id, c.name AS crop_name,
           r.score, r.confidence, r.created_at
    FROM crop_rotation_predictions r
    JOIN crops c ON c.id = r.crop_id
"#;

const YIELD_SELECT: &str = r#"
    SELECT y.id, y.farm_id, y.crop_id, c.name AS crop_name,
           y.year, y.predicted_yield, y.confidence, y.created_at
    FROM crop_yield_predictions y
    JOIN crops c ON c.id = y.crop_id
"#;

impl PredictionService {
    /// Create a new PredictionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Rotation picks for a farm, latest season first
    pub async fn list_rotations(&self, farm_id: Uuid) -> AppResult<Vec<RotationPrediction>> {
        let predictions = sqlx::query_as::<_, RotationPrediction>(&format!(
            "{ROTATION_SELECT} WHERE r.farm_id = $1 ORDER BY r.year DESC, r.created_at DESC"
        ))
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        Ok(predictions)
    }

    /// Yield predictions for a farm, latest season first
    pub async fn list_yields(&self, farm_id: Uuid) -> AppResult<Vec<YieldPredictionRecord>> {
        let predictions = sqlx::query_as::<_, YieldPredictionRecord>(&format!(
            "{YIELD_SELECT} WHERE y.farm_id = $1 ORDER BY y.year DESC, c.name ASC"
        ))
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        Ok(predictions)
    }

    /// Suggest crops for `year` and store the best one.
    ///
    /// Without usable conditions nothing new is suggested and any stored
    /// pick for the season is returned as is.
    pub async fn predict_rotation(
        &self,
        farm: &Farm,
        year: i32,
        crops: &[Crop],
        conditions: Option<Conditions>,
        soil_ph: Option<f64>,
    ) -> AppResult<RotationOutcome> {
        let mut warnings = Vec::new();

        let suggestions = match conditions {
            Some(conditions) => {
                let recent = self.recent_rotation_crops(farm.id, year).await?;
                suggest_rotation(crops, &conditions, soil_ph, &recent)
            }
            None => {
                warnings.push(format!(
                    "No weather is available for {} to base a rotation on",
                    farm.name
                ));
                Vec::new()
            }
        };

        let (prediction, created) = match suggestions.first() {
            Some(best) => {
                let (prediction, created) = self.save_rotation(farm.id, year, best).await?;
                (Some(prediction), created)
            }
            None => {
                if conditions.is_some() {
                    warnings.push(format!("No crop suits {} well enough for {}", farm.name, year));
                }
                (self.rotation_for(farm.id, year).await?, false)
            }
        };

        if let (true, Some(stored)) = (created, &prediction) {
            tracing::info!(farm_id = %farm.id, year, crop = %stored.crop_name, "Stored rotation prediction");
        }

        Ok(RotationOutcome {
            prediction,
            suggestions,
            created,
            warnings,
        })
    }

    /// Predict and store a crop's yield for `year`, scaled by the farm's
    /// earlier predictions for that crop
    pub async fn predict_yield(
        &self,
        farm: &Farm,
        crop: &Crop,
        year: i32,
        conditions: Option<Conditions>,
    ) -> AppResult<YieldOutcome> {
        let area = farm.area_hectares();

        if let Some(existing) = self.yield_for(farm.id, crop.id, year).await? {
            return Ok(YieldOutcome {
                estimated_total_yield: Some(existing.predicted_yield * area),
                prediction: Some(existing),
                details: None,
                created: false,
                warnings: Vec::new(),
            });
        }

        let Some(conditions) = conditions else {
            return Ok(YieldOutcome {
                prediction: None,
                details: None,
                estimated_total_yield: None,
                created: false,
                warnings: vec![format!(
                    "No weather is available for {} to base a yield prediction on",
                    farm.name
                )],
            });
        };

        let history = self.yield_history(farm.id, crop.id, year).await?;
        let details = predict_yield(crop, &conditions, &history);
        let (record, created) = self.save_yield(farm.id, crop.id, year, &details).await?;

        if created {
            tracing::info!(
                farm_id = %farm.id,
                crop = %crop.name,
                year,
                history = details.history_used,
                "Stored yield prediction"
            );
        }

        Ok(YieldOutcome {
            estimated_total_yield: Some(record.predicted_yield * area),
            prediction: Some(record),
            details: Some(details),
            created,
            warnings: Vec::new(),
        })
    }

    async fn rotation_for(&self, farm_id: Uuid, year: i32) -> AppResult<Option<RotationPrediction>> {
        let prediction = sqlx::query_as::<_, RotationPrediction>(&format!(
            "{ROTATION_SELECT} WHERE r.farm_id = $1 AND r.year = $2"
        ))
        .bind(farm_id)
        .bind(year)
        .fetch_optional(&self.db)
        .await?;

        Ok(prediction)
    }

    /// Crops picked for the seasons just before `year`
    async fn recent_rotation_crops(&self, farm_id: Uuid, year: i32) -> AppResult<Vec<Uuid>> {
        let crops = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT crop_id FROM crop_rotation_predictions
            WHERE farm_id = $1 AND year < $2 AND year >= $2 - $3
            "#,
        )
        .bind(farm_id)
        .bind(year)
        .bind(ROTATION_LOOKBACK_YEARS)
        .fetch_all(&self.db)
        .await?;

        Ok(crops)
    }

    /// Insert the season's pick; when one is already stored, read it back
    async fn save_rotation(
        &self,
        farm_id: Uuid,
        year: i32,
        pick: &RotationSuggestion,
    ) -> AppResult<(RotationPrediction, bool)> {
        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query_as::<_, RotationPrediction>(
            r#"
            WITH inserted AS (
                INSERT INTO crop_rotation_predictions (farm_id, year, crop_id, score, confidence)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT ON CONSTRAINT uq_rotation_farm_year DO NOTHING
                RETURNING id, farm_id, year, crop_id, score, confidence, created_at
            )
            SELECT i.id, i.farm_id, i.year, i.crop_id, c.name AS crop_name,
                   i.score, i.confidence, i.created_at
            FROM inserted i
            JOIN crops c ON c.id = i.crop_id
            "#,
        )
        .bind(farm_id)
        .bind(year)
        .bind(pick.crop_id)
        .bind(i16::from(pick.score))
        .bind(pick.confidence)
        .fetch_optional(&mut *tx)
        .await?;

        let result = match inserted {
            Some(prediction) => (prediction, true),
            None => {
                let existing = sqlx::query_as::<_, RotationPrediction>(&format!(
                    "{ROTATION_SELECT} WHERE r.farm_id = $1 AND r.year = $2"
                ))
                .bind(farm_id)
                .bind(year)
                .fetch_one(&mut *tx)
                .await?;
                (existing, false)
            }
        };

        tx.commit().await?;
        Ok(result)
    }

    async fn yield_for(
        &self,
        farm_id: Uuid,
        crop_id: Uuid,
        year: i32,
    ) -> AppResult<Option<YieldPredictionRecord>> {
        let prediction = sqlx::query_as::<_, YieldPredictionRecord>(&format!(
            "{YIELD_SELECT} WHERE y.farm_id = $1 AND y.crop_id = $2 AND y.year = $3"
        ))
        .bind(farm_id)
        .bind(crop_id)
        .bind(year)
        .fetch_optional(&self.db)
        .await?;

        Ok(prediction)
    }

    /// Predicted yields for seasons before `year`, most recent first
    async fn yield_history(&self, farm_id: Uuid, crop_id: Uuid, year: i32) -> AppResult<Vec<f64>> {
        let history = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT predicted_yield FROM crop_yield_predictions
            WHERE farm_id = $1 AND crop_id = $2 AND year < $3
            ORDER BY year DESC
            LIMIT $4
            "#,
        )
        .bind(farm_id)
        .bind(crop_id)
        .bind(year)
        .bind(YIELD_HISTORY_LEN as i64)
        .fetch_all(&self.db)
        .await?;

        Ok(history)
    }

    async fn save_yield(
        &self,
        farm_id: Uuid,
        crop_id: Uuid,
        year: i32,
        prediction: &YieldPrediction,
    ) -> AppResult<(YieldPredictionRecord, bool)> {
        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query_as::<_, YieldPredictionRecord>(
            r#"
            WITH inserted AS (
                INSERT INTO crop_yield_predictions (farm_id, crop_id, year, predicted_yield, confidence)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT ON CONSTRAINT uq_yield_farm_crop_year DO NOTHING
                RETURNING id, farm_id, crop_id, year, predicted_yield, confidence, created_at
            )
            SELECT i.id, i.farm_id, i.crop_id, c.name AS crop_name,
                   i.year, i.predicted_yield, i.confidence, i.created_at
            FROM inserted i
            JOIN crops c ON c.id = i.crop_id
            "#,
        )
        .bind(farm_id)
        .bind(crop_id)
        .bind(year)
        .bind(prediction.predicted_yield)
        .bind(prediction.confidence)
        .fetch_optional(&mut *tx)
        .await?;

        let result = match inserted {
            Some(record) => (record, true),
            None => {
                let existing = sqlx::query_as::<_, YieldPredictionRecord>(&format!(
                    "{YIELD_SELECT} WHERE y.farm_id = $1 AND y.crop_id = $2 AND y.year = $3"
                ))
                .bind(farm_id)
                .bind(crop_id)
                .bind(year)
                .fetch_one(&mut *tx)
                .await?;
                (existing, false)
            }
        };

        tx.commit().await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{crop_named, fixture_farm};
    use crate::services::CropService;

    fn mild() -> Option<Conditions> {
        // Inside Wheat's and Barley's ranges, too cool for Rice
        Conditions::new(18.0, 55.0, 4.0)
    }

    #[test]
    fn year_is_bounded() {
        let input = RotationInput { year: Some(1850) };
        assert!(input.validate().is_err());
        assert!(RotationInput::default().validate().is_ok());
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("farms")))]
    async fn rotation_is_stored_once_per_season(pool: PgPool) -> anyhow::Result<()> {
        let farm = fixture_farm(&pool).await?;
        let crops = CropService::new(pool.clone()).list().await?;
        let service = PredictionService::new(pool);

        let first = service
            .predict_rotation(&farm, 2025, &crops, mild(), Some(6.8))
            .await?;
        assert!(first.created);
        let stored = first.prediction.expect("a crop suits mild weather");
        assert_eq!(stored.crop_name, first.suggestions[0].crop_name);

        let again = service
            .predict_rotation(&farm, 2025, &crops, mild(), Some(6.8))
            .await?;
        assert!(!again.created);
        assert_eq!(again.prediction.map(|p| p.id), Some(stored.id));
        assert_eq!(service.list_rotations(farm.id).await?.len(), 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("farms")))]
    async fn last_seasons_pick_is_not_repeated_first(pool: PgPool) -> anyhow::Result<()> {
        let farm = fixture_farm(&pool).await?;
        let crops = CropService::new(pool.clone()).list().await?;
        let service = PredictionService::new(pool);

        let first = service
            .predict_rotation(&farm, 2025, &crops, mild(), Some(6.8))
            .await?;
        let first_pick = first.prediction.expect("stored").crop_id;

        let next = service
            .predict_rotation(&farm, 2026, &crops, mild(), Some(6.8))
            .await?;
        let repeat = next
            .suggestions
            .iter()
            .find(|s| s.crop_id == first_pick)
            .expect("still suitable");
        assert!(!repeat.points.not_recent);
        assert_ne!(next.prediction.map(|p| p.crop_id), Some(first_pick));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("farms")))]
    async fn no_weather_means_no_rotation(pool: PgPool) -> anyhow::Result<()> {
        let farm = fixture_farm(&pool).await?;
        let crops = CropService::new(pool.clone()).list().await?;
        let outcome = PredictionService::new(pool)
            .predict_rotation(&farm, 2025, &crops, None, None)
            .await?;
        assert!(outcome.prediction.is_none());
        assert!(!outcome.created);
        assert_eq!(outcome.warnings.len(), 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("farms")))]
    async fn yield_history_feeds_later_seasons(pool: PgPool) -> anyhow::Result<()> {
        let farm = fixture_farm(&pool).await?;
        let wheat = crop_named(&pool, "Wheat").await?;
        let service = PredictionService::new(pool);

        let first = service.predict_yield(&farm, &wheat, 2024, mild()).await?;
        assert!(first.created);
        let details = first.details.expect("new prediction");
        assert_eq!(details.history_used, 0);
        assert_eq!(details.predicted_yield, wheat.base_yield);
        assert_eq!(first.estimated_total_yield, Some(wheat.base_yield * 4.0));

        // Too warm this time: 0.9 of the base, with last season as history
        let warm = Conditions::new(28.0, 55.0, 4.0);
        let second = service.predict_yield(&farm, &wheat, 2025, warm).await?;
        let details = second.details.expect("new prediction");
        assert_eq!(details.history_used, 1);
        assert!((details.predicted_yield - wheat.base_yield * 0.9).abs() < 1e-6);
        assert!((details.confidence - 0.9).abs() < 1e-9);

        let repeat = service.predict_yield(&farm, &wheat, 2025, mild()).await?;
        assert!(!repeat.created);
        assert!(repeat.details.is_none());
        assert_eq!(
            repeat.prediction.map(|p| p.id),
            second.prediction.map(|p| p.id)
        );
        assert_eq!(service.list_yields(farm.id).await?.len(), 2);
        Ok(())
    }
}
