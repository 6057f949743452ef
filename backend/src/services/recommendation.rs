//! Crop recommendations: live rankings from weather, and stored suggestions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{Crop, WeatherObservation};
use shared::recommend::recommend;
use shared::scoring::{ComponentScores, CropScore};
use shared::validation;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{check, is_foreign_key_violation};

/// Recommendation service
#[derive(Clone)]
pub struct RecommendationService {
    db: PgPool,
}

/// A ranked crop for a farm's conditions
#[derive(Debug, Clone, Serialize)]
pub struct LiveRecommendation {
    pub crop_id: Uuid,
    pub crop_name: String,
    pub suitability: f64,
    /// 0-100
    pub confidence: f64,
    /// Per hectare
    pub estimated_yield: f64,
    /// Across the whole farm
    pub estimated_total_yield: f64,
    pub components: ComponentScores,
}

impl LiveRecommendation {
    fn from_score(score: CropScore, area_hectares: f64) -> Self {
        Self {
            estimated_total_yield: score.total_yield(area_hectares),
            crop_id: score.crop_id,
            crop_name: score.crop_name,
            suitability: score.suitability,
            confidence: score.confidence,
            estimated_yield: score.estimated_yield,
            components: score.components,
        }
    }
}

/// Top crops for an observation, with yields scaled to the farm's area.
/// Empty when the observation is missing or incomplete.
pub fn live_recommendations(
    crops: &[Crop],
    observation: Option<&WeatherObservation>,
    area_hectares: f64,
) -> Vec<LiveRecommendation> {
    recommend(crops, observation)
        .into_iter()
        .map(|score| LiveRecommendation::from_score(score, area_hectares))
        .collect()
}

/// Stored recommendation with its crop name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredRecommendation {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub crop_id: Uuid,
    pub crop_name: String,
    pub recommended_on: NaiveDate,
    pub recommendation_text: String,
    pub created_at: DateTime<Utc>,
}

/// Input for saving a recommendation
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecommendationInput {
    pub crop_id: Uuid,
    /// Defaults to today
    pub date: Option<NaiveDate>,
    #[validate(custom = "check_recommendation_text")]
    pub recommendation_text: String,
}

fn check_recommendation_text(text: &str) -> Result<(), validator::ValidationError> {
    check(validation::validate_text(text, 2000))
}

impl RecommendationService {
    /// Create a new RecommendationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Stored recommendations for a farm, newest first
    pub async fn list(&self, farm_id: Uuid) -> AppResult<Vec<StoredRecommendation>> {
        let recommendations = sqlx::query_as::<_, StoredRecommendation>(
            r#"
            SELECT r.id, r.farm_id, r.crop_id, c.name AS crop_name,
                   r.recommended_on, r.recommendation_text, r.created_at
            FROM recommendations r
            JOIN crops c ON c.id = r.crop_id
            WHERE r.farm_id = $1
            ORDER BY r.recommended_on DESC, r.created_at DESC
            "#,
        )
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        Ok(recommendations)
    }

    /// Save a recommendation for a farm
    pub async fn create(
        &self,
        farm_id: Uuid,
        input: CreateRecommendationInput,
    ) -> AppResult<StoredRecommendation> {
        input.validate()?;
        let date = input.date.unwrap_or_else(|| Utc::now().date_naive());

        let recommendation = sqlx::query_as::<_, StoredRecommendation>(
            r#"
            WITH inserted AS (
                INSERT INTO recommendations (farm_id, crop_id, recommended_on, recommendation_text)
                VALUES ($1, $2, $3, $4)
                RETURNING id, farm_id, crop_id, recommended_on, recommendation_text, created_at
            )
            SELECT i.id, i.farm_id, i.crop_id, c.name AS crop_name,
                   i.recommended_on, i.recommendation_text, i.created_at
            FROM inserted i
            JOIN crops c ON c.id = i.crop_id
            "#,
        )
        .bind(farm_id)
        .bind(input.crop_id)
        .bind(date)
        .bind(input.recommendation_text.trim())
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::validation("crop_id", "Unknown crop")
            } else {
                e.into()
            }
        })?;

        Ok(recommendation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{CropRanges, IdealRange};

    fn crop(name: &str, temp: (f64, f64)) -> Crop {
        Crop {
            id: Uuid::new_v4(),
            name: name.to_string(),
            crop_type: "cereal".to_string(),
            growing_season: "kharif".to_string(),
            ranges: CropRanges {
                temperature: IdealRange::new(temp.0, temp.1).unwrap(),
                humidity: IdealRange::new(40.0, 80.0).unwrap(),
                rainfall: IdealRange::new(0.0, 20.0).unwrap(),
            },
            preferred_soil: None,
            ph_range: None,
            base_yield: 1000.0,
        }
    }

    fn observation(temperature: Option<f64>) -> WeatherObservation {
        WeatherObservation {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            temperature,
            humidity: Some(60.0),
            rainfall: 10.0,
            wind_speed: None,
            pressure: None,
            description: None,
            location_name: None,
        }
    }

    #[test]
    fn yields_scale_with_area() {
        let crops = vec![crop("Wheat", (10.0, 30.0))];
        let recs = live_recommendations(&crops, Some(&observation(Some(20.0))), 2.5);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].estimated_yield, 1000.0);
        assert_eq!(recs[0].estimated_total_yield, 2500.0);
        assert_eq!(recs[0].confidence, 100.0);
    }

    #[test]
    fn incomplete_weather_gives_nothing() {
        let crops = vec![crop("Wheat", (10.0, 30.0))];
        assert!(live_recommendations(&crops, Some(&observation(None)), 1.0).is_empty());
        assert!(live_recommendations(&crops, None, 1.0).is_empty());
    }

    #[test]
    fn best_match_first() {
        let crops = vec![crop("Cool", (0.0, 10.0)), crop("Warm", (15.0, 25.0))];
        let recs = live_recommendations(&crops, Some(&observation(Some(20.0))), 1.0);
        assert_eq!(recs[0].crop_name, "Warm");
    }

    #[test]
    fn blank_text_is_rejected() {
        let input = CreateRecommendationInput {
            crop_id: Uuid::new_v4(),
            date: None,
            recommendation_text: "   ".to_string(),
        };
        assert!(input.validate().is_err());
    }
}
