//! Crop reference data

use shared::models::{Crop, CropRanges, IdealRange, RangeError, SoilTexture};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Crop service
#[derive(Clone)]
pub struct CropService {
    db: PgPool,
}

/// Crop row as stored
#[derive(Debug, Clone, sqlx::FromRow)]
struct CropRow {
    id: Uuid,
    name: String,
    crop_type: String,
    growing_season: String,
    min_temperature: f64,
    max_temperature: f64,
    min_humidity: f64,
    max_humidity: f64,
    min_rainfall: f64,
    max_rainfall: f64,
    preferred_soil: Option<String>,
    min_ph: Option<f64>,
    max_ph: Option<f64>,
    base_yield: f64,
}

impl TryFrom<CropRow> for Crop {
    type Error = RangeError;

    fn try_from(row: CropRow) -> Result<Self, Self::Error> {
        let preferred_soil = row
            .preferred_soil
            .as_deref()
            .and_then(|s| s.parse::<SoilTexture>().ok());
        let ph_range = match (row.min_ph, row.max_ph) {
            (Some(min), Some(max)) => Some(ordered_range(min, max)?),
            _ => None,
        };

        Ok(Crop {
            id: row.id,
            name: row.name,
            crop_type: row.crop_type,
            growing_season: row.growing_season,
            ranges: CropRanges {
                temperature: ordered_range(row.min_temperature, row.max_temperature)?,
                humidity: ordered_range(row.min_humidity, row.max_humidity)?,
                rainfall: ordered_range(row.min_rainfall, row.max_rainfall)?,
            },
            preferred_soil,
            ph_range,
            base_yield: row.base_yield,
        })
    }
}

/// Build a range, swapping bounds entered the wrong way round
fn ordered_range(a: f64, b: f64) -> Result<IdealRange, RangeError> {
    if a <= b {
        IdealRange::new(a, b)
    } else {
        IdealRange::new(b, a)
    }
}

const CROP_COLUMNS: &str = "id, name, crop_type, growing_season, min_temperature, max_temperature, min_humidity, max_humidity, min_rainfall, max_rainfall, preferred_soil, min_ph, max_ph, base_yield";

impl CropService {
    /// Create a new CropService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All crops, by name. Rows with unusable ranges are skipped.
    pub async fn list(&self) -> AppResult<Vec<Crop>> {
        let rows = sqlx::query_as::<_, CropRow>(&format!(
            "SELECT {CROP_COLUMNS} FROM crops ORDER BY name ASC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let name = row.name.clone();
                Crop::try_from(row)
                    .map_err(|e| tracing::warn!(crop = %name, "Skipping crop: {}", e))
                    .ok()
            })
            .collect())
    }

    /// Get a crop by ID
    pub async fn get(&self, crop_id: Uuid) -> AppResult<Crop> {
        let row = sqlx::query_as::<_, CropRow>(&format!(
            "SELECT {CROP_COLUMNS} FROM crops WHERE id = $1"
        ))
        .bind(crop_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Crop not found".to_string()))?;

        Crop::try_from(row).map_err(|e| AppError::Internal(format!("Corrupt crop ranges: {}", e)))
    }
}
