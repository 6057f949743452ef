//! Weather service for storing and retrieving per-farm weather data
//!
//! One record per farm and date. Fetched records and manual entries share the
//! table; `source` tells them apart.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{Conditions, WeatherObservation, WeatherSource};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::WeatherClient;
use crate::services::check;
use crate::services::farm::Farm;

/// Days of history shown on the farm detail page
pub const HISTORY_DAYS: i64 = 10;

/// Weather service
#[derive(Clone)]
pub struct WeatherService {
    db: PgPool,
}

/// Stored weather record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WeatherRecord {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub observed_on: NaiveDate,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub wind_speed: Option<f64>,
    pub pressure: Option<f64>,
    pub description: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl WeatherRecord {
    pub fn to_observation(&self, location_name: Option<String>) -> WeatherObservation {
        WeatherObservation {
            date: self.observed_on,
            temperature: Some(self.temperature),
            humidity: Some(self.humidity),
            rainfall: self.rainfall,
            wind_speed: self.wind_speed,
            pressure: self.pressure,
            description: self.description.clone(),
            location_name,
        }
    }
}

/// Input for adding weather to a farm.
///
/// With only a date the reading is fetched from the weather provider;
/// otherwise temperature and humidity are required.
#[derive(Debug, Deserialize, Validate)]
pub struct AddWeatherInput {
    pub date: NaiveDate,
    #[validate(custom = "check_temperature")]
    pub temperature: Option<f64>,
    #[validate(custom = "check_humidity")]
    pub humidity: Option<f64>,
    #[validate(custom = "check_rainfall")]
    pub rainfall: Option<f64>,
    #[validate(custom = "check_wind_speed")]
    pub wind_speed: Option<f64>,
    pub pressure: Option<f64>,
    #[validate(length(max = 200))]
    pub description: Option<String>,
}

fn check_temperature(value: f64) -> Result<(), validator::ValidationError> {
    check(validation::validate_temperature(value))
}

fn check_humidity(value: f64) -> Result<(), validator::ValidationError> {
    check(validation::validate_humidity(value))
}

fn check_rainfall(value: f64) -> Result<(), validator::ValidationError> {
    check(validation::validate_rainfall(value))
}

fn check_wind_speed(value: f64) -> Result<(), validator::ValidationError> {
    check(validation::validate_wind_speed(value))
}

impl AddWeatherInput {
    fn is_fetch_request(&self) -> bool {
        self.temperature.is_none() && self.humidity.is_none()
    }

    /// The manual reading, once temperature and humidity are both present
    fn manual_observation(&self) -> AppResult<WeatherObservation> {
        let temperature = self.temperature.ok_or_else(|| {
            AppError::validation("temperature", "Temperature is required for manual entry")
        })?;
        let humidity = self.humidity.ok_or_else(|| {
            AppError::validation("humidity", "Humidity is required for manual entry")
        })?;

        Ok(WeatherObservation {
            date: self.date,
            temperature: Some(temperature),
            humidity: Some(humidity),
            rainfall: self.rainfall.unwrap_or(0.0),
            wind_speed: self.wind_speed,
            pressure: self.pressure,
            description: self.description.clone(),
            location_name: None,
        })
    }
}

/// A weather lookup that may have come back empty
#[derive(Debug, Serialize)]
pub struct WeatherOutcome {
    pub record: Option<WeatherRecord>,
    /// Whether this request wrote the record
    pub created: bool,
    pub warnings: Vec<String>,
}

impl WeatherOutcome {
    fn unavailable(warning: String) -> Self {
        Self {
            record: None,
            created: false,
            warnings: vec![warning],
        }
    }
}

const WEATHER_COLUMNS: &str = "id, farm_id, observed_on, temperature, humidity, rainfall, wind_speed, pressure, description, source, created_at";

impl WeatherService {
    /// Create a new WeatherService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The most recent `limit` records dated before `before`, newest first
    pub async fn history(
        &self,
        farm_id: Uuid,
        before: NaiveDate,
        limit: i64,
    ) -> AppResult<Vec<WeatherRecord>> {
        let records = sqlx::query_as::<_, WeatherRecord>(&format!(
            r#"
            SELECT {WEATHER_COLUMNS} FROM weather_data
            WHERE farm_id = $1 AND observed_on < $2
            ORDER BY observed_on DESC
            LIMIT $3
            "#
        ))
        .bind(farm_id)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }

    /// All records for a farm, newest first
    pub async fn list(
        &self,
        farm_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<WeatherRecord>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM weather_data WHERE farm_id = $1")
            .bind(farm_id)
            .fetch_one(&self.db)
            .await?;

        let records = sqlx::query_as::<_, WeatherRecord>(&format!(
            r#"
            SELECT {WEATHER_COLUMNS} FROM weather_data
            WHERE farm_id = $1
            ORDER BY observed_on DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(farm_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: records,
            pagination: PaginationMeta::new(pagination, u64::try_from(total).unwrap_or(0)),
        })
    }

    /// Mean conditions over the records dated on or after `since`; `None`
    /// when there are none
    pub async fn average_conditions(
        &self,
        farm_id: Uuid,
        since: NaiveDate,
    ) -> AppResult<Option<Conditions>> {
        let (temperature, humidity, rainfall) =
            sqlx::query_as::<_, (Option<f64>, Option<f64>, Option<f64>)>(
                r#"
                SELECT AVG(temperature), AVG(humidity), AVG(rainfall)
                FROM weather_data
                WHERE farm_id = $1 AND observed_on >= $2
                "#,
            )
            .bind(farm_id)
            .bind(since)
            .fetch_one(&self.db)
            .await?;

        Ok(match (temperature, humidity, rainfall) {
            (Some(t), Some(h), Some(r)) => Conditions::new(t, h, r),
            _ => None,
        })
    }

    /// The record for one date, if any
    pub async fn on_date(&self, farm_id: Uuid, date: NaiveDate) -> AppResult<Option<WeatherRecord>> {
        let record = sqlx::query_as::<_, WeatherRecord>(&format!(
            "SELECT {WEATHER_COLUMNS} FROM weather_data WHERE farm_id = $1 AND observed_on = $2"
        ))
        .bind(farm_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    /// The stored record for `date`, fetching and storing it first when missing.
    ///
    /// Provider failures come back as warnings with no record.
    pub async fn fetch_or_store(
        &self,
        farm: &Farm,
        date: NaiveDate,
        client: &WeatherClient,
    ) -> AppResult<WeatherOutcome> {
        if let Some(record) = self.on_date(farm.id, date).await? {
            return Ok(WeatherOutcome {
                record: Some(record),
                created: false,
                warnings: Vec::new(),
            });
        }

        let observation = match fetch(farm, date, client).await {
            Ok(observation) => observation,
            Err(warning) => return Ok(WeatherOutcome::unavailable(warning)),
        };

        let (record, created) = self
            .store(farm.id, date, &observation, WeatherSource::Api)
            .await?;
        Ok(WeatherOutcome {
            record: Some(record),
            created,
            warnings: Vec::new(),
        })
    }

    /// Add weather for a date, either entered by hand or fetched from the
    /// provider. A date that already has a record is a form error.
    pub async fn add(
        &self,
        farm: &Farm,
        input: AddWeatherInput,
        client: &WeatherClient,
    ) -> AppResult<WeatherOutcome> {
        input.validate()?;

        if self.on_date(farm.id, input.date).await?.is_some() {
            return Err(already_exists(input.date));
        }

        let (observation, source) = if input.is_fetch_request() {
            match fetch(farm, input.date, client).await {
                Ok(observation) => (observation, WeatherSource::Api),
                Err(warning) => return Ok(WeatherOutcome::unavailable(warning)),
            }
        } else {
            (input.manual_observation()?, WeatherSource::Manual)
        };

        let (record, created) = self.store(farm.id, input.date, &observation, source).await?;
        if !created {
            return Err(already_exists(input.date));
        }

        tracing::info!(farm_id = %farm.id, date = %input.date, source = source.as_str(), "Stored weather");

        Ok(WeatherOutcome {
            record: Some(record),
            created,
            warnings: Vec::new(),
        })
    }

    /// Insert a reading under `date`; when a concurrent request got there
    /// first, read back its row instead. Returns the row and whether it was
    /// inserted.
    async fn store(
        &self,
        farm_id: Uuid,
        date: NaiveDate,
        observation: &WeatherObservation,
        source: WeatherSource,
    ) -> AppResult<(WeatherRecord, bool)> {
        let (temperature, humidity) = match (observation.temperature, observation.humidity) {
            (Some(t), Some(h)) => (t, h),
            _ => {
                return Err(AppError::Internal(
                    "Refusing to store a weather reading without temperature and humidity".into(),
                ))
            }
        };

        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query_as::<_, WeatherRecord>(&format!(
            r#"
            INSERT INTO weather_data (
                farm_id, observed_on, temperature, humidity, rainfall,
                wind_speed, pressure, description, source
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT ON CONSTRAINT uq_weather_farm_date DO NOTHING
            RETURNING {WEATHER_COLUMNS}
            "#
        ))
        .bind(farm_id)
        .bind(date)
        .bind(temperature)
        .bind(humidity)
        .bind(observation.rainfall)
        .bind(observation.wind_speed)
        .bind(observation.pressure)
        .bind(&observation.description)
        .bind(source.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let result = match inserted {
            Some(record) => (record, true),
            None => {
                tracing::debug!(%farm_id, %date, "Weather already stored, reading it back");
                let existing = sqlx::query_as::<_, WeatherRecord>(&format!(
                    "SELECT {WEATHER_COLUMNS} FROM weather_data WHERE farm_id = $1 AND observed_on = $2"
                ))
                .bind(farm_id)
                .bind(date)
                .fetch_one(&mut *tx)
                .await?;
                (existing, false)
            }
        };

        tx.commit().await?;
        Ok(result)
    }
}

/// Ask the provider for a farm's weather on `date`; the error is a
/// user-facing warning
async fn fetch(
    farm: &Farm,
    date: NaiveDate,
    client: &WeatherClient,
) -> Result<WeatherObservation, String> {
    let location = farm
        .location()
        .ok_or_else(|| format!("Farm \"{}\" has no location to look up weather for", farm.name))?;

    client
        .observe(&location, Some(date))
        .await
        .filter(WeatherObservation::is_available)
        .ok_or_else(|| format!("Weather data is not available for {} on {}", farm.name, date))
}

fn already_exists(date: NaiveDate) -> AppError {
    AppError::validation("date", format!("Weather data for {} already exists.", date))
}
