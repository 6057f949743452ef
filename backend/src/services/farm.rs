//! Farm management service

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::types::{Location, PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::GeocodingClient;
use crate::middleware::{AuthUser, Owned};
use crate::services::{check, is_unique_violation};

/// Farms shown per page on the farm list
pub const FARMS_PER_PAGE: u32 = 10;

/// Farm service
#[derive(Clone)]
pub struct FarmService {
    db: PgPool,
}

/// Farm record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Farm {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub location_name: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    /// Hectares
    pub total_area: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Farm {
    /// Where to look up weather and soil data for this farm
    pub fn location(&self) -> Option<Location> {
        Location::resolve(self.location_name.as_deref(), self.latitude, self.longitude)
    }

    pub fn area_hectares(&self) -> f64 {
        self.total_area.to_f64().unwrap_or(0.0)
    }
}

impl Owned for Farm {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Input for creating or replacing a farm
#[derive(Debug, Deserialize, Validate)]
pub struct FarmInput {
    #[validate(custom = "check_name")]
    pub name: String,
    pub location_name: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    #[validate(custom = "check_area")]
    pub total_area: Decimal,
}

fn check_name(name: &str) -> Result<(), validator::ValidationError> {
    check(validation::validate_farm_name(name))
}

fn check_area(area: &Decimal) -> Result<(), validator::ValidationError> {
    check(validation::validate_total_area(*area))
}

impl FarmInput {
    fn validate_all(&self) -> AppResult<()> {
        self.validate()?;
        validation::validate_farm_location(
            self.location_name.as_deref(),
            self.latitude,
            self.longitude,
        )
        .map_err(|message| AppError::validation("location", message))
    }

    fn place_name(&self) -> Option<String> {
        self.location_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// A saved farm plus anything that went wrong along the way without failing
/// the request
#[derive(Debug, Serialize)]
pub struct SavedFarm {
    pub farm: Farm,
    pub warnings: Vec<String>,
}

const FARM_COLUMNS: &str = "id, owner_id, name, location_name, latitude, longitude, total_area, created_at, updated_at";

impl FarmService {
    /// Create a new FarmService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List the owner's farms, optionally filtered by name or place
    pub async fn list(
        &self,
        owner_id: Uuid,
        query: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Farm>> {
        let pattern = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM farms
            WHERE owner_id = $1
              AND ($2::text IS NULL OR name ILIKE $2 OR location_name ILIKE $2)
            "#,
        )
        .bind(owner_id)
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let farms = sqlx::query_as::<_, Farm>(&format!(
            r#"
            SELECT {FARM_COLUMNS} FROM farms
            WHERE owner_id = $1
              AND ($2::text IS NULL OR name ILIKE $2 OR location_name ILIKE $2)
            ORDER BY LOWER(name) ASC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(owner_id)
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: farms,
            pagination: PaginationMeta::new(pagination, u64::try_from(total).unwrap_or(0)),
        })
    }

    /// Get a farm by ID, regardless of owner
    pub async fn get(&self, farm_id: Uuid) -> AppResult<Farm> {
        sqlx::query_as::<_, Farm>(&format!("SELECT {FARM_COLUMNS} FROM farms WHERE id = $1"))
            .bind(farm_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Farm not found".to_string()))
    }

    /// Get a farm the user owns
    pub async fn get_owned(&self, user: &AuthUser, farm_id: Uuid) -> AppResult<Farm> {
        let farm = self.get(farm_id).await?;
        user.ensure_owns(&farm)?;
        Ok(farm)
    }

    /// Create a farm, geocoding its place name when no coordinates were given
    pub async fn create(
        &self,
        owner_id: Uuid,
        input: FarmInput,
        geocoder: &GeocodingClient,
    ) -> AppResult<SavedFarm> {
        input.validate_all()?;
        let (latitude, longitude, warnings) = resolve_coordinates(&input, geocoder).await;

        let farm = sqlx::query_as::<_, Farm>(&format!(
            r#"
            INSERT INTO farms (owner_id, name, location_name, latitude, longitude, total_area)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {FARM_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(input.name.trim())
        .bind(input.place_name())
        .bind(latitude)
        .bind(longitude)
        .bind(input.total_area)
        .fetch_one(&self.db)
        .await
        .map_err(duplicate_name)?;

        tracing::info!(farm_id = %farm.id, %owner_id, "Created farm");

        Ok(SavedFarm { farm, warnings })
    }

    /// Replace a farm's details
    pub async fn update(
        &self,
        user: &AuthUser,
        farm_id: Uuid,
        input: FarmInput,
        geocoder: &GeocodingClient,
    ) -> AppResult<SavedFarm> {
        self.get_owned(user, farm_id).await?;
        input.validate_all()?;
        let (latitude, longitude, warnings) = resolve_coordinates(&input, geocoder).await;

        let farm = sqlx::query_as::<_, Farm>(&format!(
            r#"
            UPDATE farms
            SET name = $2, location_name = $3, latitude = $4, longitude = $5,
                total_area = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {FARM_COLUMNS}
            "#
        ))
        .bind(farm_id)
        .bind(input.name.trim())
        .bind(input.place_name())
        .bind(latitude)
        .bind(longitude)
        .bind(input.total_area)
        .fetch_one(&self.db)
        .await
        .map_err(duplicate_name)?;

        Ok(SavedFarm { farm, warnings })
    }

    /// Delete a farm; its weather, recommendations and alerts go with it
    pub async fn delete(&self, user: &AuthUser, farm_id: Uuid) -> AppResult<()> {
        self.get_owned(user, farm_id).await?;

        sqlx::query("DELETE FROM farms WHERE id = $1")
            .bind(farm_id)
            .execute(&self.db)
            .await?;

        tracing::info!(%farm_id, "Deleted farm");
        Ok(())
    }
}

/// Coordinates to store for a farm, looked up from the place name when the
/// input has none
async fn resolve_coordinates(
    input: &FarmInput,
    geocoder: &GeocodingClient,
) -> (Option<Decimal>, Option<Decimal>, Vec<String>) {
    if input.latitude.is_some() && input.longitude.is_some() {
        return (input.latitude, input.longitude, Vec::new());
    }

    let Some(place) = input.place_name() else {
        return (None, None, Vec::new());
    };

    match geocoder.locate(&place).await {
        Some(coords) => (Some(coords.latitude), Some(coords.longitude), Vec::new()),
        None => (
            None,
            None,
            vec![format!(
                "Could not find coordinates for \"{}\"; weather will be looked up by place name",
                place
            )],
        ),
    }
}

fn duplicate_name(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::validation("name", "You already have a farm with this name")
    } else {
        err.into()
    }
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn input() -> FarmInput {
        FarmInput {
            name: "Green Acres".to_string(),
            location_name: Some("Pune".to_string()),
            latitude: None,
            longitude: None,
            total_area: dec("12.5"),
        }
    }

    fn farm(location_name: Option<&str>, lat: Option<&str>, lon: Option<&str>) -> Farm {
        Farm {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Test".to_string(),
            location_name: location_name.map(str::to_string),
            latitude: lat.map(dec),
            longitude: lon.map(dec),
            total_area: dec("3.25"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(input().validate_all().is_ok());
    }

    #[test]
    fn non_positive_area_is_rejected() {
        let mut bad = input();
        bad.total_area = Decimal::ZERO;
        match bad.validate_all() {
            Err(AppError::ValidationErrors(fields)) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "total_area");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn location_is_required() {
        let mut bad = input();
        bad.location_name = Some("   ".to_string());
        assert!(matches!(
            bad.validate_all(),
            Err(AppError::Validation { ref field, .. }) if field == "location"
        ));

        let mut half = input();
        half.latitude = Some(dec("18.5"));
        assert!(half.validate_all().is_err());
    }

    #[test]
    fn coordinates_take_precedence_over_place() {
        let with_coords = farm(Some("Pune"), Some("18.52"), Some("73.85"));
        assert!(matches!(with_coords.location(), Some(Location::Coordinates(_))));

        let place_only = farm(Some("Pune"), None, None);
        assert_eq!(
            place_only.location(),
            Some(Location::Place {
                name: "Pune".to_string()
            })
        );
        assert_eq!(farm(None, None, None).location(), None);
    }

    #[test]
    fn area_converts_to_float() {
        assert!((farm(None, None, None).area_hectares() - 3.25).abs() < 1e-9);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("plain"), "plain");
    }
}
