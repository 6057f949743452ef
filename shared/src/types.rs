//! Common types used across the platform

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// GPS coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl GpsCoordinates {
    pub fn new(latitude: Decimal, longitude: Decimal) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Where to look up weather, soil or geocoding data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    /// A free-text place name such as "Nairobi" or "Pune, IN"
    Place { name: String },
    /// A latitude/longitude pair
    Coordinates(GpsCoordinates),
}

impl Location {
    /// Pick the most precise location available: coordinates win over a place name.
    ///
    /// Returns `None` when neither a complete coordinate pair nor a non-blank
    /// place name is present.
    pub fn resolve(
        place: Option<&str>,
        latitude: Option<Decimal>,
        longitude: Option<Decimal>,
    ) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => {
                Some(Location::Coordinates(GpsCoordinates::new(latitude, longitude)))
            }
            _ => place
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| Location::Place {
                    name: name.to_string(),
                }),
        }
    }

    pub fn coordinates(&self) -> Option<GpsCoordinates> {
        match self {
            Location::Coordinates(coords) => Some(*coords),
            Location::Place { .. } => None,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Place { name } => write!(f, "{}", name),
            Location::Coordinates(c) => write!(f, "{},{}", c.latitude, c.longitude),
        }
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total_items: u64) -> Self {
        let per_page = u64::from(pagination.per_page.max(1));
        let total_pages = total_items.div_ceil(per_page).max(1);
        Self {
            page: pagination.page,
            per_page: pagination.per_page,
            total_items,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_win_over_place_name() {
        let location = Location::resolve(
            Some("Nairobi"),
            Some(Decimal::new(-1286, 3)),
            Some(Decimal::new(36817, 3)),
        );
        assert!(matches!(location, Some(Location::Coordinates(_))));
    }

    #[test]
    fn half_a_coordinate_pair_falls_back_to_place() {
        let location = Location::resolve(Some(" Pune "), Some(Decimal::ONE), None);
        assert_eq!(
            location,
            Some(Location::Place {
                name: "Pune".to_string()
            })
        );
    }

    #[test]
    fn blank_place_without_coordinates_is_unresolvable() {
        assert_eq!(Location::resolve(Some("   "), None, None), None);
        assert_eq!(Location::resolve(None, None, Some(Decimal::ONE)), None);
    }

    #[test]
    fn pagination_offsets() {
        let p = Pagination::new(Some(3), 10);
        assert_eq!(p.offset(), 20);
        assert_eq!(p.limit(), 10);
        assert_eq!(Pagination::new(Some(0), 10).page, 1);
    }

    #[test]
    fn pagination_meta_rounds_up() {
        let p = Pagination::new(Some(1), 10);
        assert_eq!(PaginationMeta::new(&p, 21).total_pages, 3);
        assert_eq!(PaginationMeta::new(&p, 0).total_pages, 1);
    }
}
