//! Form validation tests
//!
//! Tests for input validation including:
//! - Farm location must be a place name or a full coordinate pair
//! - Farm area must be positive
//! - Manual weather readings stay within physical limits

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::types::Location;
use shared::validation::*;
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_place_name_is_enough() {
        assert!(validate_farm_location(Some("Nashik"), None, None).is_ok());
    }

    #[test]
    fn test_coordinates_are_enough() {
        assert!(validate_farm_location(None, Some(dec("19.9975")), Some(dec("73.7898"))).is_ok());
    }

    #[test]
    fn test_half_a_coordinate_pair_is_rejected() {
        assert!(validate_farm_location(Some("Nashik"), Some(dec("19.9975")), None).is_err());
        assert!(validate_farm_location(None, None, Some(dec("73.7898"))).is_err());
    }

    #[test]
    fn test_no_location_is_rejected() {
        assert!(validate_farm_location(None, None, None).is_err());
        assert!(validate_farm_location(Some("  "), None, None).is_err());
    }

    #[test]
    fn test_out_of_range_coordinates() {
        assert!(validate_coordinates(dec("91"), dec("0")).is_err());
        assert!(validate_coordinates(dec("0"), dec("-181")).is_err());
        assert!(validate_coordinates(dec("-90"), dec("180")).is_ok());
    }

    #[test]
    fn test_area_must_be_positive() {
        assert!(validate_total_area(dec("0.01")).is_ok());
        assert!(validate_total_area(Decimal::ZERO).is_err());
        assert!(validate_total_area(dec("-3")).is_err());
    }

    #[test]
    fn test_location_prefers_coordinates() {
        let location = Location::resolve(Some("Nashik"), Some(dec("19.9975")), Some(dec("73.7898")));
        assert!(matches!(location, Some(Location::Coordinates(_))));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Humidity is a percentage
    #[test]
    fn prop_humidity_range(h in -50.0f64..150.0) {
        prop_assert_eq!(validate_humidity(h).is_ok(), (0.0..=100.0).contains(&h));
    }

    /// Rainfall and wind speed are never negative
    #[test]
    fn prop_non_negative_readings(v in -100.0f64..500.0) {
        prop_assert_eq!(validate_rainfall(v).is_ok(), v >= 0.0);
        prop_assert_eq!(validate_wind_speed(v).is_ok(), v >= 0.0);
    }

    /// Any valid coordinate pair is accepted as a farm location
    #[test]
    fn prop_valid_coordinates_accepted(
        lat in -90_000i64..=90_000,
        lon in -180_000i64..=180_000,
    ) {
        let lat = Decimal::new(lat, 3);
        let lon = Decimal::new(lon, 3);
        prop_assert!(validate_farm_location(None, Some(lat), Some(lon)).is_ok());
    }

    /// Usernames of allowed characters and length pass
    #[test]
    fn prop_usernames(name in "[A-Za-z0-9@.+_-]{3,40}") {
        prop_assert!(validate_username(&name).is_ok());
    }
}
