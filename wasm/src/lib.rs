//! WebAssembly module for Farm Advisor
//!
//! Provides client-side computation for offline previews:
//! - Crop suitability and yield estimates
//! - Top crop recommendations for a reading
//! - Forecast hazard checks
//! - Weather reading validation

use wasm_bindgen::prelude::*;

use shared::hazards::check_day;
use shared::models::{Conditions, Crop, CropRanges, ForecastDay, SoilTexture, WeatherObservation};
use shared::recommend::recommend;
use shared::scoring::{assess, score};
use shared::validation::{validate_humidity, validate_rainfall, validate_temperature};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Suitability (0-1) of a crop's ranges for one reading.
/// `ranges_json` is `{"temperature": {"min", "max"}, "humidity": .., "rainfall": ..}`.
#[wasm_bindgen]
pub fn suitability_score(
    ranges_json: &str,
    temperature: f64,
    humidity: f64,
    rainfall: f64,
) -> Result<f64, JsValue> {
    suitability(ranges_json, temperature, humidity, rainfall).map_err(|e| JsValue::from_str(&e))
}

/// Full assessment of one crop as JSON
#[wasm_bindgen]
pub fn assess_crop(
    crop_json: &str,
    temperature: f64,
    humidity: f64,
    rainfall: f64,
) -> Result<String, JsValue> {
    assessment(crop_json, temperature, humidity, rainfall).map_err(|e| JsValue::from_str(&e))
}

/// Top five crops for an observation, as a JSON array
#[wasm_bindgen]
pub fn recommend_crops(crops_json: &str, observation_json: &str) -> Result<String, JsValue> {
    recommendations(crops_json, observation_json).map_err(|e| JsValue::from_str(&e))
}

/// Hazards triggered by a forecast day, as a JSON array
#[wasm_bindgen]
pub fn check_forecast_day(day_json: &str) -> Result<String, JsValue> {
    hazards(day_json).map_err(|e| JsValue::from_str(&e))
}

/// First problem with a manual weather reading, or `None` when it is valid
#[wasm_bindgen]
pub fn validate_weather_reading(temperature: f64, humidity: f64, rainfall: f64) -> Option<String> {
    validate_temperature(temperature)
        .and(validate_humidity(humidity))
        .and(validate_rainfall(rainfall))
        .err()
        .map(str::to_string)
}

/// USDA texture class for sand/silt/clay percentages
#[wasm_bindgen]
pub fn classify_soil(sand: f64, silt: f64, clay: f64) -> String {
    SoilTexture::classify(sand, silt, clay).as_str().to_string()
}

fn conditions(temperature: f64, humidity: f64, rainfall: f64) -> Result<Conditions, String> {
    Conditions::new(temperature, humidity, rainfall)
        .ok_or_else(|| "Weather reading must be finite numbers".to_string())
}

fn suitability(ranges_json: &str, temperature: f64, humidity: f64, rainfall: f64) -> Result<f64, String> {
    let ranges: CropRanges =
        serde_json::from_str(ranges_json).map_err(|e| format!("Invalid ranges JSON: {}", e))?;
    Ok(score(&ranges, &conditions(temperature, humidity, rainfall)?))
}

fn assessment(crop_json: &str, temperature: f64, humidity: f64, rainfall: f64) -> Result<String, String> {
    let crop: Crop =
        serde_json::from_str(crop_json).map_err(|e| format!("Invalid crop JSON: {}", e))?;
    let result = assess(&crop, &conditions(temperature, humidity, rainfall)?);
    serde_json::to_string(&result).map_err(|e| e.to_string())
}

fn recommendations(crops_json: &str, observation_json: &str) -> Result<String, String> {
    let crops: Vec<Crop> =
        serde_json::from_str(crops_json).map_err(|e| format!("Invalid crops JSON: {}", e))?;
    let observation: WeatherObservation = serde_json::from_str(observation_json)
        .map_err(|e| format!("Invalid observation JSON: {}", e))?;
    serde_json::to_string(&recommend(&crops, Some(&observation))).map_err(|e| e.to_string())
}

fn hazards(day_json: &str) -> Result<String, String> {
    let day: ForecastDay =
        serde_json::from_str(day_json).map_err(|e| format!("Invalid forecast JSON: {}", e))?;
    serde_json::to_string(&check_day(&day)).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGES: &str = r#"{
        "temperature": {"min": 10.0, "max": 30.0},
        "humidity": {"min": 40.0, "max": 80.0},
        "rainfall": {"min": 0.0, "max": 20.0}
    }"#;

    fn crop_json(name: &str, min_temp: f64, max_temp: f64) -> String {
        format!(
            r#"{{
                "id": "6f1c1c4e-2b1a-4f7e-9a43-1f1f0a4f7d11",
                "name": "{name}",
                "crop_type": "cereal",
                "growing_season": "rabi",
                "ranges": {{
                    "temperature": {{"min": {min_temp}, "max": {max_temp}}},
                    "humidity": {{"min": 40.0, "max": 80.0}},
                    "rainfall": {{"min": 0.0, "max": 20.0}}
                }},
                "preferred_soil": "loam",
                "base_yield": 3000.0
            }}"#
        )
    }

    #[test]
    fn test_suitability_at_midpoint() {
        let s = suitability(RANGES, 20.0, 60.0, 10.0).unwrap();
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_suitability_rejects_bad_input() {
        assert!(suitability("not json", 20.0, 60.0, 10.0).is_err());
        assert!(suitability(RANGES, f64::NAN, 60.0, 10.0).is_err());
    }

    #[test]
    fn test_assess_crop() {
        let json = assessment(&crop_json("Wheat", 10.0, 30.0), 20.0, 60.0, 10.0).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["crop_name"], "Wheat");
        assert_eq!(value["confidence"], 100.0);
    }

    #[test]
    fn test_recommend_orders_by_suitability() {
        let crops = format!(
            "[{}, {}]",
            crop_json("Cool", 0.0, 10.0),
            crop_json("Warm", 15.0, 25.0)
        );
        let observation = r#"{"date": "2024-06-01", "temperature": 20.0, "humidity": 60.0,
            "wind_speed": null, "pressure": null, "description": null, "location_name": null}"#;
        let json = recommendations(&crops, observation).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["crop_name"], "Warm");
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_humidity_gives_no_recommendations() {
        let crops = format!("[{}]", crop_json("Wheat", 10.0, 30.0));
        let observation = r#"{"date": "2024-06-01", "temperature": 20.0, "humidity": null,
            "wind_speed": null, "pressure": null, "description": null, "location_name": null}"#;
        assert_eq!(recommendations(&crops, observation).unwrap(), "[]");
    }

    #[test]
    fn test_check_forecast_day() {
        let day = r#"{"date": "2024-06-01", "temp_min": 22.0, "temp_max": 28.0,
            "temperature": 25.0, "humidity": 60.0, "rainfall": 60.0, "wind_speed": 10.0,
            "pressure": null, "precipitation_probability": 90.0, "description": "heavy rain"}"#;
        let json = hazards(day).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["kind"], "heavy_rain");
        assert_eq!(value.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_validate_weather_reading() {
        assert_eq!(validate_weather_reading(25.0, 60.0, 3.0), None);
        assert!(validate_weather_reading(25.0, 140.0, 3.0).is_some());
    }

    #[test]
    fn test_classify_soil() {
        assert_eq!(classify_soil(40.0, 40.0, 20.0), "loam");
    }
}
