//! Season-ahead predictions: what to plant next and how much it will yield
//!
//! Both are coarse rules over the crop's ideal ranges rather than the
//! distance-based scorer. A rotation candidate earns one point for each of:
//!
//! - temperature, humidity and rainfall inside the crop's ranges
//! - soil pH inside the crop's pH range
//! - not having been planted on the farm in recent seasons
//!
//! and is suggested once it reaches [`ROTATION_THRESHOLD`].
//!
//! The yield prediction steps the base yield down when temperature or rainfall
//! fall outside their ranges, then scales it by the farm's recent predictions
//! for the same crop.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Conditions, Crop, IdealRange};

/// Points available to a rotation candidate
pub const ROTATION_MAX_POINTS: u8 = 5;

/// Points a crop needs to be suggested
pub const ROTATION_THRESHOLD: u8 = 3;

/// Earlier predictions averaged into a new yield prediction
pub const YIELD_HISTORY_LEN: usize = 3;

const BASE_CONFIDENCE: f64 = 0.7;
const HISTORY_BONUS: f64 = 0.1;
const IDEAL_WEATHER_BONUS: f64 = 0.1;

/// Which rotation checks a crop passed
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RotationPoints {
    pub temperature: bool,
    pub humidity: bool,
    pub rainfall: bool,
    pub soil_ph: bool,
    pub not_recent: bool,
}

impl RotationPoints {
    pub fn total(&self) -> u8 {
        [
            self.temperature,
            self.humidity,
            self.rainfall,
            self.soil_ph,
            self.not_recent,
        ]
        .into_iter()
        .filter(|passed| *passed)
        .count() as u8
    }
}

/// Score a rotation candidate.
///
/// An unknown soil pH, or a crop without a pH range, earns no soil point.
pub fn rotation_points(
    crop: &Crop,
    conditions: &Conditions,
    soil_ph: Option<f64>,
    recently_planted: bool,
) -> RotationPoints {
    let soil_ph = match (soil_ph, crop.ph_range) {
        (Some(ph), Some(range)) if ph.is_finite() => range.contains(ph),
        _ => false,
    };

    RotationPoints {
        temperature: crop.ranges.temperature.contains(conditions.temperature),
        humidity: crop.ranges.humidity.contains(conditions.humidity),
        rainfall: crop.ranges.rainfall.contains(conditions.rainfall),
        soil_ph,
        not_recent: !recently_planted,
    }
}

/// A crop worth planting next season
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RotationSuggestion {
    pub crop_id: Uuid,
    pub crop_name: String,
    pub points: RotationPoints,
    pub score: u8,
    /// `score / ROTATION_MAX_POINTS`, in `[0, 1]`
    pub confidence: f64,
}

/// Crops reaching [`ROTATION_THRESHOLD`], highest score first, ties by name.
///
/// `recent` holds the crops planted on the farm in recent seasons.
pub fn suggest_rotation(
    crops: &[Crop],
    conditions: &Conditions,
    soil_ph: Option<f64>,
    recent: &[Uuid],
) -> Vec<RotationSuggestion> {
    let mut suggestions: Vec<RotationSuggestion> = crops
        .iter()
        .filter_map(|crop| {
            let points = rotation_points(crop, conditions, soil_ph, recent.contains(&crop.id));
            let score = points.total();
            (score >= ROTATION_THRESHOLD).then(|| RotationSuggestion {
                crop_id: crop.id,
                crop_name: crop.name.clone(),
                points,
                score,
                confidence: f64::from(score) / f64::from(ROTATION_MAX_POINTS),
            })
        })
        .collect();

    suggestions.sort_by(by_score);
    suggestions
}

fn by_score(a: &RotationSuggestion, b: &RotationSuggestion) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.crop_name.cmp(&b.crop_name))
}

/// Temperature multiplier: 0.8 when too cold, 0.9 when too hot
pub fn temperature_factor(observed: f64, range: &IdealRange) -> f64 {
    let (lo, hi) = range.bounds();
    if observed < lo {
        0.8
    } else if observed > hi {
        0.9
    } else {
        1.0
    }
}

/// Rainfall multiplier: 0.7 when too dry, 0.8 when too wet
pub fn rainfall_factor(observed: f64, range: &IdealRange) -> f64 {
    let (lo, hi) = range.bounds();
    if observed < lo {
        0.7
    } else if observed > hi {
        0.8
    } else {
        1.0
    }
}

/// Predicted yield for one crop and season
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct YieldPrediction {
    /// Per hectare
    pub predicted_yield: f64,
    /// In `[0, 1]`
    pub confidence: f64,
    pub temperature_factor: f64,
    pub rainfall_factor: f64,
    pub historical_factor: f64,
    /// Earlier predictions that went into `historical_factor`
    pub history_used: usize,
}

/// Predict a season's yield per hectare.
///
/// `history` holds earlier predicted yields for the same farm and crop,
/// most recent first; only the first [`YIELD_HISTORY_LEN`] are used.
pub fn predict_yield(crop: &Crop, conditions: &Conditions, history: &[f64]) -> YieldPrediction {
    let temperature_factor = temperature_factor(conditions.temperature, &crop.ranges.temperature);
    let rainfall_factor = rainfall_factor(conditions.rainfall, &crop.ranges.rainfall);

    let recent: Vec<f64> = history
        .iter()
        .copied()
        .filter(|y| y.is_finite())
        .take(YIELD_HISTORY_LEN)
        .collect();

    let historical_factor = if recent.is_empty() || crop.base_yield <= 0.0 {
        1.0
    } else {
        let average = recent.iter().sum::<f64>() / recent.len() as f64;
        average / crop.base_yield
    };

    let mut confidence = BASE_CONFIDENCE;
    if !recent.is_empty() {
        confidence += HISTORY_BONUS;
    }
    let near_ideal = |f: f64| (0.9..=1.1).contains(&f);
    if near_ideal(temperature_factor) && near_ideal(rainfall_factor) {
        confidence += IDEAL_WEATHER_BONUS;
    }

    YieldPrediction {
        predicted_yield: crop.base_yield * temperature_factor * rainfall_factor * historical_factor,
        confidence: confidence.min(1.0),
        temperature_factor,
        rainfall_factor,
        historical_factor,
        history_used: recent.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CropRanges;

    fn crop(name: &str, ph: Option<(f64, f64)>) -> Crop {
        Crop {
            id: Uuid::new_v4(),
            name: name.to_string(),
            crop_type: "cereal".to_string(),
            growing_season: "rabi".to_string(),
            ranges: CropRanges {
                temperature: IdealRange::new(10.0, 25.0).unwrap(),
                humidity: IdealRange::new(40.0, 70.0).unwrap(),
                rainfall: IdealRange::new(0.0, 10.0).unwrap(),
            },
            preferred_soil: None,
            ph_range: ph.map(|(lo, hi)| IdealRange::new(lo, hi).unwrap()),
            base_yield: 3000.0,
        }
    }

    fn conditions(t: f64, h: f64, r: f64) -> Conditions {
        Conditions::new(t, h, r).unwrap()
    }

    #[test]
    fn every_check_passing_scores_five() {
        let wheat = crop("Wheat", Some((6.0, 7.5)));
        let points = rotation_points(&wheat, &conditions(18.0, 55.0, 4.0), Some(6.8), false);
        assert_eq!(points.total(), ROTATION_MAX_POINTS);
    }

    #[test]
    fn unknown_ph_earns_no_soil_point() {
        let wheat = crop("Wheat", Some((6.0, 7.5)));
        let c = conditions(18.0, 55.0, 4.0);
        assert!(!rotation_points(&wheat, &c, None, false).soil_ph);
        assert!(!rotation_points(&crop("Oats", None), &c, Some(6.8), false).soil_ph);
        assert!(!rotation_points(&wheat, &c, Some(f64::NAN), false).soil_ph);
    }

    #[test]
    fn recently_planted_crop_loses_a_point() {
        let wheat = crop("Wheat", None);
        let c = conditions(18.0, 55.0, 4.0);
        assert_eq!(rotation_points(&wheat, &c, None, false).total(), 4);
        assert_eq!(rotation_points(&wheat, &c, None, true).total(), 3);
    }

    #[test]
    fn suggestions_need_three_points() {
        let wheat = crop("Wheat", None);
        let barley = crop("Barley", None);
        // Too hot and too wet: only humidity and freshness count
        let c = conditions(32.0, 55.0, 20.0);
        assert!(suggest_rotation(std::slice::from_ref(&wheat), &c, None, &[]).is_empty());

        let mild = conditions(18.0, 55.0, 20.0);
        let picks = suggest_rotation(&[wheat.clone(), barley], &mild, None, &[wheat.id]);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].crop_name, "Barley");
        assert_eq!(picks[0].score, 3);
        assert!((picks[0].confidence - 0.6).abs() < 1e-12);
    }

    #[test]
    fn suggestions_ordered_by_score_then_name() {
        let wheat = crop("Wheat", Some((6.0, 7.5)));
        let barley = crop("Barley", None);
        let amaranth = crop("Amaranth", None);
        let c = conditions(18.0, 55.0, 4.0);
        let picks = suggest_rotation(&[wheat, barley, amaranth], &c, Some(7.0), &[]);
        let names: Vec<&str> = picks.iter().map(|p| p.crop_name.as_str()).collect();
        assert_eq!(names, vec!["Wheat", "Amaranth", "Barley"]);
    }

    #[test]
    fn factors_step_down_outside_ranges() {
        let r = IdealRange::new(10.0, 25.0).unwrap();
        assert_eq!(temperature_factor(5.0, &r), 0.8);
        assert_eq!(temperature_factor(30.0, &r), 0.9);
        assert_eq!(temperature_factor(25.0, &r), 1.0);
        assert_eq!(rainfall_factor(5.0, &r), 0.7);
        assert_eq!(rainfall_factor(30.0, &r), 0.8);
    }

    #[test]
    fn first_season_uses_base_yield() {
        let p = predict_yield(&crop("Wheat", None), &conditions(18.0, 55.0, 4.0), &[]);
        assert_eq!(p.predicted_yield, 3000.0);
        assert_eq!(p.historical_factor, 1.0);
        assert_eq!(p.history_used, 0);
        assert!((p.confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn history_scales_yield_and_raises_confidence() {
        // Only the three most recent seasons count: (2400 + 2700 + 3000) / 3 = 2700
        let history = [2400.0, 2700.0, 3000.0, 9000.0];
        let p = predict_yield(&crop("Wheat", None), &conditions(18.0, 55.0, 4.0), &history);
        assert_eq!(p.history_used, 3);
        assert!((p.historical_factor - 0.9).abs() < 1e-12);
        assert!((p.predicted_yield - 2700.0).abs() < 1e-9);
        assert!((p.confidence - 0.9).abs() < 1e-12);
    }

    #[test]
    fn poor_weather_lowers_yield_and_confidence() {
        // Cold and dry: 3000 * 0.8 * 0.7
        let p = predict_yield(&crop("Wheat", None), &conditions(2.0, 55.0, -1.0), &[]);
        assert!((p.predicted_yield - 1680.0).abs() < 1e-9);
        assert!((p.confidence - 0.7).abs() < 1e-12);
    }
}
