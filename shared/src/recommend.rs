//! Crop recommendation ranking

use std::cmp::Ordering;

use crate::models::{Conditions, Crop, WeatherObservation};
use crate::scoring::{assess, CropScore};

/// Number of crops returned by [`recommend`]
pub const DEFAULT_TOP_N: usize = 5;

/// Rank every crop against an observation and keep the best [`DEFAULT_TOP_N`].
///
/// An absent observation, or one with a missing or non-finite temperature,
/// humidity or rainfall, produces an empty list.
pub fn recommend(crops: &[Crop], observation: Option<&WeatherObservation>) -> Vec<CropScore> {
    match observation.and_then(WeatherObservation::conditions) {
        Some(conditions) => rank(crops, &conditions, DEFAULT_TOP_N),
        None => Vec::new(),
    }
}

/// Score all crops, sort by suitability (highest first, ties by name) and
/// truncate to `limit`.
pub fn rank(crops: &[Crop], conditions: &Conditions, limit: usize) -> Vec<CropScore> {
    let mut scores: Vec<CropScore> = crops
        .iter()
        .map(|crop| assess(crop, conditions))
        .collect();

    scores.sort_by(by_suitability);
    scores.truncate(limit);
    scores
}

fn by_suitability(a: &CropScore, b: &CropScore) -> Ordering {
    b.suitability
        .total_cmp(&a.suitability)
        .then_with(|| a.crop_name.cmp(&b.crop_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CropRanges, IdealRange};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn crop(name: &str, t: (f64, f64)) -> Crop {
        Crop {
            id: Uuid::new_v4(),
            name: name.to_string(),
            crop_type: "test".to_string(),
            growing_season: "any".to_string(),
            ranges: CropRanges {
                temperature: IdealRange::new(t.0, t.1).unwrap(),
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

    fn catalogue() -> Vec<Crop> {
        vec![
            crop("Wheat", (5.0, 25.0)),
            crop("Rice", (20.0, 35.0)),
            crop("Maize", (18.0, 32.0)),
            crop("Barley", (0.0, 20.0)),
            crop("Cotton", (21.0, 37.0)),
            crop("Millet", (24.0, 36.0)),
            crop("Sorghum", (22.0, 38.0)),
        ]
    }

    #[test]
    fn returns_top_five_descending() {
        let ranked = recommend(&catalogue(), Some(&observation(Some(26.0))));
        assert_eq!(ranked.len(), DEFAULT_TOP_N);
        assert!(ranked
            .windows(2)
            .all(|pair| pair[0].suitability >= pair[1].suitability));
        assert_eq!(ranked[0].crop_name, "Maize");
    }

    #[test]
    fn fewer_crops_than_limit() {
        let crops = catalogue()[..2].to_vec();
        assert_eq!(recommend(&crops, Some(&observation(Some(20.0)))).len(), 2);
    }

    #[test]
    fn unavailable_observation_is_empty() {
        assert!(recommend(&catalogue(), None).is_empty());
        assert!(recommend(&catalogue(), Some(&observation(None))).is_empty());
        assert!(recommend(&catalogue(), Some(&observation(Some(f64::NAN)))).is_empty());
    }

    #[test]
    fn ties_break_by_name() {
        let crops = vec![crop("Zucchini", (10.0, 30.0)), crop("Artichoke", (10.0, 30.0))];
        let ranked = recommend(&crops, Some(&observation(Some(20.0))));
        assert_eq!(ranked[0].crop_name, "Artichoke");
        assert_eq!(ranked[1].crop_name, "Zucchini");
    }
}
