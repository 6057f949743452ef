//! Crop suitability scoring
//!
//! Every factor is scored by how far the observed value sits from the middle
//! of the crop's ideal range, relative to half the width of that range:
//!
//! ```text
//! quality = 1 - |observed - midpoint| / half_range
//! ```
//!
//! Suitability clamps each factor into `[0, 1]` and averages temperature,
//! humidity and rainfall. Confidence is the same number on a 0-100 scale.
//! The yield estimate multiplies the crop's base yield by the three factors
//! clamped into `[0.5, 1]`.
//!
//! A zero-width range (`min == max`) only matches an exact observation: the
//! factor is 1 on an exact match and the floor (0, or 0.5 for yield)
//! otherwise.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Conditions, Crop, CropRanges, IdealRange};

/// Lowest value a factor can take in the yield estimate
pub const YIELD_FACTOR_FLOOR: f64 = 0.5;

/// Match quality of one observed value against one range, clamped to `[floor, 1]`
fn match_quality(observed: f64, range: &IdealRange, floor: f64) -> f64 {
    let midpoint = range.midpoint();
    let half_range = range.half_range();

    if half_range == 0.0 {
        return if observed == midpoint { 1.0 } else { floor };
    }

    (1.0 - (observed - midpoint).abs() / half_range).clamp(floor, 1.0)
}

/// Suitability of one factor, in `[0, 1]`
pub fn component_score(observed: f64, range: &IdealRange) -> f64 {
    match_quality(observed, range, 0.0)
}

/// Yield multiplier for one factor, in `[0.5, 1]`
pub fn yield_factor(observed: f64, range: &IdealRange) -> f64 {
    match_quality(observed, range, YIELD_FACTOR_FLOOR)
}

/// Per-factor suitability
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComponentScores {
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
}

impl ComponentScores {
    pub fn mean(&self) -> f64 {
        (self.temperature + self.humidity + self.rainfall) / 3.0
    }
}

/// Score each factor of `conditions` against the crop's ranges
pub fn components(ranges: &CropRanges, conditions: &Conditions) -> ComponentScores {
    ComponentScores {
        temperature: component_score(conditions.temperature, &ranges.temperature),
        humidity: component_score(conditions.humidity, &ranges.humidity),
        rainfall: component_score(conditions.rainfall, &ranges.rainfall),
    }
}

/// Overall suitability in `[0, 1]`
pub fn score(ranges: &CropRanges, conditions: &Conditions) -> f64 {
    components(ranges, conditions).mean()
}

/// Suitability restated as a percentage, `[0, 100]`
pub fn confidence(ranges: &CropRanges, conditions: &Conditions) -> f64 {
    score(ranges, conditions) * 100.0
}

/// Heuristic yield per hectare
pub fn estimate_yield(base_yield: f64, ranges: &CropRanges, conditions: &Conditions) -> f64 {
    base_yield
        * yield_factor(conditions.temperature, &ranges.temperature)
        * yield_factor(conditions.rainfall, &ranges.rainfall)
        * yield_factor(conditions.humidity, &ranges.humidity)
}

/// The scorer's verdict for one crop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropScore {
    pub crop_id: Uuid,
    pub crop_name: String,
    pub suitability: f64,
    pub confidence: f64,
    /// Per hectare
    pub estimated_yield: f64,
    pub components: ComponentScores,
}

impl CropScore {
    /// Expected yield across a farm of `area_hectares`
    pub fn total_yield(&self, area_hectares: f64) -> f64 {
        self.estimated_yield * area_hectares
    }
}

/// Score a crop against the given conditions
pub fn assess(crop: &Crop, conditions: &Conditions) -> CropScore {
    let components = components(&crop.ranges, conditions);
    let suitability = components.mean();

    CropScore {
        crop_id: crop.id,
        crop_name: crop.name.clone(),
        suitability,
        confidence: suitability * 100.0,
        estimated_yield: estimate_yield(crop.base_yield, &crop.ranges, conditions),
        components,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn range(min: f64, max: f64) -> IdealRange {
        IdealRange::new(min, max).unwrap()
    }

    fn ranges() -> CropRanges {
        CropRanges {
            temperature: range(10.0, 30.0),
            humidity: range(40.0, 80.0),
            rainfall: range(0.0, 20.0),
        }
    }

    fn conditions(t: f64, h: f64, r: f64) -> Conditions {
        Conditions::new(t, h, r).unwrap()
    }

    #[test]
    fn midpoint_scores_one() {
        assert_eq!(component_score(20.0, &range(10.0, 30.0)), 1.0);
    }

    #[test]
    fn a_full_half_range_away_scores_zero() {
        assert_eq!(component_score(0.0, &range(10.0, 30.0)), 0.0);
        assert_eq!(component_score(40.0, &range(10.0, 30.0)), 0.0);
    }

    #[test]
    fn range_edges_score_zero() {
        // The bounds are exactly one half-range from the midpoint
        assert_eq!(component_score(10.0, &range(10.0, 30.0)), 0.0);
        assert_eq!(component_score(30.0, &range(10.0, 30.0)), 0.0);
    }

    #[test]
    fn partial_match_is_linear() {
        assert!((component_score(25.0, &range(10.0, 30.0)) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_width_range_only_matches_exactly() {
        let exact = range(25.0, 25.0);
        assert_eq!(component_score(25.0, &exact), 1.0);
        assert_eq!(component_score(25.0001, &exact), 0.0);
        assert_eq!(yield_factor(25.0, &exact), 1.0);
        assert_eq!(yield_factor(24.0, &exact), 0.5);
    }

    #[test]
    fn suitability_is_mean_of_components() {
        let c = conditions(20.0, 60.0, 15.0);
        let parts = components(&ranges(), &c);
        assert_eq!(parts.temperature, 1.0);
        assert_eq!(parts.humidity, 1.0);
        assert!((parts.rainfall - 0.5).abs() < 1e-12);
        assert!((score(&ranges(), &c) - 2.5 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn confidence_is_suitability_percent() {
        let c = conditions(25.0, 50.0, 5.0);
        let s = score(&ranges(), &c);
        assert!((confidence(&ranges(), &c) - s * 100.0).abs() < 1e-9);
    }

    #[test]
    fn yield_is_floored_at_half_per_factor() {
        let hostile = conditions(-40.0, 0.0, 500.0);
        assert_eq!(estimate_yield(1000.0, &ranges(), &hostile), 125.0);
        let ideal = conditions(20.0, 60.0, 10.0);
        assert_eq!(estimate_yield(1000.0, &ranges(), &ideal), 1000.0);
    }

    #[test]
    fn assess_fills_every_field() {
        let crop = Crop {
            id: Uuid::nil(),
            name: "Maize".to_string(),
            crop_type: "cereal".to_string(),
            growing_season: "kharif".to_string(),
            ranges: ranges(),
            preferred_soil: None,
            ph_range: None,
            base_yield: 3000.0,
        };
        let verdict = assess(&crop, &conditions(20.0, 60.0, 10.0));
        assert_eq!(verdict.crop_name, "Maize");
        assert_eq!(verdict.suitability, 1.0);
        assert_eq!(verdict.confidence, 100.0);
        assert_eq!(verdict.estimated_yield, 3000.0);
        assert_eq!(verdict.total_yield(2.5), 7500.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_component_bounded(
            observed in -100.0f64..100.0,
            min in -50.0f64..50.0,
            width in 0.0f64..60.0,
        ) {
            let s = component_score(observed, &range(min, min + width));
            prop_assert!((0.0..=1.0).contains(&s));
            let y = yield_factor(observed, &range(min, min + width));
            prop_assert!((0.5..=1.0).contains(&y));
        }

        #[test]
        fn prop_symmetric_around_midpoint(
            min in -50.0f64..50.0,
            width in 0.5f64..60.0,
            fraction in 0.0f64..=1.0,
        ) {
            let r = range(min, min + width);
            let d = fraction * r.half_range();
            let below = component_score(r.midpoint() - d, &r);
            let above = component_score(r.midpoint() + d, &r);
            prop_assert!((below - above).abs() < 1e-9);
        }

        #[test]
        fn prop_deterministic(t in -20.0f64..50.0, h in 0.0f64..100.0, r in 0.0f64..100.0) {
            let c = conditions(t, h, r);
            prop_assert_eq!(score(&ranges(), &c), score(&ranges(), &c));
            prop_assert_eq!(
                estimate_yield(900.0, &ranges(), &c),
                estimate_yield(900.0, &ranges(), &c)
            );
        }
    }
}
