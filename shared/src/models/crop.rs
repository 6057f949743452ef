//! Crop reference models

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised when building crop reference data
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    #[error("range bounds must be finite numbers")]
    NotFinite,

    #[error("range minimum {min} is greater than maximum {max}")]
    Inverted { min: f64, max: f64 },
}

/// An ideal growing interval for one weather factor, inclusive on both ends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IdealRange {
    pub min: f64,
    pub max: f64,
}

impl IdealRange {
    /// Build a validated range
    pub fn new(min: f64, max: f64) -> Result<Self, RangeError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(RangeError::NotFinite);
        }
        if min > max {
            return Err(RangeError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    /// Bounds in ascending order, tolerating ranges deserialized with min > max
    pub fn bounds(&self) -> (f64, f64) {
        if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        }
    }

    pub fn midpoint(&self) -> f64 {
        let (lo, hi) = self.bounds();
        (lo + hi) / 2.0
    }

    pub fn half_range(&self) -> f64 {
        let (lo, hi) = self.bounds();
        (hi - lo) / 2.0
    }

    pub fn contains(&self, value: f64) -> bool {
        let (lo, hi) = self.bounds();
        value >= lo && value <= hi
    }
}

/// Ideal temperature (°C), humidity (%) and rainfall (mm) ranges for a crop
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CropRanges {
    pub temperature: IdealRange,
    pub humidity: IdealRange,
    pub rainfall: IdealRange,
}

/// USDA soil texture classes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SoilTexture {
    Sand,
    LoamySand,
    SandyLoam,
    Loam,
    SiltLoam,
    Silt,
    SandyClayLoam,
    ClayLoam,
    SiltyClayLoam,
    SandyClay,
    SiltyClay,
    Clay,
}

impl SoilTexture {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoilTexture::Sand => "sand",
            SoilTexture::LoamySand => "loamy_sand",
            SoilTexture::SandyLoam => "sandy_loam",
            SoilTexture::Loam => "loam",
            SoilTexture::SiltLoam => "silt_loam",
            SoilTexture::Silt => "silt",
            SoilTexture::SandyClayLoam => "sandy_clay_loam",
            SoilTexture::ClayLoam => "clay_loam",
            SoilTexture::SiltyClayLoam => "silty_clay_loam",
            SoilTexture::SandyClay => "sandy_clay",
            SoilTexture::SiltyClay => "silty_clay",
            SoilTexture::Clay => "clay",
        }
    }

    /// Classify a soil sample from its sand/silt/clay percentages using the
    /// USDA texture triangle.
    pub fn classify(sand: f64, silt: f64, clay: f64) -> Self {
        if silt + 1.5 * clay < 15.0 {
            SoilTexture::Sand
        } else if silt + 1.5 * clay >= 15.0 && silt + 2.0 * clay < 30.0 {
            SoilTexture::LoamySand
        } else if (7.0..20.0).contains(&clay) && sand > 52.0 && silt + 2.0 * clay >= 30.0
            || clay < 7.0 && silt < 50.0 && silt + 2.0 * clay >= 30.0
        {
            SoilTexture::SandyLoam
        } else if (7.0..27.0).contains(&clay) && (28.0..50.0).contains(&silt) && sand <= 52.0 {
            SoilTexture::Loam
        } else if silt >= 50.0 && (12.0..27.0).contains(&clay) || (50.0..80.0).contains(&silt) && clay < 12.0 {
            SoilTexture::SiltLoam
        } else if silt >= 80.0 && clay < 12.0 {
            SoilTexture::Silt
        } else if (20.0..35.0).contains(&clay) && silt < 28.0 && sand > 45.0 {
            SoilTexture::SandyClayLoam
        } else if (27.0..40.0).contains(&clay) && sand > 20.0 && sand <= 45.0 {
            SoilTexture::ClayLoam
        } else if (27.0..40.0).contains(&clay) && sand <= 20.0 {
            SoilTexture::SiltyClayLoam
        } else if clay >= 35.0 && sand > 45.0 {
            SoilTexture::SandyClay
        } else if clay >= 40.0 && silt >= 40.0 {
            SoilTexture::SiltyClay
        } else {
            SoilTexture::Clay
        }
    }
}

impl std::fmt::Display for SoilTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SoilTexture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        let texture = match normalized.as_str() {
            "sand" => SoilTexture::Sand,
            "loamy_sand" => SoilTexture::LoamySand,
            "sandy_loam" => SoilTexture::SandyLoam,
            "loam" => SoilTexture::Loam,
            "silt_loam" => SoilTexture::SiltLoam,
            "silt" => SoilTexture::Silt,
            "sandy_clay_loam" => SoilTexture::SandyClayLoam,
            "clay_loam" => SoilTexture::ClayLoam,
            "silty_clay_loam" => SoilTexture::SiltyClayLoam,
            "sandy_clay" => SoilTexture::SandyClay,
            "silty_clay" => SoilTexture::SiltyClay,
            "clay" => SoilTexture::Clay,
            other => return Err(format!("unknown soil texture: {}", other)),
        };
        Ok(texture)
    }
}

/// A crop and the conditions it grows best in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crop {
    pub id: Uuid,
    pub name: String,
    pub crop_type: String,
    pub growing_season: String,
    pub ranges: CropRanges,
    pub preferred_soil: Option<SoilTexture>,
    /// Soil pH the crop tolerates, when known
    #[serde(default)]
    pub ph_range: Option<IdealRange>,
    /// Average yield per hectare under ideal conditions
    pub base_yield: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_rejects_inverted_bounds() {
        assert_eq!(
            IdealRange::new(30.0, 10.0),
            Err(RangeError::Inverted { min: 30.0, max: 10.0 })
        );
        assert_eq!(IdealRange::new(f64::NAN, 1.0), Err(RangeError::NotFinite));
    }

    #[test]
    fn range_midpoint_and_half_range() {
        let range = IdealRange::new(10.0, 30.0).unwrap();
        assert_eq!(range.midpoint(), 20.0);
        assert_eq!(range.half_range(), 10.0);
        assert!(range.contains(10.0));
        assert!(range.contains(30.0));
        assert!(!range.contains(30.5));
    }

    #[test]
    fn inverted_range_is_normalised() {
        let range = IdealRange { min: 30.0, max: 10.0 };
        assert_eq!(range.bounds(), (10.0, 30.0));
        assert_eq!(range.midpoint(), 20.0);
    }

    #[test]
    fn soil_texture_parses_loose_spellings() {
        assert_eq!("Sandy Loam".parse::<SoilTexture>(), Ok(SoilTexture::SandyLoam));
        assert_eq!("clay-loam".parse::<SoilTexture>(), Ok(SoilTexture::ClayLoam));
        assert!("gravel".parse::<SoilTexture>().is_err());
    }

    #[test]
    fn soil_texture_classification() {
        assert_eq!(SoilTexture::classify(92.0, 5.0, 3.0), SoilTexture::Sand);
        assert_eq!(SoilTexture::classify(40.0, 40.0, 20.0), SoilTexture::Loam);
        assert_eq!(SoilTexture::classify(10.0, 85.0, 5.0), SoilTexture::Silt);
        assert_eq!(SoilTexture::classify(20.0, 20.0, 60.0), SoilTexture::Clay);
    }
}
