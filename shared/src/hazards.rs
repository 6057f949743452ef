//! Weather hazard detection for forecast days

use serde::{Deserialize, Serialize};

use crate::models::ForecastDay;

/// Total daily rainfall above which a day is flagged as heavy rain, mm
pub const HEAVY_RAIN_MM: f64 = 50.0;
/// Minimum temperature below which frost is expected, °C
pub const FROST_C: f64 = 0.0;
/// Maximum temperature above which heat stress is expected, °C
pub const HEAT_C: f64 = 35.0;
/// Drought: less rain than this on a day hotter than [`DROUGHT_TEMP_C`]
pub const DROUGHT_RAIN_MM: f64 = 5.0;
pub const DROUGHT_TEMP_C: f64 = 30.0;
/// Wind speed above which a high-wind alert is raised, km/h
pub const HIGH_WIND_KMH: f64 = 60.0;
/// Hail risk: hot, wet and humid
pub const HAIL_TEMP_C: f64 = 30.0;
pub const HAIL_HUMIDITY: f64 = 70.0;
/// Daily temperature range above which a swing alert is raised, °C
pub const TEMPERATURE_SWING_C: f64 = 15.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    HeavyRain,
    Frost,
    Heat,
    Drought,
    HighWind,
    HailRisk,
    TemperatureSwing,
}

impl HazardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardKind::HeavyRain => "heavy_rain",
            HazardKind::Frost => "frost",
            HazardKind::Heat => "heat",
            HazardKind::Drought => "drought",
            HazardKind::HighWind => "high_wind",
            HazardKind::HailRisk => "hail_risk",
            HazardKind::TemperatureSwing => "temperature_swing",
        }
    }
}

impl std::fmt::Display for HazardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HazardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heavy_rain" => Ok(HazardKind::HeavyRain),
            "frost" => Ok(HazardKind::Frost),
            "heat" => Ok(HazardKind::Heat),
            "drought" => Ok(HazardKind::Drought),
            "high_wind" => Ok(HazardKind::HighWind),
            "hail_risk" => Ok(HazardKind::HailRisk),
            "temperature_swing" => Ok(HazardKind::TemperatureSwing),
            other => Err(format!("unknown hazard kind: {}", other)),
        }
    }
}

/// A triggered hazard with a human-readable message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hazard {
    pub kind: HazardKind,
    pub message: String,
}

impl Hazard {
    fn new(kind: HazardKind, message: String) -> Self {
        Self { kind, message }
    }
}

/// Every hazard a forecast day triggers, in a fixed order.
///
/// Checks are independent and all thresholds are strict.
pub fn check_day(day: &ForecastDay) -> Vec<Hazard> {
    let date = day.date.format("%Y-%m-%d");
    let mut hazards = Vec::new();

    if day.rainfall > HEAVY_RAIN_MM {
        hazards.push(Hazard::new(
            HazardKind::HeavyRain,
            format!(
                "Heavy rainfall of {:.1} mm expected on {}. Check drainage and delay fertilizer application.",
                day.rainfall, date
            ),
        ));
    }

    if day.temp_min < FROST_C {
        hazards.push(Hazard::new(
            HazardKind::Frost,
            format!(
                "Frost risk on {}: minimum temperature {:.1}°C. Protect sensitive crops.",
                date, day.temp_min
            ),
        ));
    }

    if day.temp_max > HEAT_C {
        hazards.push(Hazard::new(
            HazardKind::Heat,
            format!(
                "Extreme heat on {}: maximum temperature {:.1}°C. Increase irrigation and provide shade.",
                date, day.temp_max
            ),
        ));
    }

    if day.rainfall < DROUGHT_RAIN_MM && day.temp_max > DROUGHT_TEMP_C {
        hazards.push(Hazard::new(
            HazardKind::Drought,
            format!(
                "Drought conditions on {}: {:.1} mm rain with highs of {:.1}°C. Plan irrigation.",
                date, day.rainfall, day.temp_max
            ),
        ));
    }

    if day.wind_speed > HIGH_WIND_KMH {
        hazards.push(Hazard::new(
            HazardKind::HighWind,
            format!(
                "High winds of {:.1} km/h expected on {}. Secure structures and support tall crops.",
                day.wind_speed, date
            ),
        ));
    }

    if day.temp_max > HAIL_TEMP_C && day.rainfall > 0.0 && day.humidity > HAIL_HUMIDITY {
        hazards.push(Hazard::new(
            HazardKind::HailRisk,
            format!(
                "Hail risk on {}: hot ({:.1}°C), humid ({:.0}%) and wet conditions.",
                date, day.temp_max, day.humidity
            ),
        ));
    }

    if day.temperature_swing() > TEMPERATURE_SWING_C {
        hazards.push(Hazard::new(
            HazardKind::TemperatureSwing,
            format!(
                "Large temperature swing on {}: {:.1}°C to {:.1}°C. Monitor crops for stress.",
                date, day.temp_min, day.temp_max
            ),
        ));
    }

    hazards
}
