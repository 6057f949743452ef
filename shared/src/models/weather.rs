//! Weather data models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The three weather factors crops are scored against.
///
/// Only constructible from finite values, so holding one means the
/// observation is usable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Conditions {
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
}

impl Conditions {
    pub fn new(temperature: f64, humidity: f64, rainfall: f64) -> Option<Self> {
        if temperature.is_finite() && humidity.is_finite() && rainfall.is_finite() {
            Some(Self {
                temperature,
                humidity,
                rainfall,
            })
        } else {
            None
        }
    }
}

/// A normalized weather reading for one location and date.
///
/// `temperature` and `humidity` are `None` when the provider did not report
/// them. Rainfall defaults to zero when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherObservation {
    pub date: NaiveDate,
    /// °C
    pub temperature: Option<f64>,
    /// Relative humidity, %
    pub humidity: Option<f64>,
    /// mm
    #[serde(default)]
    pub rainfall: f64,
    /// km/h
    pub wind_speed: Option<f64>,
    /// hPa
    pub pressure: Option<f64>,
    pub description: Option<String>,
    pub location_name: Option<String>,
}

impl WeatherObservation {
    /// The scoring inputs, or `None` if any of them is unavailable
    pub fn conditions(&self) -> Option<Conditions> {
        Conditions::new(self.temperature?, self.humidity?, self.rainfall)
    }

    pub fn is_available(&self) -> bool {
        self.conditions().is_some()
    }
}

/// One calendar day of forecast, aggregated from the provider's intraday slots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastDay {
    pub date: NaiveDate,
    /// Lowest temperature of the day, °C
    pub temp_min: f64,
    /// Highest temperature of the day, °C
    pub temp_max: f64,
    /// Mean temperature, °C
    pub temperature: f64,
    /// Mean relative humidity, %
    pub humidity: f64,
    /// Total precipitation, mm
    pub rainfall: f64,
    /// Strongest wind, km/h
    pub wind_speed: f64,
    pub pressure: Option<f64>,
    /// Highest probability of precipitation, 0-100
    pub precipitation_probability: f64,
    pub description: String,
}

impl ForecastDay {
    pub fn conditions(&self) -> Option<Conditions> {
        Conditions::new(self.temperature, self.humidity, self.rainfall)
    }

    /// Daily temperature range, °C
    pub fn temperature_swing(&self) -> f64 {
        self.temp_max - self.temp_min
    }

    /// View this forecast day as an observation so it can be scored like
    /// current conditions.
    pub fn to_observation(&self, location_name: Option<String>) -> WeatherObservation {
        WeatherObservation {
            date: self.date,
            temperature: Some(self.temperature),
            humidity: Some(self.humidity),
            rainfall: self.rainfall,
            wind_speed: Some(self.wind_speed),
            pressure: self.pressure,
            description: Some(self.description.clone()),
            location_name,
        }
    }
}

/// Where a stored weather record came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeatherSource {
    Api,
    Manual,
}

impl WeatherSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherSource::Api => "api",
            WeatherSource::Manual => "manual",
        }
    }
}
