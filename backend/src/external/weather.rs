//! Weather API client for fetching weather data
//!
//! Integrates with OpenWeatherMap-compatible `/weather` and `/forecast`
//! endpoints and normalizes both into the shared weather models. Every public
//! method fails soft: problems are logged and reported as `None`.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared::models::{ForecastDay, WeatherObservation};
use shared::types::Location;
use thiserror::Error;

use crate::config::WeatherConfig;
use crate::external::retry::{with_retry, RetryPolicy};

/// m/s to km/h
const MPS_TO_KMH: f64 = 3.6;

const HOURS_PER_DAY: f64 = 24.0;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather API returned status {0}")]
    Status(u16),

    #[error("response is missing {0}")]
    MissingField(&'static str),
}

/// Weather API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

/// OpenWeatherMap API response for current weather
#[derive(Debug, Deserialize)]
struct OWMCurrentResponse {
    #[serde(default)]
    weather: Vec<OWMWeather>,
    main: Option<OWMMain>,
    wind: Option<OWMWind>,
    rain: Option<OWMRain>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OWMWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OWMMain {
    temp: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OWMWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OWMRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hour: Option<f64>,
}

impl OWMRain {
    /// Current rain rate as millimetres per day, the unit crop rainfall
    /// ranges and forecast days use
    fn daily_rate(&self) -> Option<f64> {
        self.one_hour
            .map(|mm| mm * HOURS_PER_DAY)
            .or_else(|| self.three_hour.map(|mm| mm * HOURS_PER_DAY / 3.0))
    }
}

/// OpenWeatherMap API response for forecast
#[derive(Debug, Deserialize)]
struct OWMForecastResponse {
    city: Option<OWMCity>,
    #[serde(default)]
    list: Vec<OWMForecastItem>,
}

#[derive(Debug, Deserialize)]
struct OWMCity {
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OWMForecastItem {
    dt: i64,
    main: OWMMain,
    #[serde(default)]
    weather: Vec<OWMWeather>,
    wind: Option<OWMWind>,
    pop: Option<f64>,
    rain: Option<OWMRain>,
}

impl WeatherClient {
    /// Create a client from configuration
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.api_endpoint.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from(&config.retry),
        })
    }

    /// Create a client with a custom base URL (for testing)
    #[cfg(test)]
    pub fn with_base_url(api_key: &str, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            retry,
        }
    }

    /// Observation for `location` on `date`.
    ///
    /// No date or today uses current conditions, a future date inside the
    /// forecast window uses that day's forecast, anything else has no data.
    pub async fn observe(
        &self,
        location: &Location,
        date: Option<NaiveDate>,
    ) -> Option<WeatherObservation> {
        self.observe_at(location, date, Utc::now().date_naive()).await
    }

    async fn observe_at(
        &self,
        location: &Location,
        date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Option<WeatherObservation> {
        match date {
            None => self.current(location).await,
            Some(d) if d == today => self.current(location).await,
            Some(d) if d > today => {
                let days = self.forecast(location).await?;
                let day = days.into_iter().find(|day| day.date == d);
                if day.is_none() {
                    tracing::debug!("{} is beyond the forecast window for {}", d, location);
                }
                day.map(|day| day.to_observation(Some(location.to_string())))
            }
            Some(d) => {
                tracing::debug!("No weather source for past date {}", d);
                None
            }
        }
    }

    /// Current conditions, or `None` on any failure
    pub async fn current(&self, location: &Location) -> Option<WeatherObservation> {
        match self.fetch_current(location).await {
            Ok(observation) => Some(observation),
            Err(e) => {
                tracing::warn!("Current weather for {} unavailable: {}", location, e);
                None
            }
        }
    }

    /// Daily forecast, or `None` on any failure
    pub async fn forecast(&self, location: &Location) -> Option<Vec<ForecastDay>> {
        match self.fetch_forecast(location).await {
            Ok(days) => Some(days),
            Err(e) => {
                tracing::warn!("Forecast for {} unavailable: {}", location, e);
                None
            }
        }
    }

    async fn fetch_current(&self, location: &Location) -> Result<WeatherObservation, WeatherError> {
        let data: OWMCurrentResponse = self.get_json("weather", location).await?;
        let main = data.main.ok_or(WeatherError::MissingField("main"))?;

        Ok(WeatherObservation {
            date: Utc::now().date_naive(),
            temperature: Some(main.temp.ok_or(WeatherError::MissingField("main.temp"))?),
            humidity: Some(main.humidity.ok_or(WeatherError::MissingField("main.humidity"))?),
            rainfall: data.rain.as_ref().and_then(OWMRain::daily_rate).unwrap_or(0.0),
            wind_speed: data.wind.and_then(|w| w.speed).map(|s| s * MPS_TO_KMH),
            pressure: main.pressure,
            description: data.weather.into_iter().next().map(|w| w.description),
            location_name: data.name.filter(|n| !n.is_empty()),
        })
    }

    async fn fetch_forecast(&self, location: &Location) -> Result<Vec<ForecastDay>, WeatherError> {
        let data: OWMForecastResponse = self.get_json("forecast", location).await?;
        let offset = data.city.as_ref().map(|c| c.timezone).unwrap_or(0);
        let days = aggregate_days(&data.list, offset);
        if days.is_empty() {
            return Err(WeatherError::MissingField("list"));
        }
        Ok(days)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        location: &Location,
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut query = location_query(location);
        query.push(("appid", self.api_key.clone()));
        query.push(("units", "metric".to_string()));

        let response = with_retry(&self.retry, || self.client.get(&url).query(&query).send()).await?;

        if !response.status().is_success() {
            return Err(WeatherError::Status(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }
}

fn location_query(location: &Location) -> Vec<(&'static str, String)> {
    match location {
        Location::Place { name } => vec![("q", name.clone())],
        Location::Coordinates(c) => vec![
            ("lat", c.latitude.to_string()),
            ("lon", c.longitude.to_string()),
        ],
    }
}

/// Fold 3-hour forecast slots into one record per local calendar date.
///
/// Slots without temperature or humidity are skipped.
fn aggregate_days(items: &[OWMForecastItem], utc_offset_secs: i32) -> Vec<ForecastDay> {
    let offset = FixedOffset::east_opt(utc_offset_secs).unwrap_or_else(|| Utc.fix());

    let mut by_date: BTreeMap<NaiveDate, Vec<&OWMForecastItem>> = BTreeMap::new();
    for item in items {
        if item.main.temp.is_none() || item.main.humidity.is_none() {
            continue;
        }
        if let Some(at) = DateTime::from_timestamp(item.dt, 0) {
            by_date
                .entry(at.with_timezone(&offset).date_naive())
                .or_default()
                .push(item);
        }
    }

    by_date
        .into_iter()
        .map(|(date, slots)| summarize_day(date, &slots))
        .collect()
}

fn summarize_day(date: NaiveDate, slots: &[&OWMForecastItem]) -> ForecastDay {
    let n = slots.len() as f64;
    let temps: Vec<f64> = slots.iter().filter_map(|s| s.main.temp).collect();

    let temp_min = slots
        .iter()
        .filter_map(|s| s.main.temp_min.or(s.main.temp))
        .fold(f64::INFINITY, f64::min);
    let temp_max = slots
        .iter()
        .filter_map(|s| s.main.temp_max.or(s.main.temp))
        .fold(f64::NEG_INFINITY, f64::max);

    let pressures: Vec<f64> = slots.iter().filter_map(|s| s.main.pressure).collect();
    let pressure = if pressures.is_empty() {
        None
    } else {
        Some(pressures.iter().sum::<f64>() / pressures.len() as f64)
    };

    ForecastDay {
        date,
        temp_min,
        temp_max,
        temperature: temps.iter().sum::<f64>() / n,
        humidity: slots.iter().filter_map(|s| s.main.humidity).sum::<f64>() / n,
        rainfall: slots
            .iter()
            .filter_map(|s| s.rain.as_ref().and_then(|r| r.three_hour))
            .sum(),
        wind_speed: slots
            .iter()
            .filter_map(|s| s.wind.as_ref().and_then(|w| w.speed))
            .fold(0.0, f64::max)
            * MPS_TO_KMH,
        pressure,
        precipitation_probability: slots.iter().filter_map(|s| s.pop).fold(0.0, f64::max) * 100.0,
        description: dominant_description(slots),
    }
}

/// Most frequent description; the earliest one wins a tie
fn dominant_description(slots: &[&OWMForecastItem]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for slot in slots {
        if let Some(w) = slot.weather.first() {
            match counts.iter_mut().find(|(d, _)| *d == w.description) {
                Some((_, n)) => *n += 1,
                None => counts.push((&w.description, 1)),
            }
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (description, n) in counts {
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((description, n));
        }
    }
    best.map(|(d, _)| d.to_string()).unwrap_or_default()
}
