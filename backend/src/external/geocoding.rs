//! Forward geocoding: place name to coordinates.
//! Uses a Nominatim-compatible search endpoint.

use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::types::GpsCoordinates;
use std::str::FromStr;

use crate::config::GeocodingConfig;

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[allow(dead_code)]
    display_name: Option<String>,
}

/// Geocoding API client
#[derive(Clone)]
pub struct GeocodingClient {
    client: Client,
    base_url: String,
}

impl GeocodingClient {
    pub fn new(config: &GeocodingConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_endpoint.clone(),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
        }
    }

    /// Coordinates of the best match for `place`.
    /// Returns `None` on failure, timeout or no match.
    pub async fn locate(&self, place: &str) -> Option<GpsCoordinates> {
        let response = match self
            .client
            .get(&self.base_url)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Geocoding request for {:?} failed: {}", place, e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("Geocoding returned status {}", response.status());
            return None;
        }

        let places: Vec<NominatimPlace> = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Geocoding parse error: {}", e);
                return None;
            }
        };

        let best = places.into_iter().next()?;
        let latitude = Decimal::from_str(best.lat.trim()).ok()?;
        let longitude = Decimal::from_str(best.lon.trim()).ok()?;

        tracing::info!("Geocoded {:?} to {},{}", place, latitude, longitude);
        Some(GpsCoordinates::new(latitude, longitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn first_match_wins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Eldoret"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"lat": "0.5143", "lon": "35.2698", "display_name": "Eldoret, Kenya"},
                {"lat": "1.0", "lon": "2.0", "display_name": "Elsewhere"}
            ])))
            .mount(&server)
            .await;

        let coords = GeocodingClient::with_base_url(&server.uri())
            .locate("Eldoret")
            .await
            .unwrap();
        assert_eq!(coords.latitude, Decimal::new(5143, 4));
        assert_eq!(coords.longitude, Decimal::new(352698, 4));
    }

    #[tokio::test]
    async fn no_match_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(GeocodingClient::with_base_url(&server.uri())
            .locate("Atlantis")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn server_error_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(GeocodingClient::with_base_url(&server.uri())
            .locate("Eldoret")
            .await
            .is_none());
    }
}
