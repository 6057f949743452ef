//! Topsoil properties from a SoilGrids-compatible API

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::models::SoilTexture;
use shared::types::GpsCoordinates;

use crate::config::SoilConfig;

const TOPSOIL_DEPTH: &str = "0-5cm";

/// Topsoil composition at a point
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SoilProfile {
    /// %
    pub sand: Option<f64>,
    /// %
    pub silt: Option<f64>,
    /// %
    pub clay: Option<f64>,
    /// pH in water
    pub ph: Option<f64>,
    /// USDA class, present when all three fractions are known
    pub texture: Option<SoilTexture>,
}

#[derive(Debug, Deserialize)]
struct SoilGridsResponse {
    properties: SoilGridsProperties,
}

#[derive(Debug, Deserialize)]
struct SoilGridsProperties {
    #[serde(default)]
    layers: Vec<SoilGridsLayer>,
}

#[derive(Debug, Deserialize)]
struct SoilGridsLayer {
    name: String,
    unit_measure: Option<UnitMeasure>,
    #[serde(default)]
    depths: Vec<SoilGridsDepth>,
}

#[derive(Debug, Deserialize)]
struct UnitMeasure {
    d_factor: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SoilGridsDepth {
    label: String,
    values: SoilGridsValues,
}

#[derive(Debug, Deserialize)]
struct SoilGridsValues {
    mean: Option<f64>,
}

impl SoilGridsLayer {
    /// Topsoil mean in conventional units
    fn topsoil_mean(&self) -> Option<f64> {
        let d_factor = self
            .unit_measure
            .as_ref()
            .and_then(|u| u.d_factor)
            .filter(|d| *d > 0.0)
            .unwrap_or(1.0);
        self.depths
            .iter()
            .find(|d| d.label == TOPSOIL_DEPTH)
            .and_then(|d| d.values.mean)
            .map(|v| v / d_factor)
    }
}

/// Soil API client
#[derive(Clone)]
pub struct SoilClient {
    client: Client,
    base_url: String,
}

impl SoilClient {
    pub fn new(config: &SoilConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
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

    /// Topsoil profile at `coords`, or `None` on any failure
    pub async fn topsoil(&self, coords: &GpsCoordinates) -> Option<SoilProfile> {
        let query = [
            ("lat", coords.latitude.to_string()),
            ("lon", coords.longitude.to_string()),
            ("property", "sand".to_string()),
            ("property", "silt".to_string()),
            ("property", "clay".to_string()),
            ("property", "phh2o".to_string()),
            ("depth", TOPSOIL_DEPTH.to_string()),
            ("value", "mean".to_string()),
        ];

        let response = match self.client.get(&self.base_url).query(&query).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Soil request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("Soil API returned status {}", response.status());
            return None;
        }

        let body: SoilGridsResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Soil response parse error: {}", e);
                return None;
            }
        };

        let profile = to_profile(&body.properties.layers);
        if profile.sand.is_none() && profile.silt.is_none() && profile.clay.is_none() && profile.ph.is_none() {
            tracing::debug!("No soil data at {},{}", coords.latitude, coords.longitude);
            return None;
        }
        Some(profile)
    }
}

fn to_profile(layers: &[SoilGridsLayer]) -> SoilProfile {
    let value = |name: &str| {
        layers
            .iter()
            .find(|l| l.name == name)
            .and_then(SoilGridsLayer::topsoil_mean)
    };

    let sand = value("sand");
    let silt = value("silt");
    let clay = value("clay");
    let texture = match (sand, silt, clay) {
        (Some(sa), Some(si), Some(cl)) => Some(SoilTexture::classify(sa, si, cl)),
        _ => None,
    };

    SoilProfile {
        sand,
        silt,
        clay,
        ph: value("phh2o"),
        texture,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn layer(name: &str, mean: Option<f64>) -> serde_json::Value {
        json!({
            "name": name,
            "unit_measure": {"d_factor": 10, "mapped_units": "g/kg"},
            "depths": [{"label": "0-5cm", "values": {"mean": mean}}]
        })
    }

    fn coords() -> GpsCoordinates {
        GpsCoordinates::new(Decimal::new(-1286, 3), Decimal::new(36817, 3))
    }

    #[tokio::test]
    async fn topsoil_is_scaled_and_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("depth", "0-5cm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"layers": [
                    layer("sand", Some(400.0)),
                    layer("silt", Some(400.0)),
                    layer("clay", Some(200.0)),
                    layer("phh2o", Some(65.0)),
                ]}
            })))
            .mount(&server)
            .await;

        let profile = SoilClient::with_base_url(&server.uri())
            .topsoil(&coords())
            .await
            .unwrap();
        assert_eq!(profile.sand, Some(40.0));
        assert_eq!(profile.clay, Some(20.0));
        assert_eq!(profile.ph, Some(6.5));
        assert_eq!(profile.texture, Some(SoilTexture::Loam));
    }

    #[tokio::test]
    async fn ocean_point_has_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"layers": [layer("sand", None), layer("phh2o", None)]}
            })))
            .mount(&server)
            .await;

        assert!(SoilClient::with_base_url(&server.uri())
            .topsoil(&coords())
            .await
            .is_none());
    }

    #[test]
    fn partial_fractions_skip_texture() {
        let layers: Vec<SoilGridsLayer> =
            serde_json::from_value(json!([layer("clay", Some(300.0))])).unwrap();
        let profile = to_profile(&layers);
        assert_eq!(profile.clay, Some(30.0));
        assert_eq!(profile.texture, None);
    }
}
