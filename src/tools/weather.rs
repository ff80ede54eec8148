//! Open-Meteo weather gateway

use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// The forecast's `current` object, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    #[serde(default)]
    pub temperature_2m: Option<f64>,
    #[serde(default)]
    pub wind_speed_10m: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[async_trait]
pub trait WeatherService: Send + Sync {
    async fn current_conditions(&self, latitude: f64, longitude: f64) -> Result<CurrentConditions>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentConditions>,
}

pub struct WeatherClient {
    client: Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn from_config(client: Client, config: &AdvisorConfig) -> Self {
        Self::new(client, config.weather_url.clone())
    }
}

#[async_trait]
impl WeatherService for WeatherClient {
    async fn current_conditions(&self, latitude: f64, longitude: f64) -> Result<CurrentConditions> {
        debug!(latitude, longitude, "Fetching current weather");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", "temperature_2m,wind_speed_10m".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AdvisorError::GatewayError(format!("Weather request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AdvisorError::GatewayError(format!("Weather service error: {}", e)))?;

        let forecast: ForecastResponse = response.json().await.map_err(|e| {
            AdvisorError::GatewayError(format!("Invalid weather response: {}", e))
        })?;

        forecast.current.ok_or_else(|| {
            AdvisorError::GatewayError("Weather response has no current conditions".to_string())
        })
    }
}
