//! Advisor configuration
//!
//! Built once at process start and handed to each component's constructor.
//!
//! Environment variables:
//! - `OPENAI_API_KEY` - Required. Language-model API key.
//! - `OPENAI_MODEL` - Optional. Defaults to `gpt-5-nano`.
//! - `OPENAI_BASE_URL` - Optional. Chat-completions base URL.
//! - `COLLEGE_SCORECARD_API_KEY` - Required. College Scorecard API key.
//! - `COLLEGE_SCORECARD_URL` - Optional. Directory endpoint.
//! - `WEATHER_API_URL` - Optional. Open-Meteo forecast endpoint.
//! - `ADVISOR_CONFIDENCE_THRESHOLD` - Optional. Intent gate, defaults to `0.7`.
//! - `HTTP_TIMEOUT_SECS` - Optional. Outbound request timeout, defaults to `30`.
//! - `PORT` / `API_PORT` - Optional. Server port, defaults to `8000`.

use crate::error::AdvisorError;
use crate::Result;
use reqwest::Client;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-5-nano";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SCORECARD_URL: &str = "https://api.data.gov/ed/collegescorecard/v1/schools";
pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub openai_api_key: String,
    pub model: String,
    pub openai_base_url: String,
    pub scorecard_api_key: String,
    pub scorecard_url: String,
    pub weather_url: String,
    /// Queries classified below this confidence get no advice.
    pub confidence_threshold: f32,
    pub http_timeout: Duration,
    pub port: u16,
}

impl AdvisorConfig {
    /// Config with default endpoints and the given keys.
    pub fn new(openai_api_key: impl Into<String>, scorecard_api_key: impl Into<String>) -> Self {
        Self {
            openai_api_key: openai_api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            scorecard_api_key: scorecard_api_key.into(),
            scorecard_url: DEFAULT_SCORECARD_URL.to_string(),
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            http_timeout: Duration::from_secs(30),
            port: DEFAULT_PORT,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    AdvisorError::ConfigError(format!("Missing required environment variable: {}", key))
                })
        };

        let mut config = Self::new(required("OPENAI_API_KEY")?, required("COLLEGE_SCORECARD_API_KEY")?);

        if let Some(model) = lookup("OPENAI_MODEL") {
            config.model = model;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            config.openai_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("COLLEGE_SCORECARD_URL") {
            config.scorecard_url = url;
        }
        if let Some(url) = lookup("WEATHER_API_URL") {
            config.weather_url = url;
        }

        if let Some(raw) = lookup("ADVISOR_CONFIDENCE_THRESHOLD") {
            let threshold: f32 = parse_value("ADVISOR_CONFIDENCE_THRESHOLD", &raw)?;
            if !(0.0..=1.0).contains(&threshold) {
                return Err(AdvisorError::ConfigError(format!(
                    "ADVISOR_CONFIDENCE_THRESHOLD must be within [0, 1], got {}",
                    threshold
                )));
            }
            config.confidence_threshold = threshold;
        }

        if let Some(raw) = lookup("HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(parse_value("HTTP_TIMEOUT_SECS", &raw)?);
        }

        if let Some((key, raw)) = lookup("PORT")
            .map(|v| ("PORT", v))
            .or_else(|| lookup("API_PORT").map(|v| ("API_PORT", v)))
        {
            config.port = parse_value(key, &raw)?;
        }

        Ok(config)
    }

    /// Shared, connection-pooled client for the model and both gateways.
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| AdvisorError::ConfigError(format!("Failed to build HTTP client: {}", e)))
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        AdvisorError::ConfigError(format!("Invalid value for {}: {}", key, e))
    })
}
