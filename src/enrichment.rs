//! Enrichment pipeline for directory results
//!
//! 1. Weather attachment: one sequential weather lookup per record that has
//!    coordinates. Missing coordinates or a failed lookup leave `weather`
//!    null; a single failure never aborts the batch.
//! 2. Normalization: dotted directory keys become a `NormalizedSchool`.
//!    Unknown keys are dropped.
//!
//! Output order always matches input order.

use crate::models::{NormalizedSchool, RawSchoolRecord, Weather};
use crate::tools::{CurrentConditions, WeatherService};
use serde_json::{json, Value};
use tracing::{info, warn};

pub const NAME_KEY: &str = "school.name";
pub const CITY_KEY: &str = "school.city";
pub const STATE_KEY: &str = "school.state";
pub const LATITUDE_KEY: &str = "location.lat";
pub const LONGITUDE_KEY: &str = "location.lon";
pub const ACCEPTANCE_RATE_KEY: &str = "latest.admissions.admission_rate.overall";
pub const TUITION_IN_STATE_KEY: &str = "latest.cost.tuition.in_state";
pub const TUITION_OUT_OF_STATE_KEY: &str = "latest.cost.tuition.out_of_state";
pub const WEATHER_KEY: &str = "weather";

impl From<&CurrentConditions> for Weather {
    fn from(current: &CurrentConditions) -> Self {
        Weather {
            temperature_celsius: current.temperature_2m,
            wind_speed_kmh: current.wind_speed_10m,
        }
    }
}

/// Weather attachment followed by normalization.
pub async fn enrich_schools(
    records: Vec<RawSchoolRecord>,
    weather: &dyn WeatherService,
) -> Vec<NormalizedSchool> {
    info!(count = records.len(), "Enriching schools with weather data");

    attach_weather(records, weather)
        .await
        .iter()
        .map(normalize_school)
        .collect()
}

/// Sets the `weather` key on every record, null when unavailable.
pub async fn attach_weather(
    mut records: Vec<RawSchoolRecord>,
    weather: &dyn WeatherService,
) -> Vec<RawSchoolRecord> {
    for record in records.iter_mut() {
        let school_name = record
            .get(NAME_KEY)
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();

        let attached = match coordinates(record) {
            Some((lat, lon)) => match weather.current_conditions(lat, lon).await {
                Ok(current) => {
                    let mapped = Weather::from(&current);
                    info!(school = %school_name, ?mapped, "Weather fetched");
                    json!(mapped)
                }
                Err(e) => {
                    warn!(school = %school_name, error = %e, "Failed to fetch weather");
                    Value::Null
                }
            },
            None => {
                warn!(school = %school_name, "No coordinates found");
                Value::Null
            }
        };

        record.insert(WEATHER_KEY.to_string(), attached);
    }

    records
}

fn coordinates(record: &RawSchoolRecord) -> Option<(f64, f64)> {
    let lat = record.get(LATITUDE_KEY).and_then(Value::as_f64)?;
    let lon = record.get(LONGITUDE_KEY).and_then(Value::as_f64)?;
    Some((lat, lon))
}

/// Map a dotted-key record onto the canonical school shape.
pub fn normalize_school(record: &RawSchoolRecord) -> NormalizedSchool {
    let text = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_string);
    let whole_number = |key: &str| {
        record.get(key).and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
        })
    };

    let weather = record
        .get(WEATHER_KEY)
        .and_then(Value::as_object)
        .map(|w| Weather {
            temperature_celsius: w.get("temperature_celsius").and_then(Value::as_f64),
            wind_speed_kmh: w.get("wind_speed_kmh").and_then(Value::as_f64),
        });

    NormalizedSchool {
        name: text(NAME_KEY).unwrap_or_else(|| "Unknown".to_string()),
        city: text(CITY_KEY).unwrap_or_default(),
        state: text(STATE_KEY).unwrap_or_default(),
        acceptance_rate: record.get(ACCEPTANCE_RATE_KEY).and_then(Value::as_f64),
        tuition_in_state: whole_number(TUITION_IN_STATE_KEY),
        tuition_out_of_state: whole_number(TUITION_OUT_OF_STATE_KEY),
        weather,
    }
}
