//! Tools the model may call, and the dispatcher that runs them
//!
//! The tool set is closed: every name in the schema handed to the model
//! maps to one `AdvisorTool` variant, and dispatch is an exhaustive match.
//! Arguments are validated against the declared parameter schema before
//! any gateway is contacted.

use crate::error::AdvisorError;
use crate::llm::ToolCall;
use crate::models::RawSchoolRecord;
use crate::Result;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

pub mod schema;
pub mod scorecard;
pub mod weather;

pub use schema::tool_definitions;
pub use scorecard::{CollegeDirectory, ScorecardClient};
pub use weather::{CurrentConditions, WeatherClient, WeatherService};

pub const SEARCH_COLLEGES: &str = "search_colleges";
pub const STATE_SEARCH_COLLEGES: &str = "state_search_colleges";
pub const GET_WEATHER: &str = "get_weather";

pub const DEFAULT_SEARCH_LIMIT: u32 = 3;
pub const DEFAULT_STATE_SEARCH_LIMIT: u32 = 5;
/// Largest page the directory serves.
pub const MAX_RESULT_LIMIT: u32 = 100;

//
// ================= Arguments =================
//

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchCollegesArgs {
    #[serde(default)]
    pub school_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "deserialize_limit")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSearchArgs {
    pub state: String,
    #[serde(default)]
    pub school_name: Option<String>,
    #[serde(default)]
    pub acceptance_rate_range: Option<ValueRange>,
    #[serde(default)]
    pub in_state_tuition_range: Option<ValueRange>,
    #[serde(default)]
    pub sat_score_range: Option<ValueRange>,
    #[serde(default, deserialize_with = "deserialize_limit")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherArgs {
    pub latitude: f64,
    pub longitude: f64,
}

impl SearchCollegesArgs {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }
}

impl StateSearchArgs {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_STATE_SEARCH_LIMIT)
    }
}

/// Per-tool checks beyond what the types enforce. May normalize values in place.
trait ToolArgs: DeserializeOwned {
    fn validate(&mut self) -> std::result::Result<(), String>;
}

impl ToolArgs for SearchCollegesArgs {
    fn validate(&mut self) -> std::result::Result<(), String> {
        self.school_name = non_blank(self.school_name.take());
        self.state = match non_blank(self.state.take()) {
            Some(state) => Some(normalize_state(&state)?),
            None => None,
        };
        check_limit(self.limit)
    }
}

impl ToolArgs for StateSearchArgs {
    fn validate(&mut self) -> std::result::Result<(), String> {
        self.state = normalize_state(&self.state)?;
        self.school_name = non_blank(self.school_name.take());
        check_limit(self.limit)
    }
}

impl ToolArgs for WeatherArgs {
    fn validate(&mut self) -> std::result::Result<(), String> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("latitude {} outside [-90, 90]", self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("longitude {} outside [-180, 180]", self.longitude));
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_state(state: &str) -> std::result::Result<String, String> {
    let code = state.trim();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(format!("state must be a two-letter code, got '{}'", state))
    }
}

fn check_limit(limit: Option<u32>) -> std::result::Result<(), String> {
    match limit {
        Some(0) => Err("limit must be at least 1".to_string()),
        Some(n) if n > MAX_RESULT_LIMIT => {
            Err(format!("limit must be at most {}, got {}", MAX_RESULT_LIMIT, n))
        }
        _ => Ok(()),
    }
}

/// Accepts an integer, an integral float, or a numeric string.
fn deserialize_limit<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(int) = n.as_u64() {
                return u32::try_from(int).map(Some).map_err(de::Error::custom);
            }
            match n.as_f64() {
                Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => {
                    Ok(Some(f as u32))
                }
                _ => Err(de::Error::custom(format!("invalid limit {}", n))),
            }
        }
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid limit '{}'", s))),
        Some(other) => Err(de::Error::custom(format!("invalid limit {}", other))),
    }
}

/// Directory range filter, written `min..max`. Either bound may be omitted.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct ValueRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl FromStr for ValueRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (lo, hi) = s
            .trim()
            .split_once("..")
            .ok_or_else(|| format!("range '{}' must use min..max format", s))?;

        let bound = |raw: &str| -> std::result::Result<Option<f64>, String> {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| format!("range '{}' has a non-numeric bound '{}'", s, raw))
        };

        let range = Self {
            min: bound(lo)?,
            max: bound(hi)?,
        };

        match (range.min, range.max) {
            (None, None) => Err(format!("range '{}' needs at least one bound", s)),
            (Some(min), Some(max)) if min > max => {
                Err(format!("range '{}' has min greater than max", s))
            }
            _ => Ok(range),
        }
    }
}

impl TryFrom<String> for ValueRange {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(min) = self.min {
            write!(f, "{}", min)?;
        }
        write!(f, "..")?;
        if let Some(max) = self.max {
            write!(f, "{}", max)?;
        }
        Ok(())
    }
}

//
// ================= Tools =================
//

#[derive(Debug, Clone, PartialEq)]
pub enum AdvisorTool {
    SearchColleges(SearchCollegesArgs),
    StateSearchColleges(StateSearchArgs),
    GetWeather(WeatherArgs),
}

impl AdvisorTool {
    /// Resolve a model tool call into a validated tool invocation.
    pub fn from_call(name: &str, arguments: &Value) -> Result<Self> {
        match name {
            SEARCH_COLLEGES => Ok(AdvisorTool::SearchColleges(parse_args(name, arguments)?)),
            STATE_SEARCH_COLLEGES => {
                Ok(AdvisorTool::StateSearchColleges(parse_args(name, arguments)?))
            }
            GET_WEATHER => Ok(AdvisorTool::GetWeather(parse_args(name, arguments)?)),
            other => {
                error!(tool = other, "Unknown tool requested");
                Err(AdvisorError::ToolNotFound(other.to_string()))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdvisorTool::SearchColleges(_) => SEARCH_COLLEGES,
            AdvisorTool::StateSearchColleges(_) => STATE_SEARCH_COLLEGES,
            AdvisorTool::GetWeather(_) => GET_WEATHER,
        }
    }
}

fn parse_args<T: ToolArgs>(tool: &str, arguments: &Value) -> Result<T> {
    if !arguments.is_object() {
        return Err(AdvisorError::InvalidToolInput(format!(
            "{}: expected an object of arguments, got {}",
            tool, arguments
        )));
    }

    let mut args: T = serde_json::from_value(arguments.clone())
        .map_err(|e| AdvisorError::InvalidToolInput(format!("{}: {}", tool, e)))?;

    args.validate()
        .map_err(|e| AdvisorError::InvalidToolInput(format!("{}: {}", tool, e)))?;

    Ok(args)
}

/// What a dispatched tool produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Schools(Vec<RawSchoolRecord>),
    Weather(CurrentConditions),
}

//
// ================= Dispatcher =================
//

pub struct ToolDispatcher {
    directory: Arc<dyn CollegeDirectory>,
    weather: Arc<dyn WeatherService>,
}

impl ToolDispatcher {
    pub fn new(directory: Arc<dyn CollegeDirectory>, weather: Arc<dyn WeatherService>) -> Self {
        Self { directory, weather }
    }

    pub fn weather_service(&self) -> &dyn WeatherService {
        self.weather.as_ref()
    }

    /// Validate and run one model tool call.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolOutput> {
        let tool = AdvisorTool::from_call(&call.name, &call.arguments)?;
        self.run(&tool).await
    }

    pub async fn run(&self, tool: &AdvisorTool) -> Result<ToolOutput> {
        info!(tool = tool.name(), "Executing tool");

        let output = match tool {
            AdvisorTool::SearchColleges(args) => {
                ToolOutput::Schools(self.directory.search_colleges(args).await?)
            }
            AdvisorTool::StateSearchColleges(args) => {
                ToolOutput::Schools(self.directory.search_colleges_by_state(args).await?)
            }
            AdvisorTool::GetWeather(args) => ToolOutput::Weather(
                self.weather
                    .current_conditions(args.latitude, args.longitude)
                    .await?,
            ),
        };

        info!(tool = tool.name(), "Tool executed successfully");
        Ok(output)
    }
}
