//! Core data models for the college advisor

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Flat directory record keyed by dotted field paths (`school.name`, `location.lat`, ...).
pub type RawSchoolRecord = serde_json::Map<String, Value>;

pub const NOT_UNDERSTOOD_MESSAGE: &str = "Sorry, I couldn't understand your query.";

//
// ================= Intent =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    SchoolSearch,
    Comparison,
    GeneralAdvice,
    Requirements,
    #[serde(other)]
    OffTopic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentIntent {
    pub intent: IntentKind,
    #[serde(default)]
    pub school_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    pub confidence_score: f32,
}

impl StudentIntent {
    /// Strict JSON schema handed to the model as the structured-output contract.
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "intent": {
                    "type": "string",
                    "enum": ["school_search", "comparison", "general_advice", "requirements", "off_topic"],
                    "description": "Intent type"
                },
                "school_name": {
                    "type": ["string", "null"],
                    "description": "Full school name if mentioned (expand abbreviations like UWash -> University of Washington)"
                },
                "state": {
                    "type": ["string", "null"],
                    "description": "Two-letter US state code if mentioned (e.g., WA, CA, TX)"
                },
                "confidence_score": {
                    "type": "number",
                    "description": "Confidence 0-1: >0.7 for explicit college queries, 0.5-0.7 for implicit, <0.5 for off-topic"
                }
            },
            "required": ["intent", "school_name", "state", "confidence_score"],
            "additionalProperties": false
        })
    }
}

//
// ================= Schools =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Weather {
    pub temperature_celsius: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedSchool {
    pub name: String,
    pub city: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuition_in_state: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuition_out_of_state: Option<i64>,
    #[serde(default)]
    pub weather: Option<Weather>,
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvisorResponse {
    pub response: String,
    #[serde(default)]
    pub schools: Option<Vec<NormalizedSchool>>,
}

impl AdvisorResponse {
    /// Neutral reply used when the intent gate rejects a query.
    pub fn not_understood() -> Self {
        Self {
            response: NOT_UNDERSTOOD_MESSAGE.to_string(),
            schools: Some(Vec::new()),
        }
    }

    pub fn schools(&self) -> &[NormalizedSchool] {
        self.schools.as_deref().unwrap_or_default()
    }

    pub fn json_schema() -> Value {
        let nullable_number = json!({ "type": ["number", "null"] });
        let nullable_integer = json!({ "type": ["integer", "null"] });

        json!({
            "type": "object",
            "properties": {
                "response": {
                    "type": "string",
                    "description": "Natural language advice to the student"
                },
                "schools": {
                    "type": ["array", "null"],
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "city": { "type": "string" },
                            "state": { "type": "string" },
                            "acceptance_rate": nullable_number,
                            "tuition_in_state": nullable_integer,
                            "tuition_out_of_state": nullable_integer,
                            "weather": {
                                "type": ["object", "null"],
                                "properties": {
                                    "temperature_celsius": nullable_number,
                                    "wind_speed_kmh": nullable_number
                                },
                                "required": ["temperature_celsius", "wind_speed_kmh"],
                                "additionalProperties": false
                            }
                        },
                        "required": [
                            "name", "city", "state", "acceptance_rate",
                            "tuition_in_state", "tuition_out_of_state", "weather"
                        ],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["response", "schools"],
            "additionalProperties": false
        })
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentKind::SchoolSearch => "school_search",
            IntentKind::Comparison => "comparison",
            IntentKind::GeneralAdvice => "general_advice",
            IntentKind::Requirements => "requirements",
            IntentKind::OffTopic => "off_topic",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for NormalizedSchool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {}) | Acceptance: ", self.name, self.city, self.state)?;
        match self.acceptance_rate {
            Some(rate) => write!(f, "{:.1}%", rate * 100.0),
            None => write!(f, "N/A"),
        }
    }
}

/// Console rendering: the advice, then one bullet per school.
impl fmt::Display for AdvisorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.response)?;
        if !self.schools().is_empty() {
            write!(f, "\n\nSchools:")?;
            for school in self.schools() {
                write!(f, "\n  - {}", school)?;
            }
        }
        Ok(())
    }
}
