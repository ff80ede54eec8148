//! Tool definitions presented to the model

use super::{GET_WEATHER, SEARCH_COLLEGES, STATE_SEARCH_COLLEGES};
use serde_json::{json, Value};

/// Chat-completions `tools` array for every tool the dispatcher handles.
pub fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "type": "function",
            "function": {
                "name": SEARCH_COLLEGES,
                "description": "Search for colleges by name and/or state using College Scorecard data. Use this for specific school searches (e.g., 'UWash', 'University of Washington') or when the student mentions schools by name or abbreviation. Can filter by state.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "school_name": {
                            "type": "string",
                            "description": "Name or partial name of the college to search for (e.g., 'University of Washington', 'Washington')"
                        },
                        "state": {
                            "type": "string",
                            "description": "Two-letter U.S. state code (e.g., 'WA', 'CA')"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of results to return (default: 3, increase for broader searches)"
                        }
                    },
                    "required": [],
                    "additionalProperties": false
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": STATE_SEARCH_COLLEGES,
                "description": "Search for colleges within a U.S. state. Optionally filter by acceptance rate, in-state tuition, or average SAT score using range strings like '0.3..0.7'. Use this when the student names a state or region, or states qualifications to filter on.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "state": {
                            "type": "string",
                            "description": "Two-letter U.S. state code (e.g., 'FL', 'CA')"
                        },
                        "school_name": {
                            "type": "string",
                            "description": "Optional school name filter"
                        },
                        "acceptance_rate_range": {
                            "type": "string",
                            "description": "Acceptance rate range using min..max format (example: '0.3..0.6')"
                        },
                        "in_state_tuition_range": {
                            "type": "string",
                            "description": "In-state tuition range in USD using min..max (example: '8000..20000')"
                        },
                        "sat_score_range": {
                            "type": "string",
                            "description": "Average SAT score range using min..max (example: '1200..1400')"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of results to return (default: 5)"
                        }
                    },
                    "required": ["state"],
                    "additionalProperties": false
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": GET_WEATHER,
                "description": "Get current temperature and wind for a college location (use AFTER finding colleges to provide student life context). Requires latitude and longitude coordinates.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "latitude": {
                            "type": "number",
                            "description": "Latitude coordinate of the location"
                        },
                        "longitude": {
                            "type": "number",
                            "description": "Longitude coordinate of the location"
                        }
                    },
                    "required": ["latitude", "longitude"],
                    "additionalProperties": false
                }
            }
        }),
    ]
}
