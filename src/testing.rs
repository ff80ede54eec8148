//! In-process fakes for the model and gateway traits

use crate::error::AdvisorError;
use crate::llm::{Completion, CompletionRequest, LanguageModel, ToolCall};
use crate::models::RawSchoolRecord;
use crate::tools::{CollegeDirectory, CurrentConditions, SearchCollegesArgs, StateSearchArgs, WeatherService};
use crate::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned completions in order and records every request.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Completion>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Completion>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AdvisorError::LlmError("no scripted completion left".to_string()))
    }
}

pub fn intent_reply(intent: &str, confidence: f32) -> Completion {
    Completion::text(
        json!({
            "intent": intent,
            "school_name": null,
            "state": null,
            "confidence_score": confidence
        })
        .to_string(),
    )
}

pub fn tool_call_reply(calls: Vec<(&str, &str, Value)>) -> Completion {
    Completion {
        content: None,
        tool_calls: calls
            .into_iter()
            .map(|(id, name, arguments)| ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments,
            })
            .collect(),
    }
}

/// Directory record with a name and optional coordinates.
pub fn school(name: &str, coords: Option<(f64, f64)>) -> RawSchoolRecord {
    let mut record = RawSchoolRecord::new();
    record.insert("school.name".to_string(), json!(name));
    if let Some((lat, lon)) = coords {
        record.insert("location.lat".to_string(), json!(lat));
        record.insert("location.lon".to_string(), json!(lon));
    }
    record
}

pub struct StubDirectory {
    results: Vec<RawSchoolRecord>,
    fail: bool,
    searches: Mutex<Vec<String>>,
}

impl StubDirectory {
    pub fn new(results: Vec<RawSchoolRecord>) -> Self {
        Self {
            results,
            fail: false,
            searches: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    /// `search:<name>` or `state:<code>` per call, in call order.
    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    fn respond(&self, label: String) -> Result<Vec<RawSchoolRecord>> {
        self.searches.lock().unwrap().push(label);
        if self.fail {
            return Err(AdvisorError::GatewayError(
                "College Scorecard returned 500 Internal Server Error".to_string(),
            ));
        }
        Ok(self.results.clone())
    }
}

#[async_trait]
impl CollegeDirectory for StubDirectory {
    async fn search_colleges(&self, args: &SearchCollegesArgs) -> Result<Vec<RawSchoolRecord>> {
        self.respond(format!("search:{}", args.school_name.as_deref().unwrap_or("")))
    }

    async fn search_colleges_by_state(&self, args: &StateSearchArgs) -> Result<Vec<RawSchoolRecord>> {
        self.respond(format!("state:{}", args.state))
    }
}

/// Fixed conditions everywhere except at one failing latitude.
pub struct StubWeather {
    failing_latitude: Option<f64>,
    lookups: Mutex<usize>,
}

impl StubWeather {
    pub fn new() -> Self {
        Self {
            failing_latitude: None,
            lookups: Mutex::new(0),
        }
    }

    pub fn failing_at(latitude: f64) -> Self {
        Self {
            failing_latitude: Some(latitude),
            lookups: Mutex::new(0),
        }
    }

    pub fn conditions() -> CurrentConditions {
        CurrentConditions {
            temperature_2m: Some(12.5),
            wind_speed_10m: Some(8.0),
            ..Default::default()
        }
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl WeatherService for StubWeather {
    async fn current_conditions(&self, latitude: f64, _longitude: f64) -> Result<CurrentConditions> {
        *self.lookups.lock().unwrap() += 1;
        if self.failing_latitude == Some(latitude) {
            return Err(AdvisorError::GatewayError("Weather service error: 502".to_string()));
        }
        Ok(Self::conditions())
    }
}
