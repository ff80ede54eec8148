//! Advisor agent - the orchestration loop
//!
//! START → INTENT_CHECK → {REJECTED | TOOL_PLANNING}
//!       → {TOOL_EXECUTION → ENRICH →} FINALIZE → DONE

use crate::classifier::IntentClassifier;
use crate::config::AdvisorConfig;
use crate::enrichment::enrich_schools;
use crate::llm::{ChatMessage, CompletionRequest, LanguageModel, OpenAiClient, ResponseFormat, ToolCall};
use crate::models::AdvisorResponse;
use crate::tools::{tool_definitions, ScorecardClient, ToolDispatcher, ToolOutput, WeatherClient};
use crate::Result;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

const ADVISOR_INSTRUCTIONS: &str = r#"You are a college advisor helping students find suitable colleges.
When students mention their GPA, SAT scores, or test scores, USE THOSE as filters in your search.
For example: '1600 SAT' → use the sat_score_range parameter when searching by state.
When students mention in-state tuition budgets, use in_state_tuition_range (e.g. '0..25000').
When students mention 'dream schools', 'reach schools', 'top universities', or 'competitive',
use acceptance_rate_range='0..0.5' (0-50% acceptance) to cast a wide net.
ONLY use very restrictive ranges like '0..0.2' if they specifically say 'most selective' or 'hardest to get into'.
School abbreviations: UW/UWash = University of Washington; expand UCLA, MIT, and similar names before searching.
Each school result includes: name, location, acceptance rate, tuition, and current weather.
Provide comprehensive advice considering all factors, including student life, weather,
and the student's stated qualifications."#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Start,
    IntentCheck,
    Rejected,
    ToolPlanning,
    ToolExecution,
    Enrich,
    Finalize,
    Done,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentState::Start => "START",
            AgentState::IntentCheck => "INTENT_CHECK",
            AgentState::Rejected => "REJECTED",
            AgentState::ToolPlanning => "TOOL_PLANNING",
            AgentState::ToolExecution => "TOOL_EXECUTION",
            AgentState::Enrich => "ENRICH",
            AgentState::Finalize => "FINALIZE",
            AgentState::Done => "DONE",
        };
        write!(f, "{}", s)
    }
}

fn transition(state: &mut AgentState, next: AgentState) {
    debug!(from = %state, to = %next, "Advisor state transition");
    *state = next;
}

/// Serialize a tool result for the conversation, substituting an error
/// payload if serialization fails.
fn serialize_tool_result<T: Serialize>(result: &T) -> String {
    serde_json::to_string(result).unwrap_or_else(|e| {
        error!("Tool result serialization error: {}", e);
        serde_json::json!({ "error": format!("Serialization failed: {}", e) }).to_string()
    })
}

pub struct AdvisorAgent {
    model: Arc<dyn LanguageModel>,
    classifier: IntentClassifier,
    dispatcher: ToolDispatcher,
    confidence_threshold: f32,
}

impl AdvisorAgent {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        dispatcher: ToolDispatcher,
        confidence_threshold: f32,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(model.clone()),
            model,
            dispatcher,
            confidence_threshold,
        }
    }

    /// Wire the production model client and gateways over one pooled HTTP client.
    pub fn from_config(config: &AdvisorConfig) -> Result<Self> {
        let http = config.http_client()?;

        let model = Arc::new(OpenAiClient::from_config(http.clone(), config));
        let dispatcher = ToolDispatcher::new(
            Arc::new(ScorecardClient::from_config(http.clone(), config)),
            Arc::new(WeatherClient::from_config(http, config)),
        );

        Ok(Self::new(model, dispatcher, config.confidence_threshold))
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Answer one student query.
    ///
    /// `Ok(None)` means the intent gate rejected the query; it is not an error.
    pub async fn advise(&self, student_input: &str) -> Result<Option<AdvisorResponse>> {
        let span = info_span!("advise", request_id = %Uuid::new_v4());
        self.run(student_input).instrument(span).await
    }

    async fn run(&self, student_input: &str) -> Result<Option<AdvisorResponse>> {
        let mut state = AgentState::Start;
        info!(input = %student_input, "Advisor agent started");

        // === INTENT_CHECK ===
        transition(&mut state, AgentState::IntentCheck);
        let intent = self.classifier.classify(student_input).await?;

        if intent.confidence_score < self.confidence_threshold {
            transition(&mut state, AgentState::Rejected);
            warn!(
                confidence = intent.confidence_score,
                threshold = self.confidence_threshold,
                "Gate check failed: low confidence intent"
            );
            return Ok(None);
        }

        info!(
            intent = %intent.intent,
            confidence = intent.confidence_score,
            "Gate check passed"
        );

        // === TOOL_PLANNING ===
        transition(&mut state, AgentState::ToolPlanning);
        let mut messages = vec![
            ChatMessage::system(ADVISOR_INSTRUCTIONS),
            ChatMessage::user(student_input),
        ];

        let planning = self
            .model
            .complete(CompletionRequest {
                messages: messages.clone(),
                tools: tool_definitions(),
                response_format: None,
            })
            .await?;

        let tool_calls = planning.tool_calls.clone();
        messages.push(planning.into_message());

        // === TOOL_EXECUTION ===
        if tool_calls.is_empty() {
            info!("No tools required");
        } else {
            info!(count = tool_calls.len(), "Model requested tool call(s)");
        }

        for call in &tool_calls {
            transition(&mut state, AgentState::ToolExecution);
            let content = self.execute_tool_call(call, &mut state).await?;
            messages.push(ChatMessage::tool_result(call.id.clone(), content));
        }

        // === FINALIZE ===
        transition(&mut state, AgentState::Finalize);
        info!("Sending tool results back to the model");

        let final_completion = self
            .model
            .complete(CompletionRequest {
                messages,
                tools: Vec::new(),
                response_format: Some(ResponseFormat {
                    name: "advisor_response",
                    schema: AdvisorResponse::json_schema(),
                }),
            })
            .await?;

        let response: AdvisorResponse = final_completion.parse()?;

        transition(&mut state, AgentState::Done);
        info!(
            schools = response.schools().len(),
            "Final response generated"
        );

        Ok(Some(response))
    }

    /// Dispatch one tool call and return the tool-result message content.
    async fn execute_tool_call(&self, call: &ToolCall, state: &mut AgentState) -> Result<String> {
        debug!(call_id = %call.id, tool = %call.name, arguments = %call.arguments, "Dispatching tool call");

        match self.dispatcher.execute(call).await? {
            ToolOutput::Schools(records) => {
                // === ENRICH ===
                transition(state, AgentState::Enrich);
                let schools = enrich_schools(records, self.dispatcher.weather_service()).await;
                if let Some(first) = schools.first() {
                    debug!(sample = ?first, "Sample normalized result");
                }
                Ok(serialize_tool_result(&schools))
            }
            ToolOutput::Weather(current) => Ok(serialize_tool_result(&current)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisorError;
    use crate::llm::Completion;
    use crate::models::{NormalizedSchool, Weather};
    use crate::testing::{intent_reply, school, tool_call_reply, ScriptedModel, StubDirectory, StubWeather};
    use crate::tools::{GET_WEATHER, SEARCH_COLLEGES, STATE_SEARCH_COLLEGES};
    use serde_json::{json, Value};

    fn agent_with(
        model: Arc<ScriptedModel>,
        directory: Arc<StubDirectory>,
        weather: Arc<StubWeather>,
    ) -> AdvisorAgent {
        AdvisorAgent::new(model, ToolDispatcher::new(directory, weather), 0.7)
    }

    fn final_reply(response: &str, schools: Value) -> Completion {
        Completion::text(json!({ "response": response, "schools": schools }).to_string())
    }

    fn tool_messages(request: &CompletionRequest) -> Vec<(String, String)> {
        request
            .messages
            .iter()
            .filter_map(|m| match m {
                ChatMessage::Tool { tool_call_id, content } => {
                    Some((tool_call_id.clone(), content.clone()))
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_low_confidence_is_rejected_without_planning() {
        for confidence in [0.0, 0.3, 0.69] {
            let model = Arc::new(ScriptedModel::new(vec![intent_reply("off_topic", confidence)]));
            let directory = Arc::new(StubDirectory::new(vec![]));
            let agent = agent_with(model.clone(), directory.clone(), Arc::new(StubWeather::new()));

            let result = agent.advise("asdfghjkl").await.unwrap();

            assert!(result.is_none());
            assert_eq!(model.requests().len(), 1, "only the intent call may be issued");
            assert!(directory.searches().is_empty());
        }
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let model = Arc::new(ScriptedModel::new(vec![
            intent_reply("general_advice", 0.7),
            Completion::text("Happy to help."),
            final_reply("Start by listing what matters to you.", Value::Null),
        ]));
        let agent = agent_with(model.clone(), Arc::new(StubDirectory::new(vec![])), Arc::new(StubWeather::new()));

        let response = agent.advise("How do I pick a college?").await.unwrap().unwrap();

        assert_eq!(response.response, "Start by listing what matters to you.");
        assert!(response.schools.is_none());

        let requests = model.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].tools.len(), 3, "planning call carries the tool schema");
        assert!(requests[1].response_format.is_none());
        assert!(requests[2].tools.is_empty());
        assert_eq!(requests[2].response_format.as_ref().map(|f| f.name), Some("advisor_response"));
        assert_eq!(
            requests[2].messages.last(),
            Some(&ChatMessage::Assistant { content: Some("Happy to help.".to_string()), tool_calls: vec![] })
        );
    }

    #[tokio::test]
    async fn test_show_me_mit_scenario() {
        let model = Arc::new(ScriptedModel::new(vec![
            intent_reply("school_search", 0.95),
            tool_call_reply(vec![("call_mit", SEARCH_COLLEGES, json!({ "school_name": "MIT" }))]),
            final_reply(
                "MIT is a highly selective research university in Cambridge.",
                json!([{
                    "name": "Massachusetts Institute of Technology",
                    "city": "Cambridge",
                    "state": "MA",
                    "acceptance_rate": 0.04,
                    "tuition_in_state": null,
                    "tuition_out_of_state": null,
                    "weather": { "temperature_celsius": 12.5, "wind_speed_kmh": 8.0 }
                }]),
            ),
        ]));
        let directory = Arc::new(StubDirectory::new(vec![school(
            "Massachusetts Institute of Technology",
            Some((42.3592, -71.0932)),
        )]));
        let weather = Arc::new(StubWeather::new());
        let agent = agent_with(model.clone(), directory.clone(), weather.clone());

        let response = agent.advise("Show me MIT").await.unwrap().unwrap();

        assert!(!response.response.is_empty());
        assert_eq!(response.schools().len(), 1);
        assert_eq!(directory.searches(), vec!["search:MIT".to_string()]);
        assert_eq!(weather.lookups(), 1);

        let requests = model.requests();
        assert_eq!(requests.len(), 3);

        let tool_results = tool_messages(&requests[2]);
        assert_eq!(tool_results.len(), 1);
        assert_eq!(tool_results[0].0, "call_mit");

        let sent: Vec<NormalizedSchool> = serde_json::from_str(&tool_results[0].1).unwrap();
        assert_eq!(sent[0].name, "Massachusetts Institute of Technology");
        assert_eq!(sent[0].weather, Some(Weather::from(&StubWeather::conditions())));
        assert!(!tool_results[0].1.contains("school.name"));

        // assistant tool-call turn precedes its result
        let roles: Vec<&str> = requests[2].messages.iter().map(ChatMessage::role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);
    }

    #[tokio::test]
    async fn test_tool_calls_run_sequentially_in_order_without_dedup() {
        let model = Arc::new(ScriptedModel::new(vec![
            intent_reply("comparison", 0.9),
            tool_call_reply(vec![
                ("call_1", STATE_SEARCH_COLLEGES, json!({ "state": "WA", "acceptance_rate_range": "0..0.5" })),
                ("call_2", SEARCH_COLLEGES, json!({ "school_name": "Gonzaga" })),
                ("call_3", STATE_SEARCH_COLLEGES, json!({ "state": "WA", "acceptance_rate_range": "0..0.5" })),
                ("call_4", GET_WEATHER, json!({ "latitude": 47.6, "longitude": -122.3 })),
            ]),
            final_reply("Here are some options.", json!([])),
        ]));
        let directory = Arc::new(StubDirectory::new(vec![school("Whitman College", None)]));
        let weather = Arc::new(StubWeather::new());
        let agent = agent_with(model.clone(), directory.clone(), weather.clone());

        agent.advise("Compare dream schools in WA with Gonzaga").await.unwrap().unwrap();

        assert_eq!(
            directory.searches(),
            vec!["state:WA".to_string(), "search:Gonzaga".to_string(), "state:WA".to_string()]
        );
        // schools without coordinates get no lookup; only the explicit get_weather call hits the service
        assert_eq!(weather.lookups(), 1);

        let tool_results = tool_messages(&model.requests()[2]);
        let ids: Vec<&str> = tool_results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["call_1", "call_2", "call_3", "call_4"]);

        let weather_payload: Value = serde_json::from_str(&tool_results[3].1).unwrap();
        assert_eq!(weather_payload["temperature_2m"], 12.5);
    }

    #[tokio::test]
    async fn test_weather_failure_degrades_one_school() {
        let model = Arc::new(ScriptedModel::new(vec![
            intent_reply("school_search", 0.9),
            tool_call_reply(vec![("call_1", STATE_SEARCH_COLLEGES, json!({ "state": "PA" }))]),
            final_reply("Three Pennsylvania options.", json!([])),
        ]));
        let directory = Arc::new(StubDirectory::new(vec![
            school("First College", Some((40.1, -75.1))),
            school("Broken College", Some((40.0, -75.0))),
            school("Third College", Some((40.2, -75.2))),
        ]));
        let agent = agent_with(model.clone(), directory, Arc::new(StubWeather::failing_at(40.0)));

        let response = agent.advise("Colleges in Pennsylvania").await;
        assert!(response.is_ok());

        let tool_results = tool_messages(&model.requests()[2]);
        let sent: Vec<NormalizedSchool> = serde_json::from_str(&tool_results[0].1).unwrap();
        assert!(sent[0].weather.is_some());
        assert!(sent[1].weather.is_none());
        assert!(sent[2].weather.is_some());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fatal() {
        let model = Arc::new(ScriptedModel::new(vec![
            intent_reply("school_search", 0.9),
            tool_call_reply(vec![("call_1", "get_rankings", json!({}))]),
        ]));
        let agent = agent_with(model.clone(), Arc::new(StubDirectory::new(vec![])), Arc::new(StubWeather::new()));

        let err = agent.advise("Top ranked schools").await.unwrap_err();

        assert!(matches!(err, AdvisorError::ToolNotFound(ref name) if name == "get_rankings"));
        assert_eq!(model.requests().len(), 2, "no final call after a fatal tool error");
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_fatal() {
        let model = Arc::new(ScriptedModel::new(vec![
            intent_reply("school_search", 0.9),
            tool_call_reply(vec![("call_1", STATE_SEARCH_COLLEGES, json!({ "school_name": "UW" }))]),
        ]));
        let directory = Arc::new(StubDirectory::new(vec![]));
        let agent = agent_with(model, directory.clone(), Arc::new(StubWeather::new()));

        let err = agent.advise("UW please").await.unwrap_err();

        assert!(matches!(err, AdvisorError::InvalidToolInput(_)));
        assert!(directory.searches().is_empty());
    }

    #[tokio::test]
    async fn test_directory_failure_is_fatal() {
        let model = Arc::new(ScriptedModel::new(vec![
            intent_reply("school_search", 0.9),
            tool_call_reply(vec![("call_1", SEARCH_COLLEGES, json!({ "school_name": "MIT" }))]),
        ]));
        let agent = agent_with(model, Arc::new(StubDirectory::failing()), Arc::new(StubWeather::new()));

        tokio_test::assert_err!(agent.advise("Show me MIT").await);
    }

    #[tokio::test]
    async fn test_classifier_failure_is_fatal() {
        let model = Arc::new(ScriptedModel::new(vec![Completion::text("garbage")]));
        let agent = agent_with(model, Arc::new(StubDirectory::new(vec![])), Arc::new(StubWeather::new()));

        let err = agent.advise("Show me MIT").await.unwrap_err();
        assert!(matches!(err, AdvisorError::LlmError(_)));
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot encode campus map"))
        }
    }

    #[test]
    fn test_serialization_failure_substitutes_error_payload() {
        let payload: Value = serde_json::from_str(&serialize_tool_result(&Unserializable)).unwrap();
        assert_eq!(payload["error"], "Serialization failed: cannot encode campus map");

        assert_eq!(serialize_tool_result(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(AgentState::IntentCheck.to_string(), "INTENT_CHECK");
        assert_eq!(AgentState::ToolExecution.to_string(), "TOOL_EXECUTION");
    }
}
