//! Intent Classifier
//!
//! Asks the language model whether a student query is college-related and,
//! if so, what kind of help it wants:
//! - school_search, comparison, general_advice, requirements
//! - off_topic for everything else
//!
//! The returned confidence score feeds the advisor's intent gate.

use crate::llm::{ChatMessage, CompletionRequest, LanguageModel, ResponseFormat};
use crate::models::StudentIntent;
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

const INTENT_INSTRUCTIONS: &str = r#"You are analyzing student queries about college admissions.
Extract the student's intent and provide a confidence score (0-1).

Valid college-related intents include:
- 'school_search': Looking for specific schools by name, location, or characteristics
- 'comparison': Comparing schools or asking about options
- 'general_advice': Seeking guidance on college selection, admissions, requirements
- 'requirements': Asking about acceptance rates, SAT scores, competitiveness
Anything else is 'off_topic'.

Recognize queries even when implicit:
- 'dream schools', 'reach schools', 'safety schools'
- School abbreviations like 'UW', 'UWash', 'UCLA', 'MIT'
- 'higher requirements', 'competitive', 'selective'
- Location mentions: states, cities, regions

Set confidence_score high (>0.7) if clearly college-related, moderate (0.5-0.7) if implicit
or abbreviation-based, and low (<0.5) for off-topic or ambiguous input.
Extract school_name if mentioned (expand abbreviations to full names when obvious).
Extract state as 2-letter code if mentioned (e.g., WA for Washington)."#;

pub struct IntentClassifier {
    model: Arc<dyn LanguageModel>,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// One structured model call. Transport and parse failures propagate.
    pub async fn classify(&self, query: &str) -> Result<StudentIntent> {
        info!("Extracting student intent");

        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(INTENT_INSTRUCTIONS),
                ChatMessage::user(query),
            ],
            tools: Vec::new(),
            response_format: Some(ResponseFormat {
                name: "student_intent",
                schema: StudentIntent::json_schema(),
            }),
        };

        let completion = self.model.complete(request).await?;
        let mut intent: StudentIntent = completion.parse()?;

        if !(0.0..=1.0).contains(&intent.confidence_score) {
            warn!(
                confidence = intent.confidence_score,
                "Model returned confidence outside [0, 1], clamping"
            );
            intent.confidence_score = if intent.confidence_score.is_nan() {
                0.0
            } else {
                intent.confidence_score.clamp(0.0, 1.0)
            };
        }

        info!(
            intent = %intent.intent,
            confidence = intent.confidence_score,
            school = ?intent.school_name,
            state = ?intent.state,
            "Intent extracted"
        );

        Ok(intent)
    }
}
