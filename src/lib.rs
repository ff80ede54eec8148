//! College Advisor Agent
//!
//! A conversational college advisor that:
//! - Gates each query behind a structured intent classification
//! - Lets the model plan College Scorecard and weather tool calls
//! - Enriches every school result with current weather at its campus
//! - Returns a structured answer with normalized school records
//!
//! LOOP:
//! INPUT → INTENT_CHECK → TOOL_PLANNING → TOOL_EXECUTION → ENRICH → FINALIZE

pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod llm;
pub mod models;
pub mod tools;

#[cfg(test)]
mod testing;

pub use error::Result;

// Re-export common types
pub use agent::AdvisorAgent;
pub use config::AdvisorConfig;
pub use error::AdvisorError;
pub use models::*;
