//! College Scorecard directory gateway
//!
//! Single GET per search with server-side filtering. Results come back as
//! flat records keyed by dotted field paths.

use super::{SearchCollegesArgs, StateSearchArgs, ValueRange};
use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::models::RawSchoolRecord;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

const SEARCH_FIELDS: &str = "school.name,school.city,school.state,\
location.lat,location.lon,\
latest.admissions.admission_rate.overall,\
latest.cost.tuition.in_state,\
latest.cost.tuition.out_of_state";

const STATE_SEARCH_FIELDS: &str = "school.name,school.city,school.state,\
location.lat,location.lon,\
latest.admissions.admission_rate.overall,\
latest.admissions.sat_scores.average.overall,\
latest.cost.tuition.in_state,\
latest.earnings.6_yrs_after_entry.median";

const ACCEPTANCE_RANGE_PARAM: &str = "latest.admissions.admission_rate.overall__range";
const TUITION_RANGE_PARAM: &str = "latest.cost.tuition.in_state__range";
const SAT_RANGE_PARAM: &str = "latest.admissions.sat_scores.average.overall__range";

#[async_trait]
pub trait CollegeDirectory: Send + Sync {
    async fn search_colleges(&self, args: &SearchCollegesArgs) -> Result<Vec<RawSchoolRecord>>;

    async fn search_colleges_by_state(&self, args: &StateSearchArgs) -> Result<Vec<RawSchoolRecord>>;
}

#[derive(Debug, Deserialize)]
struct DirectoryResponse {
    results: Vec<RawSchoolRecord>,
}

pub struct ScorecardClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ScorecardClient {
    pub fn new(client: Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub fn from_config(client: Client, config: &AdvisorConfig) -> Self {
        Self::new(
            client,
            config.scorecard_url.clone(),
            config.scorecard_api_key.clone(),
        )
    }

    fn search_params(&self, args: &SearchCollegesArgs) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("fields", SEARCH_FIELDS.to_string()),
            ("per_page", args.limit().to_string()),
        ];

        if let Some(name) = &args.school_name {
            params.push(("school.name", name.clone()));
        }
        if let Some(state) = &args.state {
            params.push(("school.state", state.clone()));
        }

        params
    }

    fn state_search_params(&self, args: &StateSearchArgs) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("fields", STATE_SEARCH_FIELDS.to_string()),
            ("school.state", args.state.clone()),
            ("per_page", args.limit().to_string()),
        ];

        if let Some(name) = &args.school_name {
            params.push(("school.name", name.clone()));
        }

        let ranges: [(&'static str, Option<ValueRange>); 3] = [
            (ACCEPTANCE_RANGE_PARAM, args.acceptance_rate_range),
            (TUITION_RANGE_PARAM, args.in_state_tuition_range),
            (SAT_RANGE_PARAM, args.sat_score_range),
        ];
        for (param, range) in ranges {
            if let Some(range) = range {
                params.push((param, range.to_string()));
            }
        }

        params
    }

    async fn fetch(&self, params: &[(&'static str, String)]) -> Result<Vec<RawSchoolRecord>> {
        info!("Calling College Scorecard API");

        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                // request URL carries the api key
                AdvisorError::GatewayError(format!(
                    "College Scorecard request failed: {}",
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::GatewayError(format!(
                "College Scorecard returned {}: {}",
                status, body
            )));
        }

        let payload: DirectoryResponse = response.json().await.map_err(|e| {
            AdvisorError::GatewayError(format!(
                "Invalid College Scorecard response: {}",
                e.without_url()
            ))
        })?;

        info!(count = payload.results.len(), "College Scorecard returned schools");
        Ok(payload.results)
    }
}

#[async_trait]
impl CollegeDirectory for ScorecardClient {
    async fn search_colleges(&self, args: &SearchCollegesArgs) -> Result<Vec<RawSchoolRecord>> {
        debug!(
            school_name = ?args.school_name,
            state = ?args.state,
            limit = args.limit(),
            "search_colleges called"
        );
        self.fetch(&self.search_params(args)).await
    }

    async fn search_colleges_by_state(&self, args: &StateSearchArgs) -> Result<Vec<RawSchoolRecord>> {
        debug!(
            state = %args.state,
            acceptance = ?args.acceptance_rate_range.map(|r| r.to_string()),
            tuition = ?args.in_state_tuition_range.map(|r| r.to_string()),
            sat = ?args.sat_score_range.map(|r| r.to_string()),
            "state_search_colleges called"
        );
        self.fetch(&self.state_search_params(args)).await
    }
}
