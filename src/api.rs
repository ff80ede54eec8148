//! REST API server for the college advisor
//!
//! POST /advisor runs one advise call; GET /health reports liveness.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::agent::AdvisorAgent;
use crate::models::{AdvisorResponse, NormalizedSchool};
use crate::Result;

/// =============================
/// Request / Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdvisorRequest {
    pub student_input: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AdvisorReply {
    pub response: String,
    pub schools: Vec<NormalizedSchool>,
}

impl From<AdvisorResponse> for AdvisorReply {
    fn from(advice: AdvisorResponse) -> Self {
        Self {
            response: advice.response,
            schools: advice.schools.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<AdvisorAgent>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Advisor Endpoint
/// =============================

async fn advisor_endpoint(
    State(state): State<ApiState>,
    Json(req): Json<AdvisorRequest>,
) -> Response {
    info!("Received advisor request: {}", req.student_input);

    match state.agent.advise(&req.student_input).await {
        Ok(Some(advice)) => (StatusCode::OK, Json(AdvisorReply::from(advice))).into_response(),
        Ok(None) => {
            info!("Query not understood");
            (
                StatusCode::OK,
                Json(AdvisorReply::from(AdvisorResponse::not_understood())),
            )
                .into_response()
        }
        Err(e) => {
            error!("Advisor request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorDetail {
                    detail: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(agent: Arc<AdvisorAgent>) -> Router {
    let state = ApiState { agent };

    Router::new()
        .route("/health", get(health))
        .route("/advisor", post(advisor_endpoint))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(agent: Arc<AdvisorAgent>, port: u16) -> Result<()> {
    let router = create_router(agent);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
