//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::{db, ApiResult, AppState};

/// Liveness plus a glance at the agent pool, lead table and catalog
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub agents: usize,
    pub leads: i64,
    pub territories: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let leads = db::leads::count_leads(&state.db).await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        module: "bcp-ta".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        agents: state.registry().len().await,
        leads,
        territories: state.engine.catalog().len(),
    }))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
