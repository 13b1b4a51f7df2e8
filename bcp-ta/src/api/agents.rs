//! Agent endpoints

use crate::agent::{Agent, AgentProfile, AgentStatus};
use crate::reports::{agent_stats, AgentStats};
use crate::{ApiError, ApiResult, AppState};
use super::extract::{ApiJson, ApiPath};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use bcp_common::events::BcpEvent;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct AgentListResponse {
    pub agents: Vec<Agent>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: AgentStatus,
}

#[derive(Debug, Serialize)]
pub struct SetStatusResponse {
    pub agent_id: Uuid,
    pub old_status: AgentStatus,
    pub new_status: AgentStatus,
}

/// GET /api/agents
pub async fn list_agents(State(state): State<AppState>) -> Json<AgentListResponse> {
    let agents = state.registry().list().await;
    Json(AgentListResponse {
        count: agents.len(),
        agents,
    })
}

/// POST /api/agents
///
/// Registers a new agent, or replaces the profile of the agent with the same
/// id or email. Workload counters are preserved on replacement.
///
/// **Errors:** 400 for an invalid profile
pub async fn register_agent(
    State(state): State<AppState>,
    ApiJson(profile): ApiJson<AgentProfile>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    let agent = state.registry().register(&state.db, profile).await?;

    state.event_bus.emit_lossy(BcpEvent::AgentRegistered {
        agent_id: agent.id,
        display_name: agent.display_name(),
        timestamp: Utc::now(),
    });

    Ok((StatusCode::CREATED, Json(agent)))
}

/// PUT /api/agents/:id/status
///
/// **Request:** `{"status": "vacation"}`
pub async fn set_agent_status(
    State(state): State<AppState>,
    ApiPath(agent_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<SetStatusRequest>,
) -> ApiResult<Json<SetStatusResponse>> {
    let old_status = state
        .registry()
        .set_status(&state.db, agent_id, request.status)
        .await?;

    if old_status != request.status {
        state.event_bus.emit_lossy(BcpEvent::AgentStatusChanged {
            agent_id,
            old_status: old_status.to_string(),
            new_status: request.status.to_string(),
            timestamp: Utc::now(),
        });
    }

    Ok(Json(SetStatusResponse {
        agent_id,
        old_status,
        new_status: request.status,
    }))
}

/// GET /api/agents/:id/stats
pub async fn get_agent_stats(
    State(state): State<AppState>,
    ApiPath(agent_id): ApiPath<Uuid>,
) -> ApiResult<Json<AgentStats>> {
    match agent_stats(&state.db, state.registry(), agent_id).await {
        Ok(stats) => Ok(Json(stats)),
        Err(bcp_common::Error::NotFound(_)) => {
            Err(ApiError::NotFound(format!("Agent not found: {}", agent_id)))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn agent_routes() -> Router<AppState> {
    Router::new()
        .route("/api/agents", get(list_agents).post(register_agent))
        .route("/api/agents/:id/status", put(set_agent_status))
        .route("/api/agents/:id/stats", get(get_agent_stats))
}
