//! Assignment batch endpoint

use crate::assignment::AssignmentReport;
use crate::{ApiResult, AppState};
use super::extract::ApiQuery;
use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

/// Optional overrides of the configured batch options
#[derive(Debug, Default, Deserialize)]
pub struct RunBatchParams {
    pub limit: Option<u32>,
    pub min_quality: Option<u8>,
}

/// POST /api/assignments/run
///
/// Routes queued leads to agents and returns the batch report. Batches run
/// one at a time; a second request waits for the first to finish.
pub async fn run_assignments(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<RunBatchParams>,
) -> ApiResult<Json<AssignmentReport>> {
    let options = state
        .config
        .batch_options(&state.db, params.limit, params.min_quality)
        .await;
    let report = state.engine.run_batch(options).await?;
    Ok(Json(report))
}

pub fn assignment_routes() -> Router<AppState> {
    Router::new().route("/api/assignments/run", post(run_assignments))
}
