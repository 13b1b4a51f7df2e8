//! Report endpoints

use crate::reports::{territory_report, TerritoryReport};
use crate::{ApiResult, AppState};
use axum::{extract::State, routing::get, Json, Router};

/// GET /api/reports/territories
pub async fn get_territory_report(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TerritoryReport>>> {
    let report = territory_report(&state.db, state.engine.catalog()).await?;
    Ok(Json(report))
}

pub fn report_routes() -> Router<AppState> {
    Router::new().route("/api/reports/territories", get(get_territory_report))
}
