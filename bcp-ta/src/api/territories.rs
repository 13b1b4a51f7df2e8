//! Territory catalog endpoint

use crate::territory::TerritoryCatalog;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};

/// GET /api/territories
///
/// **Response:** `{"territories": [...], "default_id": "provincia"}`
pub async fn list_territories(State(state): State<AppState>) -> Json<TerritoryCatalog> {
    Json(state.engine.catalog().clone())
}

pub fn territory_routes() -> Router<AppState> {
    Router::new().route("/api/territories", get(list_territories))
}
