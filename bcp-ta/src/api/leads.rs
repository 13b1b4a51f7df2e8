//! Lead endpoints: search, export, import and pipeline updates

use crate::lead::export::to_csv_string;
use crate::lead::{
    export_leads, import_leads, search_leads, ExportFormat, ExportParams, ImportSummary, Lead,
    LeadExport, LeadFilter, LeadStatus, RawLead,
};
use crate::{ApiResult, AppState};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use bcp_common::events::BcpEvent;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub leads: Vec<Lead>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct LeadStatusRequest {
    pub status: LeadStatus,
}

/// GET /api/leads
///
/// Query parameters map onto `LeadFilter`, e.g.
/// `?status=new&zone=Centro&min_quality=60&limit=50`.
pub async fn list_leads(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<LeadFilter>,
) -> ApiResult<Json<LeadListResponse>> {
    let leads = search_leads(&state.db, &filter).await?;
    Ok(Json(LeadListResponse {
        count: leads.len(),
        leads,
    }))
}

/// GET /api/leads/export
///
/// `?agent_id=&territory_id=&min_quality=&status=&zone=&limit=&format=csv|json`
///
/// CSV (the default) is sent as an attachment; JSON wraps the leads with the
/// export time and count.
pub async fn export(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ExportParams>,
) -> ApiResult<Response> {
    let leads = export_leads(&state.db, state.engine.catalog(), &params).await?;

    match params.format {
        ExportFormat::Json => Ok(Json(LeadExport::new(leads)).into_response()),
        ExportFormat::Csv => {
            let body = to_csv_string(&leads)?;
            let disposition = format!(
                "attachment; filename=\"leads_export_{}.csv\"",
                Utc::now().format("%Y-%m-%d")
            );
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
    }
}

/// POST /api/leads/import
///
/// **Request:** JSON array of raw leads
/// **Response:** `{"imported": n, "duplicates": n, "rejected": n, "rejections": [...]}`
pub async fn import(
    State(state): State<AppState>,
    ApiJson(raws): ApiJson<Vec<RawLead>>,
) -> ApiResult<Json<ImportSummary>> {
    info!("Importing {} leads via API", raws.len());
    let summary = import_leads(&state.db, raws).await?;

    state.event_bus.emit_lossy(BcpEvent::LeadsImported {
        imported: summary.imported,
        duplicates: summary.duplicates,
        rejected: summary.rejected,
        timestamp: Utc::now(),
    });

    Ok(Json(summary))
}

/// PUT /api/leads/:id/status
///
/// **Errors:**
/// - 400: status `assigned` (set only by assignment batches)
/// - 404: unknown lead
/// - 409: transition not allowed from the current status
pub async fn set_lead_status(
    State(state): State<AppState>,
    ApiPath(lead_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<LeadStatusRequest>,
) -> ApiResult<Json<Lead>> {
    let lead = state
        .engine
        .update_lead_status(lead_id, request.status)
        .await?;
    Ok(Json(lead))
}

pub fn lead_routes() -> Router<AppState> {
    Router::new()
        .route("/api/leads", get(list_leads))
        .route("/api/leads/export", get(export))
        .route("/api/leads/import", post(import))
        .route("/api/leads/:id/status", put(set_lead_status))
}
