//! Integration tests for bcp-ta API endpoints
//!
//! Each test builds the router over a fresh temp-dir database and drives it
//! with `oneshot` requests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bcp_common::db::init_database;
use bcp_common::events::BcpEvent;
use bcp_ta::config::TaConfig;
use bcp_ta::{build_router, AppState};
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: state over a fresh database
async fn setup_state() -> (TempDir, AppState) {
    let dir = TempDir::new().expect("Should create temp dir");
    let pool = init_database(&dir.path().join("bcp.db"))
        .await
        .expect("Should initialize database");
    let state = AppState::initialize(pool, TaConfig::default())
        .await
        .expect("Should initialize state");
    (dir, state)
}

fn app(state: &AppState) -> Router {
    build_router(state.clone())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn register_provincia_agent(state: &AppState, first_name: &str) -> Value {
    let response = app(state)
        .oneshot(send_json(
            "POST",
            "/api/agents",
            json!({
                "first_name": first_name,
                "last_name": "Ferri",
                "email": format!("{}@budgetcasa.it", first_name.to_lowercase()),
                "skills": ["relationship_building", "persistence"],
                "experience": "senior"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    extract_json(response.into_body()).await
}

async fn import_sample_leads(state: &AppState) -> Value {
    let response = app(state)
        .oneshot(send_json(
            "POST",
            "/api/leads/import",
            json!([
                {"first_name": "Aldo", "last_name": "Moro", "email": "aldo@example.it", "cap": "20131"},
                {"first_name": "Aldo", "last_name": "Moro", "email": "ALDO@example.it", "cap": "20131"},
                {"business_name": "Dott. Livia Sala", "phone": "02 555 0101", "cap": "20121"},
                {"first_name": "X", "last_name": "Y"}
            ]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, state) = setup_state().await;

    let response = app(&state).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "bcp-ta");
    assert!(body["version"].is_string());
    assert_eq!(body["territories"], 6);
    assert_eq!(body["agents"], 0);
    assert_eq!(body["leads"], 0);

    import_sample_leads(&state).await;
    let response = app(&state).oneshot(get("/health")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["leads"], 2);
}

// =============================================================================
// Events
// =============================================================================

#[tokio::test]
async fn test_event_stream_delivers_events() {
    let (_dir, state) = setup_state().await;

    let response = app(&state).oneshot(get("/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    // The handler subscribed before returning, so this event reaches the stream
    state.event_bus.emit_lossy(BcpEvent::LeadsImported {
        imported: 3,
        duplicates: 0,
        rejected: 0,
        timestamp: chrono::Utc::now(),
    });

    let mut frames = response.into_body().into_data_stream();
    let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .expect("Should receive a frame before the heartbeat")
        .expect("Stream should stay open")
        .expect("Frame should be readable");
    let text = String::from_utf8_lossy(&frame);
    assert!(text.contains("event: LeadsImported"), "frame was {:?}", text);
    assert!(text.contains("\"imported\":3"));
}

// =============================================================================
// Territories
// =============================================================================

#[tokio::test]
async fn test_list_territories() {
    let (_dir, state) = setup_state().await;

    let response = app(&state).oneshot(get("/api/territories")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["default_id"], "provincia");
    let territories = body["territories"].as_array().unwrap();
    assert_eq!(territories.len(), 6);
    assert_eq!(territories[0]["id"], "centro_premium");
    assert_eq!(territories[0]["priority"], "high");
}

// =============================================================================
// Agents
// =============================================================================

#[tokio::test]
async fn test_register_and_list_agents() {
    let (_dir, state) = setup_state().await;

    let agent = register_provincia_agent(&state, "Nadia").await;
    assert_eq!(agent["languages"], json!(["italian"]));
    assert_eq!(agent["max_leads"], 100);
    assert_eq!(agent["status"], "active");

    let response = app(&state).oneshot(get("/api/agents")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["agents"][0]["first_name"], "Nadia");
}

#[tokio::test]
async fn test_register_invalid_agent_is_bad_request() {
    let (_dir, state) = setup_state().await;

    let response = app(&state)
        .oneshot(send_json(
            "POST",
            "/api/agents",
            json!({"first_name": "Nadia", "last_name": "Ferri", "max_leads": 0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_set_agent_status() {
    let (_dir, state) = setup_state().await;
    let agent = register_provincia_agent(&state, "Nadia").await;
    let id = agent["id"].as_str().unwrap();

    let response = app(&state)
        .oneshot(send_json(
            "PUT",
            &format!("/api/agents/{}/status", id),
            json!({"status": "busy"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["old_status"], "active");
    assert_eq!(body["new_status"], "busy");
}

#[tokio::test]
async fn test_unknown_agent_is_not_found() {
    let (_dir, state) = setup_state().await;
    let missing = uuid::Uuid::new_v4();

    let response = app(&state)
        .oneshot(send_json(
            "PUT",
            &format!("/api/agents/{}/status", missing),
            json!({"status": "busy"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app(&state)
        .oneshot(get(&format!("/api/agents/{}/stats", missing)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_agent_status_is_json_bad_request() {
    let (_dir, state) = setup_state().await;
    let agent = register_provincia_agent(&state, "Nadia").await;
    let id = agent["id"].as_str().unwrap();

    let response = app(&state)
        .oneshot(send_json(
            "PUT",
            &format!("/api/agents/{}/status", id),
            json!({"status": "retired"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].as_str().unwrap().contains("retired"));
}

#[tokio::test]
async fn test_agent_missing_required_field_is_json_bad_request() {
    let (_dir, state) = setup_state().await;

    let response = app(&state)
        .oneshot(send_json("POST", "/api/agents", json!({"first_name": "OnlyFirst"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].as_str().unwrap().contains("last_name"));

    let response = app(&state).oneshot(get("/api/agents")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_malformed_agent_id_is_json_bad_request() {
    let (_dir, state) = setup_state().await;

    let response = app(&state)
        .oneshot(get("/api/agents/not-a-uuid/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// =============================================================================
// Leads
// =============================================================================

#[tokio::test]
async fn test_import_and_search_leads() {
    let (_dir, state) = setup_state().await;

    let summary = import_sample_leads(&state).await;
    assert_eq!(summary["imported"], 2);
    assert_eq!(summary["duplicates"], 1);
    assert_eq!(summary["rejected"], 1);

    let response = app(&state)
        .oneshot(get("/api/leads?zone=Centro"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["leads"][0]["first_name"], "Livia");
    assert_eq!(body["leads"][0]["last_name"], "Sala");
    assert_eq!(body["leads"][0]["status"], "new");

    let response = app(&state)
        .oneshot(get("/api/leads?min_quality=60&status=new"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_lead_status_transitions() {
    let (_dir, state) = setup_state().await;
    import_sample_leads(&state).await;

    let response = app(&state).oneshot(get("/api/leads")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let id = body["leads"][0]["id"].as_str().unwrap().to_string();

    // New leads cannot skip assignment
    let response = app(&state)
        .oneshot(send_json(
            "PUT",
            &format!("/api/leads/{}/status", id),
            json!({"status": "contacted"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app(&state)
        .oneshot(send_json(
            "PUT",
            &format!("/api/leads/{}/status", id),
            json!({"status": "assigned"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app(&state)
        .oneshot(send_json(
            "PUT",
            &format!("/api/leads/{}/status", id),
            json!({"status": "not_interested"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "not_interested");
}

// =============================================================================
// Assignments and reports
// =============================================================================

#[tokio::test]
async fn test_run_assignments_and_reports() {
    let (_dir, state) = setup_state().await;
    let agent = register_provincia_agent(&state, "Nadia").await;
    import_sample_leads(&state).await;

    let response = app(&state)
        .oneshot(send_json("POST", "/api/assignments/run?min_quality=0", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = extract_json(response.into_body()).await;
    assert_eq!(report["considered"], 2);
    assert_eq!(report["successful"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["by_territory"]["provincia"], 1);
    assert_eq!(report["unassigned"][0]["territory_id"], "centro_premium");

    let id = agent["id"].as_str().unwrap();
    let response = app(&state)
        .oneshot(get(&format!("/api/agents/{}/stats", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = extract_json(response.into_body()).await;
    assert_eq!(stats["total_leads"], 1);
    assert_eq!(stats["agent"]["current_leads"], 1);
    assert_eq!(stats["total_revenue"], 4000.0);

    let response = app(&state)
        .oneshot(get("/api/reports/territories"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let territories = extract_json(response.into_body()).await;
    let provincia = territories
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["territory_id"] == "provincia")
        .unwrap()
        .clone();
    assert_eq!(provincia["lead_count"], 1);
    assert_eq!(provincia["assigned_count"], 1);
    assert_eq!(provincia["assignment_percentage"], 100.0);
}

#[tokio::test]
async fn test_malformed_lead_id_is_rejected() {
    let (_dir, state) = setup_state().await;

    let response = app(&state)
        .oneshot(send_json(
            "PUT",
            "/api/leads/not-a-uuid/status",
            json!({"status": "invalid"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_bad_query_parameter_is_json_bad_request() {
    let (_dir, state) = setup_state().await;

    let response = app(&state)
        .oneshot(get("/api/leads?min_quality=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// =============================================================================
// Export
// =============================================================================

async fn body_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

#[tokio::test]
async fn test_export_agent_leads_as_csv() {
    let (_dir, state) = setup_state().await;
    let agent = register_provincia_agent(&state, "Nadia").await;
    import_sample_leads(&state).await;

    app(&state)
        .oneshot(send_json("POST", "/api/assignments/run?min_quality=0", json!({})))
        .await
        .unwrap();

    let id = agent["id"].as_str().unwrap();
    let response = app(&state)
        .oneshot(get(&format!("/api/leads/export?agent_id={}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/csv; charset=utf-8"
    );
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"leads_export_"));

    let csv = body_text(response.into_body()).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("id,first_name,last_name"));
    assert!(lines[1].contains(",Aldo,Moro,aldo@example.it,"));
    assert!(lines[1].contains(id));
}

#[tokio::test]
async fn test_export_territory_as_json() {
    let (_dir, state) = setup_state().await;
    import_sample_leads(&state).await;

    let response = app(&state)
        .oneshot(get("/api/leads/export?territory_id=centro_premium&format=json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_leads"], 1);
    assert_eq!(body["leads"][0]["last_name"], "Sala");
    assert!(body["exported_at"].is_string());

    let response = app(&state)
        .oneshot(get("/api/leads/export?min_quality=60&format=json"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_leads"], 2);
}

#[tokio::test]
async fn test_export_rejects_bad_parameters() {
    let (_dir, state) = setup_state().await;

    let response = app(&state)
        .oneshot(get("/api/leads/export?agent_id=nobody"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let response = app(&state)
        .oneshot(get("/api/leads/export?territory_id=atlantis"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app(&state)
        .oneshot(get("/api/leads/export?format=xml"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
