//! bcp-ta library - territory assignment service
//!
//! Routes insurance leads to sales agents by territory, skills, workload and
//! track record, and exposes the pipeline over HTTP.

pub mod agent;
pub mod api;
pub mod assignment;
pub mod config;
pub mod db;
pub mod error;
pub mod lead;
pub mod reports;
pub mod routing;
pub mod territory;

pub use crate::error::{ApiError, ApiResult};

use crate::agent::AgentRegistry;
use crate::assignment::AssignmentEngine;
use crate::config::TaConfig;
use axum::Router;
use bcp_common::db::{get_setting_or, DEFAULT_EVENT_BUS_CAPACITY};
use bcp_common::events::EventBus;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Event bus feeding SSE clients
    pub event_bus: EventBus,
    pub engine: Arc<AssignmentEngine>,
    pub config: Arc<TaConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Build state from an initialized database and loaded configuration
    ///
    /// Loads the agent registry from the database and validates the territory
    /// catalog.
    pub async fn initialize(db: SqlitePool, config: TaConfig) -> bcp_common::Result<Self> {
        let capacity = get_setting_or(
            &db,
            "event_bus_capacity",
            DEFAULT_EVENT_BUS_CAPACITY.parse().unwrap_or(500usize),
        )
        .await;
        let event_bus = EventBus::new(capacity);

        let registry = AgentRegistry::load_from_db(&db).await?;
        let engine = AssignmentEngine::new(
            db.clone(),
            Arc::new(config.catalog()?),
            Arc::new(config.synonyms()),
            config.scoring.clone(),
            registry,
            event_bus.clone(),
        );

        Ok(Self {
            db,
            event_bus,
            engine: Arc::new(engine),
            config: Arc::new(config),
            startup_time: Utc::now(),
        })
    }

    pub fn registry(&self) -> &AgentRegistry {
        self.engine.registry()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .merge(api::territory_routes())
        .merge(api::agent_routes())
        .merge(api::lead_routes())
        .merge(api::assignment_routes())
        .merge(api::report_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
