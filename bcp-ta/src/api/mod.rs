//! HTTP API handlers for bcp-ta

pub mod agents;
pub mod assignments;
pub mod extract;
pub mod health;
pub mod leads;
pub mod reports;
pub mod sse;
pub mod territories;

pub use agents::agent_routes;
pub use assignments::assignment_routes;
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use health::health_routes;
pub use leads::lead_routes;
pub use reports::report_routes;
pub use sse::event_stream;
pub use territories::territory_routes;
