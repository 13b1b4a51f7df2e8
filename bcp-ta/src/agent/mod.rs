//! Sales agents and the in-memory registry

pub mod registry;
pub mod types;

pub use registry::AgentRegistry;
pub use types::{Agent, AgentProfile, AgentStatus, ExperienceTier};
