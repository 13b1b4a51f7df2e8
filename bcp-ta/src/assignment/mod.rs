//! Lead-to-agent assignment

pub mod engine;
pub mod report;

pub use engine::{AssignmentEngine, BatchOptions};
pub use report::{AssignmentReport, LeadOutcome, UnassignedLead};
