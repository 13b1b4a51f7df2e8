//! Assignment outcomes and batch reports

use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A lead left in the queue, with the reason
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnassignedLead {
    pub lead_id: Uuid,
    pub territory_id: String,
    pub reason: String,
}

/// Result of routing one lead
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LeadOutcome {
    Assigned {
        lead_id: Uuid,
        agent_id: Uuid,
        territory_id: String,
        score: f64,
        estimated_value: f64,
    },
    /// No eligible agent, or the assignment could not be committed
    Unassigned(UnassignedLead),
}

impl LeadOutcome {
    pub fn is_assigned(&self) -> bool {
        matches!(self, LeadOutcome::Assigned { .. })
    }
}

/// Summary of an assignment batch
///
/// Maps are ordered so the serialized report is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssignmentReport {
    pub considered: usize,
    pub successful: usize,
    pub failed: usize,
    pub unassigned: Vec<UnassignedLead>,
    pub by_territory: BTreeMap<String, usize>,
    pub by_agent: BTreeMap<Uuid, usize>,
    pub total_estimated_value: f64,
}

impl AssignmentReport {
    pub fn record(&mut self, outcome: LeadOutcome) {
        self.considered += 1;

        match outcome {
            LeadOutcome::Assigned {
                agent_id,
                territory_id,
                estimated_value,
                ..
            } => {
                self.successful += 1;
                *self.by_territory.entry(territory_id).or_default() += 1;
                *self.by_agent.entry(agent_id).or_default() += 1;
                self.total_estimated_value += estimated_value;
            }
            LeadOutcome::Unassigned(unassigned) => {
                self.failed += 1;
                self.unassigned.push(unassigned);
            }
        }
    }
}
