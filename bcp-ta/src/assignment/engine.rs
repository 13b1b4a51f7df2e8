//! Assignment engine
//!
//! Routes queued leads to agents. Each assignment is committed in a single
//! transaction that updates the lead, bumps the agent's counters (guarded by
//! capacity) and records the assignment. The in-memory registry changes only
//! after the commit succeeds.

use super::report::{AssignmentReport, LeadOutcome, UnassignedLead};
use crate::agent::AgentRegistry;
use crate::db;
use crate::lead::{Lead, LeadStatus};
use crate::routing::{effective_capacity, select_agent, Candidate, ScoringWeights};
use crate::territory::{SkillSynonyms, Territory, TerritoryCatalog};
use bcp_common::db::{
    get_setting_or, DEFAULT_ASSIGNMENT_BATCH_LIMIT, DEFAULT_ASSIGNMENT_MIN_QUALITY,
};
use bcp_common::events::{BcpEvent, EventBus};
use bcp_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Which leads a batch considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    pub limit: u32,
    pub min_quality: u8,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_ASSIGNMENT_BATCH_LIMIT.parse().unwrap_or(100),
            min_quality: DEFAULT_ASSIGNMENT_MIN_QUALITY.parse().unwrap_or(60),
        }
    }
}

impl BatchOptions {
    /// Options from the `settings` table, falling back to defaults
    pub async fn from_settings(pool: &SqlitePool) -> Self {
        let defaults = Self::default();
        Self {
            limit: get_setting_or(pool, "assignment_batch_limit", defaults.limit).await,
            min_quality: get_setting_or(pool, "assignment_min_quality", defaults.min_quality).await,
        }
    }
}

pub struct AssignmentEngine {
    pool: SqlitePool,
    catalog: Arc<TerritoryCatalog>,
    synonyms: Arc<SkillSynonyms>,
    weights: ScoringWeights,
    registry: AgentRegistry,
    event_bus: EventBus,
    /// Serialises batches and status changes so capacity checks see committed state
    batch_lock: Mutex<()>,
}

impl AssignmentEngine {
    pub fn new(
        pool: SqlitePool,
        catalog: Arc<TerritoryCatalog>,
        synonyms: Arc<SkillSynonyms>,
        weights: ScoringWeights,
        registry: AgentRegistry,
        event_bus: EventBus,
    ) -> Self {
        Self {
            pool,
            catalog,
            synonyms,
            weights,
            registry,
            event_bus,
            batch_lock: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &TerritoryCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Assign every queued lead selected by `options`
    pub async fn run_batch(&self, options: BatchOptions) -> Result<AssignmentReport> {
        let _guard = self.batch_lock.lock().await;

        let leads =
            db::leads::load_assignment_queue(&self.pool, options.min_quality, options.limit).await?;
        info!(
            "Assignment batch: {} leads queued (min quality {}, limit {})",
            leads.len(),
            options.min_quality,
            options.limit
        );

        let mut report = AssignmentReport::default();
        for lead in &leads {
            report.record(self.route(lead).await);
        }

        info!(
            "Assignment batch complete: {} assigned, {} unassigned",
            report.successful, report.failed
        );
        self.event_bus.emit_lossy(BcpEvent::AssignmentBatchCompleted {
            successful: report.successful,
            failed: report.failed,
            timestamp: Utc::now(),
        });

        Ok(report)
    }

    /// Route a single lead
    pub async fn assign_lead(&self, lead: &Lead) -> LeadOutcome {
        let _guard = self.batch_lock.lock().await;
        self.route(lead).await
    }

    async fn route(&self, lead: &Lead) -> LeadOutcome {
        let territory = self
            .catalog
            .resolve(lead.address_cap.as_deref(), Some(lead.zone));
        let agents = self.registry.snapshot().await;

        let Some(candidate) = select_agent(&agents, territory, &self.synonyms, &self.weights) else {
            warn!(
                "No eligible agent for lead {} in territory {}",
                lead.id, territory.id
            );
            return self.unassigned(lead, territory, "no eligible agent".to_string());
        };

        match self.persist_assignment(lead, territory, &candidate).await {
            Ok(assigned_at) => {
                self.registry
                    .apply_assignment(candidate.agent.id, assigned_at)
                    .await;

                info!(
                    "Assigned lead {} to {} ({}) in {} with score {:.1}",
                    lead.id,
                    candidate.agent.display_name(),
                    candidate.agent.id,
                    territory.id,
                    candidate.score
                );
                self.event_bus.emit_lossy(BcpEvent::LeadAssigned {
                    lead_id: lead.id,
                    agent_id: candidate.agent.id,
                    territory_id: territory.id.clone(),
                    score: candidate.score,
                    timestamp: assigned_at,
                });

                LeadOutcome::Assigned {
                    lead_id: lead.id,
                    agent_id: candidate.agent.id,
                    territory_id: territory.id.clone(),
                    score: candidate.score,
                    estimated_value: territory.estimated_value(),
                }
            }
            Err(e) => {
                error!("Failed to commit assignment of lead {}: {}", lead.id, e);
                self.unassigned(lead, territory, format!("assignment not committed: {}", e))
            }
        }
    }

    fn unassigned(&self, lead: &Lead, territory: &Territory, reason: String) -> LeadOutcome {
        self.event_bus.emit_lossy(BcpEvent::LeadUnassigned {
            lead_id: lead.id,
            territory_id: territory.id.clone(),
            reason: reason.clone(),
            timestamp: Utc::now(),
        });

        LeadOutcome::Unassigned(UnassignedLead {
            lead_id: lead.id,
            territory_id: territory.id.clone(),
            reason,
        })
    }

    /// Commit one assignment; dropping the transaction on error rolls it back
    async fn persist_assignment(
        &self,
        lead: &Lead,
        territory: &Territory,
        candidate: &Candidate,
    ) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        let stamp = now.to_rfc3339();
        let agent_id = candidate.agent.id.to_string();
        let estimated_value = territory.estimated_value();
        let capacity = effective_capacity(&candidate.agent, territory);

        let mut tx = self.pool.begin().await?;

        let lead_update = sqlx::query(
            r#"
            UPDATE leads
            SET assigned_agent_id = ?, territory_id = ?, lead_status = 'assigned',
                revenue_opportunity = ?, updated_at = ?
            WHERE id = ? AND assigned_agent_id IS NULL AND lead_status = 'new'
            "#,
        )
        .bind(&agent_id)
        .bind(&territory.id)
        .bind(estimated_value)
        .bind(&stamp)
        .bind(lead.id.to_string())
        .execute(&mut *tx)
        .await?;

        if lead_update.rows_affected() != 1 {
            return Err(Error::Conflict(format!(
                "lead {} is no longer waiting for assignment",
                lead.id
            )));
        }

        let agent_update = sqlx::query(
            r#"
            UPDATE agents
            SET current_leads = current_leads + 1,
                total_assigned = total_assigned + 1,
                last_assignment = ?,
                updated_at = ?
            WHERE id = ? AND status = 'active' AND current_leads < ?
            "#,
        )
        .bind(&stamp)
        .bind(&stamp)
        .bind(&agent_id)
        .bind(capacity as i64)
        .execute(&mut *tx)
        .await?;

        if agent_update.rows_affected() != 1 {
            return Err(Error::Conflict(format!(
                "agent {} is unavailable or at capacity",
                candidate.agent.id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO lead_assignments
                (id, lead_id, agent_id, territory_id, score, priority, estimated_value, assigned_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(lead.id.to_string())
        .bind(&agent_id)
        .bind(&territory.id)
        .bind(candidate.score)
        .bind(territory.priority.as_str())
        .bind(estimated_value)
        .bind(&stamp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(now)
    }

    /// Move a lead through its pipeline
    ///
    /// Closing an assigned lead frees one unit of its agent's load.
    pub async fn update_lead_status(&self, lead_id: Uuid, status: LeadStatus) -> Result<Lead> {
        if status == LeadStatus::Assigned {
            return Err(Error::InvalidInput(
                "leads are assigned by running an assignment batch".to_string(),
            ));
        }

        let _guard = self.batch_lock.lock().await;

        let mut lead = db::leads::get_lead(&self.pool, lead_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("lead {}", lead_id)))?;

        if !lead.status.can_transition_to(status) {
            return Err(Error::Conflict(format!(
                "lead {} cannot move from {} to {}",
                lead_id, lead.status, status
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE leads SET lead_status = ?, updated_at = ? WHERE id = ? AND lead_status = ?",
        )
        .bind(status.as_str())
        .bind(now.to_rfc3339())
        .bind(lead_id.to_string())
        .bind(lead.status.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            return Err(Error::Conflict(format!("lead {} changed concurrently", lead_id)));
        }

        let mut released = None;
        if status.is_closed() {
            if let Some(agent_id) = lead.assigned_agent_id {
                let result = sqlx::query(
                    r#"
                    UPDATE agents SET current_leads = current_leads - 1, updated_at = ?
                    WHERE id = ? AND current_leads > 0
                    "#,
                )
                .bind(now.to_rfc3339())
                .bind(agent_id.to_string())
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 1 {
                    released = Some(agent_id);
                } else {
                    warn!("Agent {} had no load to release for lead {}", agent_id, lead_id);
                }
            }
        }

        tx.commit().await?;

        if let Some(agent_id) = released {
            self.registry.apply_release(agent_id).await;
        }

        info!("Lead {} status {} -> {}", lead_id, lead.status, status);
        self.event_bus.emit_lossy(BcpEvent::LeadStatusChanged {
            lead_id,
            old_status: lead.status.to_string(),
            new_status: status.to_string(),
            timestamp: now,
        });

        lead.status = status;
        lead.updated_at = now;
        Ok(lead)
    }
}
