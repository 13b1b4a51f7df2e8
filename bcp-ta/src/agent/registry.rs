//! In-memory agent registry
//!
//! The database is the source of truth; the registry mirrors it for fast
//! eligibility checks. Every mutation is persisted before memory changes.

use super::types::{Agent, AgentProfile, AgentStatus};
use crate::db;
use bcp_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared handle to the agent pool
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Arc<RwLock<HashMap<Uuid, Agent>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the `agents` table
    pub async fn load_from_db(pool: &SqlitePool) -> Result<Self> {
        let agents = db::agents::load_agents(pool).await?;
        info!("Loaded {} agents from database", agents.len());

        let map = agents.into_iter().map(|a| (a.id, a)).collect();
        Ok(Self {
            agents: Arc::new(RwLock::new(map)),
        })
    }

    /// Register a new agent or replace an existing profile
    ///
    /// An existing agent is matched by explicit id, then by email.
    pub async fn register(&self, pool: &SqlitePool, profile: AgentProfile) -> Result<Agent> {
        profile.validate()?;

        let existing = {
            let agents = self.agents.read().await;
            match profile.id {
                Some(id) => agents.get(&id).cloned(),
                None => profile.email.as_deref().and_then(|email| {
                    agents
                        .values()
                        .find(|a| {
                            a.email
                                .as_deref()
                                .is_some_and(|e| e.eq_ignore_ascii_case(email))
                        })
                        .cloned()
                }),
            }
        };

        let id = existing
            .as_ref()
            .map(|a| a.id)
            .or(profile.id)
            .unwrap_or_else(Uuid::new_v4);
        let agent = profile.into_agent(id, existing.as_ref());

        db::agents::upsert_agent(pool, &agent).await?;

        if existing.is_some() {
            info!("Updated agent {} ({})", agent.display_name(), agent.id);
        } else {
            info!("Registered agent {} ({})", agent.display_name(), agent.id);
        }

        let mut agents = self.agents.write().await;
        let mut agent = agent;
        // Counters may have moved while the upsert ran
        if let Some(current) = agents.get(&agent.id) {
            agent.current_leads = current.current_leads;
            agent.total_assigned = current.total_assigned;
            agent.last_assignment = current.last_assignment;
        }
        agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    pub async fn get(&self, id: Uuid) -> Option<Agent> {
        self.agents.read().await.get(&id).cloned()
    }

    /// Agents sorted by last name, then first name
    pub async fn list(&self) -> Vec<Agent> {
        let mut agents = self.snapshot().await;
        agents.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
                .then_with(|| a.id.cmp(&b.id))
        });
        agents
    }

    /// Point-in-time copy of every agent, in no particular order
    pub async fn snapshot(&self) -> Vec<Agent> {
        self.agents.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }

    /// Change availability; returns the previous status
    pub async fn set_status(
        &self,
        pool: &SqlitePool,
        id: Uuid,
        status: AgentStatus,
    ) -> Result<AgentStatus> {
        if self.get(id).await.is_none() {
            return Err(Error::NotFound(format!("agent {}", id)));
        }

        if !db::agents::update_agent_status(pool, id, status).await? {
            return Err(Error::NotFound(format!("agent {}", id)));
        }

        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("agent {}", id)))?;
        let old = agent.status;
        agent.status = status;

        info!("Agent {} status {} -> {}", id, old, status);
        Ok(old)
    }

    /// Record a committed assignment
    pub async fn apply_assignment(&self, id: Uuid, at: DateTime<Utc>) {
        match self.agents.write().await.get_mut(&id) {
            Some(agent) => {
                agent.current_leads += 1;
                agent.total_assigned += 1;
                agent.last_assignment = Some(at);
                debug!("Agent {} load now {}/{}", id, agent.current_leads, agent.max_leads);
            }
            None => warn!("Assignment committed for agent {} missing from registry", id),
        }
    }

    /// Record a committed release of one lead
    pub async fn apply_release(&self, id: Uuid) {
        match self.agents.write().await.get_mut(&id) {
            Some(agent) => {
                agent.current_leads = agent.current_leads.saturating_sub(1);
                debug!("Agent {} load now {}/{}", id, agent.current_leads, agent.max_leads);
            }
            None => warn!("Release committed for agent {} missing from registry", id),
        }
    }
}
