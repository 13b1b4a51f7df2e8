//! Agent persistence
//!
//! List-valued fields are stored as JSON arrays in TEXT columns.

use crate::agent::{Agent, AgentStatus};
use bcp_common::{Error, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};

/// Insert a new agent or replace the profile of an existing one
///
/// Workload counters of an existing row are left untouched.
pub async fn upsert_agent(pool: &SqlitePool, agent: &Agent) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO agents (
            id, first_name, last_name, email, phone, skills, languages, experience,
            max_leads, preferred_territories, current_leads, total_assigned,
            success_rate, avg_deal_size, last_assignment, status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            email = excluded.email,
            phone = excluded.phone,
            skills = excluded.skills,
            languages = excluded.languages,
            experience = excluded.experience,
            max_leads = excluded.max_leads,
            preferred_territories = excluded.preferred_territories,
            success_rate = excluded.success_rate,
            avg_deal_size = excluded.avg_deal_size,
            status = excluded.status,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(agent.id.to_string())
    .bind(&agent.first_name)
    .bind(&agent.last_name)
    .bind(&agent.email)
    .bind(&agent.phone)
    .bind(serde_json::to_string(&agent.skills)?)
    .bind(serde_json::to_string(&agent.languages)?)
    .bind(agent.experience.as_str())
    .bind(agent.max_leads as i64)
    .bind(serde_json::to_string(&agent.preferred_territories)?)
    .bind(agent.current_leads as i64)
    .bind(agent.total_assigned as i64)
    .bind(agent.success_rate)
    .bind(agent.avg_deal_size)
    .bind(agent.last_assignment.map(|t| t.to_rfc3339()))
    .bind(agent.status.as_str())
    .bind(agent.created_at.to_rfc3339())
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load every agent
pub async fn load_agents(pool: &SqlitePool) -> Result<Vec<Agent>> {
    let rows = sqlx::query(
        r#"
        SELECT id, first_name, last_name, email, phone, skills, languages, experience,
               max_leads, preferred_territories, current_leads, total_assigned,
               success_rate, avg_deal_size, last_assignment, status, created_at
        FROM agents
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(agent_from_row).collect()
}

/// Persist a status change; returns false if the agent does not exist
pub async fn update_agent_status(pool: &SqlitePool, id: Uuid, status: AgentStatus) -> Result<bool> {
    let result = sqlx::query("UPDATE agents SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

fn agent_from_row(row: &SqliteRow) -> Result<Agent> {
    let id: String = row.get("id");
    let skills: String = row.get("skills");
    let languages: String = row.get("languages");
    let preferred: String = row.get("preferred_territories");
    let experience: String = row.get("experience");
    let status: String = row.get("status");
    let last_assignment: Option<String> = row.get("last_assignment");
    let created_at: String = row.get("created_at");

    Ok(Agent {
        id: parse_uuid(&id)?,
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        skills: serde_json::from_str(&skills)
            .map_err(|e| Error::Internal(format!("agent {} has corrupt skills: {}", id, e)))?,
        languages: serde_json::from_str(&languages)
            .map_err(|e| Error::Internal(format!("agent {} has corrupt languages: {}", id, e)))?,
        experience: experience.parse()?,
        max_leads: row.get::<i64, _>("max_leads").max(0) as u32,
        preferred_territories: serde_json::from_str(&preferred).map_err(|e| {
            Error::Internal(format!("agent {} has corrupt preferred territories: {}", id, e))
        })?,
        current_leads: row.get::<i64, _>("current_leads").max(0) as u32,
        total_assigned: row.get::<i64, _>("total_assigned").max(0) as u32,
        success_rate: row.get("success_rate"),
        avg_deal_size: row.get("avg_deal_size"),
        last_assignment: last_assignment.as_deref().map(parse_timestamp).transpose()?,
        status: status.parse()?,
        created_at: parse_timestamp(&created_at)?,
    })
}
