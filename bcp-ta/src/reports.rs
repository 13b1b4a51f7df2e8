//! Agent performance and territory coverage reports

use crate::agent::{Agent, AgentRegistry};
use crate::territory::{Priority, TerritoryCatalog, Zone};
use bcp_common::{Error, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

/// Pipeline figures for one agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStats {
    pub agent: Agent,
    pub total_leads: i64,
    pub contacted: i64,
    pub qualified: i64,
    pub converted: i64,
    pub avg_quality: f64,
    pub total_revenue: f64,
}

pub async fn agent_stats(
    pool: &SqlitePool,
    registry: &AgentRegistry,
    agent_id: Uuid,
) -> Result<AgentStats> {
    let agent = registry
        .get(agent_id)
        .await
        .ok_or_else(|| Error::NotFound(format!("agent {}", agent_id)))?;

    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total_leads,
            COALESCE(SUM(CASE WHEN lead_status = 'contacted' THEN 1 ELSE 0 END), 0) AS contacted,
            COALESCE(SUM(CASE WHEN lead_status = 'qualified' THEN 1 ELSE 0 END), 0) AS qualified,
            COALESCE(SUM(CASE WHEN lead_status = 'converted' THEN 1 ELSE 0 END), 0) AS converted,
            COALESCE(AVG(data_quality_score), 0.0) AS avg_quality,
            COALESCE(SUM(revenue_opportunity), 0.0) AS total_revenue
        FROM leads
        WHERE assigned_agent_id = ?
        "#,
    )
    .bind(agent_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(AgentStats {
        agent,
        total_leads: row.get("total_leads"),
        contacted: row.get("contacted"),
        qualified: row.get("qualified"),
        converted: row.get("converted"),
        avg_quality: row.get("avg_quality"),
        total_revenue: row.get("total_revenue"),
    })
}

/// Lead coverage of one territory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerritoryReport {
    pub territory_id: String,
    pub name: String,
    pub priority: Priority,
    pub lead_count: usize,
    pub assigned_count: usize,
    /// Share of leads with an agent, 0 when the territory has no leads
    pub assignment_percentage: f64,
    pub avg_quality: f64,
    pub revenue_potential: f64,
}

#[derive(Default)]
struct Tally {
    leads: usize,
    assigned: usize,
    quality_sum: u64,
    revenue: f64,
}

/// Per-territory figures in catalog order
///
/// Each lead is counted in the territory its postal code and zone resolve to.
pub async fn territory_report(
    pool: &SqlitePool,
    catalog: &TerritoryCatalog,
) -> Result<Vec<TerritoryReport>> {
    let rows = sqlx::query(
        "SELECT address_cap, zona, assigned_agent_id, data_quality_score, revenue_opportunity FROM leads",
    )
    .fetch_all(pool)
    .await?;

    let mut tallies: HashMap<String, Tally> = HashMap::new();
    for row in &rows {
        let cap: Option<String> = row.get("address_cap");
        let zona: Option<String> = row.get("zona");
        let agent: Option<String> = row.get("assigned_agent_id");
        let quality: i64 = row.get("data_quality_score");
        let revenue: Option<f64> = row.get("revenue_opportunity");

        let zone = zona.as_deref().and_then(|z| z.parse::<Zone>().ok());
        let territory = catalog.resolve(cap.as_deref(), zone);

        let tally = tallies.entry(territory.id.clone()).or_default();
        tally.leads += 1;
        if agent.is_some() {
            tally.assigned += 1;
        }
        tally.quality_sum += quality.max(0) as u64;
        tally.revenue += revenue.unwrap_or_default();
    }

    Ok(catalog
        .iter()
        .map(|territory| {
            let tally = tallies.remove(&territory.id).unwrap_or_default();
            let (assignment_percentage, avg_quality) = if tally.leads == 0 {
                (0.0, 0.0)
            } else {
                (
                    tally.assigned as f64 * 100.0 / tally.leads as f64,
                    tally.quality_sum as f64 / tally.leads as f64,
                )
            };

            TerritoryReport {
                territory_id: territory.id.clone(),
                name: territory.name.clone(),
                priority: territory.priority,
                lead_count: tally.leads,
                assigned_count: tally.assigned,
                assignment_percentage,
                avg_quality,
                revenue_potential: tally.revenue,
            }
        })
        .collect())
}
