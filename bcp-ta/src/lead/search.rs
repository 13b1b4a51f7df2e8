//! Lead search for the dashboard

use super::types::{Lead, LeadStatus};
use crate::db::leads::{lead_from_row, LEAD_COLUMNS};
use crate::territory::Zone;
use bcp_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

pub const DEFAULT_SEARCH_LIMIT: u32 = 100;
pub const MAX_SEARCH_LIMIT: u32 = 1000;

/// Search criteria; every field is optional and criteria combine with AND
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadFilter {
    #[serde(default)]
    pub status: Option<LeadStatus>,
    #[serde(default, alias = "zona")]
    pub zone: Option<Zone>,
    #[serde(default)]
    pub territory_id: Option<String>,
    #[serde(default)]
    pub assigned_agent_id: Option<Uuid>,
    #[serde(default)]
    pub min_quality: Option<u8>,
    #[serde(default)]
    pub min_propensity_casa: Option<u8>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl LeadFilter {
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT)
    }
}

/// Leads matching `filter`, best data quality first
pub async fn search_leads(pool: &SqlitePool, filter: &LeadFilter) -> Result<Vec<Lead>> {
    query_leads(pool, filter, Some(filter.effective_limit())).await
}

/// Run `filter` with an explicit row cap; `None` returns every match
pub(crate) async fn query_leads(
    pool: &SqlitePool,
    filter: &LeadFilter,
    limit: Option<u32>,
) -> Result<Vec<Lead>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM leads WHERE 1 = 1", LEAD_COLUMNS));

    if let Some(status) = filter.status {
        query.push(" AND lead_status = ").push_bind(status.as_str());
    }
    if let Some(zone) = filter.zone {
        query.push(" AND zona = ").push_bind(zone.as_str());
    }
    if let Some(territory_id) = &filter.territory_id {
        query.push(" AND territory_id = ").push_bind(territory_id.clone());
    }
    if let Some(agent_id) = filter.assigned_agent_id {
        query.push(" AND assigned_agent_id = ").push_bind(agent_id.to_string());
    }
    if let Some(min_quality) = filter.min_quality {
        query.push(" AND data_quality_score >= ").push_bind(min_quality as i64);
    }
    if let Some(min_casa) = filter.min_propensity_casa {
        query.push(" AND propensity_casa >= ").push_bind(min_casa as i64);
    }

    query.push(" ORDER BY data_quality_score DESC, created_at ASC, id ASC");
    if let Some(limit) = limit {
        query.push(" LIMIT ").push_bind(limit as i64);
    }

    let rows = query.build().fetch_all(pool).await?;
    rows.iter().map(lead_from_row).collect()
}
