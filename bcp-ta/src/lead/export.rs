//! Lead export for agents and territory managers
//!
//! Leads are selected with the search filters, optionally narrowed to one
//! territory, and written as CSV or a JSON envelope.

use super::search::{query_leads, LeadFilter, MAX_SEARCH_LIMIT};
use super::types::{Lead, LeadStatus};
use crate::territory::{TerritoryCatalog, Zone};
use bcp_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::io::Write;
use tracing::info;
use uuid::Uuid;

const CSV_HEADERS: [&str; 24] = [
    "id",
    "first_name",
    "last_name",
    "email",
    "phone",
    "address_street",
    "address_cap",
    "zone",
    "business_type",
    "estimated_income",
    "family_size",
    "home_ownership",
    "propensity_casa",
    "propensity_auto",
    "propensity_vita",
    "propensity_business",
    "data_source",
    "data_quality_score",
    "conversion_probability",
    "lead_status",
    "assigned_agent_id",
    "territory_id",
    "revenue_opportunity",
    "created_at",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

/// Export selection; unset fields do not filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub agent_id: Option<Uuid>,
    /// Territory the lead's postal code and zone resolve to
    #[serde(default)]
    pub territory_id: Option<String>,
    #[serde(default)]
    pub min_quality: Option<u8>,
    #[serde(default)]
    pub status: Option<LeadStatus>,
    #[serde(default, alias = "zona")]
    pub zone: Option<Zone>,
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl ExportParams {
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(MAX_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT) as usize
    }

    fn filter(&self) -> LeadFilter {
        LeadFilter {
            status: self.status,
            zone: self.zone,
            assigned_agent_id: self.agent_id,
            min_quality: self.min_quality,
            ..LeadFilter::default()
        }
    }
}

/// JSON export envelope
#[derive(Debug, Clone, Serialize)]
pub struct LeadExport {
    pub exported_at: DateTime<Utc>,
    pub total_leads: usize,
    pub leads: Vec<Lead>,
}

impl LeadExport {
    pub fn new(leads: Vec<Lead>) -> Self {
        Self {
            exported_at: Utc::now(),
            total_leads: leads.len(),
            leads,
        }
    }
}

/// Leads selected by `params`, best data quality first
///
/// An unknown `territory_id` is rejected rather than exporting nothing.
pub async fn export_leads(
    pool: &SqlitePool,
    catalog: &TerritoryCatalog,
    params: &ExportParams,
) -> Result<Vec<Lead>> {
    if let Some(territory_id) = &params.territory_id {
        if catalog.get(territory_id).is_none() {
            return Err(Error::InvalidInput(format!(
                "unknown territory '{}'",
                territory_id
            )));
        }
    }

    let leads = query_leads(pool, &params.filter(), None).await?;
    let leads: Vec<Lead> = leads
        .into_iter()
        .filter(|lead| match &params.territory_id {
            Some(territory_id) => resolved_territory(catalog, lead) == territory_id,
            None => true,
        })
        .take(params.effective_limit())
        .collect();

    info!("Exporting {} leads as {:?}", leads.len(), params.format);
    Ok(leads)
}

/// Territory recorded at assignment, else the one the address resolves to
fn resolved_territory<'a>(catalog: &'a TerritoryCatalog, lead: &'a Lead) -> &'a str {
    match &lead.territory_id {
        Some(id) => id.as_str(),
        None => catalog
            .resolve(lead.address_cap.as_deref(), Some(lead.zone))
            .id
            .as_str(),
    }
}

/// Write `leads` as CSV with a header row
pub fn write_csv<W: Write>(leads: &[Lead], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADERS).map_err(csv_error)?;

    for lead in leads {
        writer
            .write_record([
                lead.id.to_string(),
                lead.first_name.clone(),
                lead.last_name.clone(),
                lead.email.clone().unwrap_or_default(),
                lead.phone.clone().unwrap_or_default(),
                lead.address_street.clone().unwrap_or_default(),
                lead.address_cap.clone().unwrap_or_default(),
                lead.zone.to_string(),
                lead.business_type.clone().unwrap_or_default(),
                lead.estimated_income.to_string(),
                lead.family_size.to_string(),
                lead.home_ownership.clone(),
                lead.propensity_casa.to_string(),
                lead.propensity_auto.to_string(),
                lead.propensity_vita.to_string(),
                lead.propensity_business.to_string(),
                lead.data_source.clone().unwrap_or_default(),
                lead.data_quality_score.to_string(),
                lead.conversion_probability.to_string(),
                lead.status.to_string(),
                lead.assigned_agent_id.map(|id| id.to_string()).unwrap_or_default(),
                lead.territory_id.clone().unwrap_or_default(),
                lead.revenue_opportunity.map(|r| r.to_string()).unwrap_or_default(),
                lead.created_at.to_rfc3339(),
            ])
            .map_err(csv_error)?;
    }

    writer.flush()?;
    Ok(())
}

/// CSV export as an owned string
pub fn to_csv_string(leads: &[Lead]) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(leads, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| Error::Internal(format!("CSV not UTF-8: {}", e)))
}

fn csv_error(e: csv::Error) -> Error {
    Error::Internal(format!("CSV write failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::{import_leads, RawLead};
    use bcp_common::db::init_memory_database;

    fn raw(first: &str, email: Option<&str>, cap: &str) -> RawLead {
        RawLead {
            first_name: Some(first.to_string()),
            last_name: Some("Galli".to_string()),
            email: email.map(str::to_string),
            address_cap: Some(cap.to_string()),
            ..RawLead::default()
        }
    }

    async fn seeded_pool() -> SqlitePool {
        let pool = init_memory_database().await.unwrap();
        import_leads(
            &pool,
            vec![
                raw("Alba", Some("alba@example.it"), "20121"),
                raw("Bice", None, "20121"),
                raw("Ciro", Some("ciro@example.it"), "20143"),
            ],
        )
        .await
        .unwrap();
        pool
    }

    #[test]
    fn test_format_defaults_to_csv() {
        let params: ExportParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.format, ExportFormat::Csv);
        assert_eq!(params.effective_limit(), 1000);

        let params: ExportParams = serde_json::from_str(r#"{"format": "json", "limit": 0}"#).unwrap();
        assert_eq!(params.format, ExportFormat::Json);
        assert_eq!(params.effective_limit(), 1);
    }

    #[tokio::test]
    async fn test_export_by_territory() {
        let pool = seeded_pool().await;
        let catalog = TerritoryCatalog::milan_default();

        let params = ExportParams {
            territory_id: Some("centro_premium".to_string()),
            ..ExportParams::default()
        };
        let leads = export_leads(&pool, &catalog, &params).await.unwrap();
        let names: Vec<&str> = leads.iter().map(|l| l.first_name.as_str()).collect();
        assert_eq!(names, vec!["Alba", "Bice"]);

        let params = ExportParams {
            territory_id: Some("atlantis".to_string()),
            ..ExportParams::default()
        };
        assert!(matches!(
            export_leads(&pool, &catalog, &params).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_export_min_quality_and_limit() {
        let pool = seeded_pool().await;
        let catalog = TerritoryCatalog::milan_default();

        let params = ExportParams {
            min_quality: Some(60),
            limit: Some(1),
            ..ExportParams::default()
        };
        let leads = export_leads(&pool, &catalog, &params).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert!(leads[0].data_quality_score >= 60);
    }

    #[tokio::test]
    async fn test_csv_has_header_and_one_row_per_lead() {
        let pool = seeded_pool().await;
        let catalog = TerritoryCatalog::milan_default();
        let leads = export_leads(&pool, &catalog, &ExportParams::default())
            .await
            .unwrap();

        let csv = to_csv_string(&leads).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("id,first_name,last_name,email"));
        assert!(lines.iter().any(|line| line.contains(",Alba,Galli,alba@example.it,")));
        assert!(lines.iter().skip(1).all(|line| line.contains(",new,")));
    }

    #[test]
    fn test_empty_csv_keeps_header() {
        let csv = to_csv_string(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.ends_with("created_at\n"));
    }
}
