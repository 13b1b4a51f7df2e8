//! Lead records and the sales pipeline

use crate::territory::Zone;
use bcp_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Position of a lead in the sales pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Assigned,
    Contacted,
    Interested,
    Qualified,
    Converted,
    NotInterested,
    Invalid,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 8] = [
        LeadStatus::New,
        LeadStatus::Assigned,
        LeadStatus::Contacted,
        LeadStatus::Interested,
        LeadStatus::Qualified,
        LeadStatus::Converted,
        LeadStatus::NotInterested,
        LeadStatus::Invalid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Assigned => "assigned",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Interested => "interested",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::NotInterested => "not_interested",
            LeadStatus::Invalid => "invalid",
        }
    }

    /// Terminal statuses; closing an assigned lead frees agent capacity
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            LeadStatus::Converted | LeadStatus::NotInterested | LeadStatus::Invalid
        )
    }

    /// Step in the forward pipeline, None for the exit statuses
    fn pipeline_step(&self) -> Option<u8> {
        match self {
            LeadStatus::New => Some(0),
            LeadStatus::Assigned => Some(1),
            LeadStatus::Contacted => Some(2),
            LeadStatus::Interested => Some(3),
            LeadStatus::Qualified => Some(4),
            LeadStatus::Converted => Some(5),
            LeadStatus::NotInterested | LeadStatus::Invalid => None,
        }
    }

    /// Whether a lead may move from `self` to `next`
    ///
    /// Open leads move forward through the pipeline (steps may be skipped once
    /// assigned) or exit as not interested / invalid. A new lead must be
    /// assigned before it can progress.
    pub fn can_transition_to(&self, next: LeadStatus) -> bool {
        if self.is_closed() || *self == next {
            return false;
        }

        match (next, self.pipeline_step(), next.pipeline_step()) {
            (LeadStatus::NotInterested | LeadStatus::Invalid, _, _) => true,
            (LeadStatus::Assigned, _, _) => *self == LeadStatus::New,
            (_, Some(0), _) => false,
            (_, Some(from), Some(to)) => to > from,
            _ => false,
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == needle)
            .ok_or_else(|| Error::InvalidInput(format!("unknown lead status '{}'", s)))
    }
}

/// A prospective customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_street: Option<String>,
    pub address_cap: Option<String>,
    pub zone: Zone,
    pub business_type: Option<String>,
    pub estimated_income: u32,
    pub family_size: u32,
    pub home_ownership: String,
    pub propensity_casa: u8,
    pub propensity_auto: u8,
    pub propensity_vita: u8,
    pub propensity_business: u8,
    pub data_source: Option<String>,
    /// Completeness of contact data, 0-100
    pub data_quality_score: u8,
    /// Estimated conversion likelihood in percent
    pub conversion_probability: u8,
    pub status: LeadStatus,
    pub assigned_agent_id: Option<Uuid>,
    pub territory_id: Option<String>,
    pub revenue_opportunity: Option<f64>,
    pub dedup_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Ingest input: a person or a business listing with contact and address data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLead {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Listing title; the person name is derived from it when names are absent
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "address")]
    pub address_street: Option<String>,
    #[serde(default, alias = "cap")]
    pub address_cap: Option<String>,
    #[serde(default, alias = "zona")]
    pub zone: Option<Zone>,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub family_size: Option<u32>,
    #[serde(default)]
    pub home_ownership: Option<String>,
    #[serde(default, alias = "source")]
    pub data_source: Option<String>,
}
