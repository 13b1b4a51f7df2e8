//! Agent records and registration input

use bcp_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Seniority of a sales agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceTier {
    #[default]
    Junior,
    Senior,
    Expert,
}

impl ExperienceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceTier::Junior => "junior",
            ExperienceTier::Senior => "senior",
            ExperienceTier::Expert => "expert",
        }
    }
}

impl FromStr for ExperienceTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "junior" => Ok(ExperienceTier::Junior),
            "senior" => Ok(ExperienceTier::Senior),
            "expert" => Ok(ExperienceTier::Expert),
            other => Err(Error::InvalidInput(format!("unknown experience tier '{}'", other))),
        }
    }
}

/// Availability of an agent for new leads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Busy,
    Vacation,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Busy => "busy",
            AgentStatus::Vacation => "vacation",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(AgentStatus::Active),
            "busy" => Ok(AgentStatus::Busy),
            "vacation" => Ok(AgentStatus::Vacation),
            other => Err(Error::InvalidInput(format!("unknown agent status '{}'", other))),
        }
    }
}

/// A sales agent with its current workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub experience: ExperienceTier,
    pub max_leads: u32,
    /// Territory ids or names the agent asked for
    pub preferred_territories: Vec<String>,
    pub current_leads: u32,
    pub total_assigned: u32,
    /// Historical success rate, 0-100
    pub success_rate: f64,
    pub avg_deal_size: f64,
    pub last_assignment: Option<DateTime<Utc>>,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn speaks(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l.eq_ignore_ascii_case(language))
    }
}

/// Registration input; omitted fields take the documented defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Existing agent to replace; when absent an agent with the same email is reused
    #[serde(default)]
    pub id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default)]
    pub experience: ExperienceTier,
    #[serde(default = "default_max_leads")]
    pub max_leads: u32,
    #[serde(default)]
    pub preferred_territories: Vec<String>,
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
    #[serde(default = "default_avg_deal_size")]
    pub avg_deal_size: f64,
    #[serde(default)]
    pub status: AgentStatus,
}

fn default_languages() -> Vec<String> {
    vec!["italian".to_string()]
}

fn default_max_leads() -> u32 {
    100
}

fn default_success_rate() -> f64 {
    50.0
}

fn default_avg_deal_size() -> f64 {
    8000.0
}

impl AgentProfile {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            id: None,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: None,
            phone: None,
            skills: Vec::new(),
            languages: default_languages(),
            experience: ExperienceTier::default(),
            max_leads: default_max_leads(),
            preferred_territories: Vec::new(),
            success_rate: default_success_rate(),
            avg_deal_size: default_avg_deal_size(),
            status: AgentStatus::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(Error::InvalidInput("agent first and last name are required".to_string()));
        }
        if self.max_leads == 0 {
            return Err(Error::InvalidInput("max_leads must be greater than zero".to_string()));
        }
        if !(0.0..=100.0).contains(&self.success_rate) {
            return Err(Error::InvalidInput(format!(
                "success_rate {} outside 0-100",
                self.success_rate
            )));
        }
        if !(self.avg_deal_size >= 0.0) {
            return Err(Error::InvalidInput("avg_deal_size must not be negative".to_string()));
        }
        Ok(())
    }

    /// Build the agent record, carrying workload over from `existing`
    pub fn into_agent(self, id: Uuid, existing: Option<&Agent>) -> Agent {
        let now = Utc::now();
        Agent {
            id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.filter(|e| !e.trim().is_empty()),
            phone: self.phone.filter(|p| !p.trim().is_empty()),
            skills: self.skills,
            languages: self.languages,
            experience: self.experience,
            max_leads: self.max_leads,
            preferred_territories: self.preferred_territories,
            current_leads: existing.map_or(0, |a| a.current_leads),
            total_assigned: existing.map_or(0, |a| a.total_assigned),
            success_rate: self.success_rate,
            avg_deal_size: self.avg_deal_size,
            last_assignment: existing.and_then(|a| a.last_assignment),
            status: self.status,
            created_at: existing.map_or(now, |a| a.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults_from_json() {
        let profile: AgentProfile =
            serde_json::from_str(r#"{"first_name": "Marco", "last_name": "Rossi"}"#).unwrap();

        assert_eq!(profile.languages, vec!["italian"]);
        assert_eq!(profile.experience, ExperienceTier::Junior);
        assert_eq!(profile.max_leads, 100);
        assert_eq!(profile.success_rate, 50.0);
        assert_eq!(profile.avg_deal_size, 8000.0);
        assert_eq!(profile.status, AgentStatus::Active);
    }

    #[test]
    fn test_validate_rejects_bad_profiles() {
        let mut profile = AgentProfile::new("Marco", " ");
        assert!(profile.validate().is_err());

        profile = AgentProfile::new("Marco", "Rossi");
        profile.max_leads = 0;
        assert!(profile.validate().is_err());

        profile = AgentProfile::new("Marco", "Rossi");
        profile.success_rate = 101.0;
        assert!(profile.validate().is_err());

        assert!(AgentProfile::new("Marco", "Rossi").validate().is_ok());
    }

    #[test]
    fn test_into_agent_keeps_existing_workload() {
        let first = AgentProfile::new("Marco", "Rossi").into_agent(Uuid::new_v4(), None);
        let mut loaded = first.clone();
        loaded.current_leads = 7;
        loaded.total_assigned = 12;

        let mut update = AgentProfile::new("Marco", "Rossi");
        update.max_leads = 150;
        let replaced = update.into_agent(loaded.id, Some(&loaded));

        assert_eq!(replaced.current_leads, 7);
        assert_eq!(replaced.total_assigned, 12);
        assert_eq!(replaced.max_leads, 150);
        assert_eq!(replaced.created_at, loaded.created_at);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Vacation".parse::<AgentStatus>().unwrap(), AgentStatus::Vacation);
        assert!("retired".parse::<AgentStatus>().is_err());
        assert_eq!("EXPERT".parse::<ExperienceTier>().unwrap(), ExperienceTier::Expert);
    }
}
