//! Territory catalog: partition of postal codes and zones into sales territories

use bcp_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::zone::Zone;

/// Commercial priority of a territory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// How hard a territory is to work; high difficulty excludes junior agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    High,
    Medium,
    Low,
}

/// A named sales territory with its staffing requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub caps: Vec<String>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    pub priority: Priority,
    pub difficulty: Difficulty,
    /// Average closed deal in euros
    pub avg_deal_size: f64,
    #[serde(default = "default_lead_multiplier")]
    pub lead_multiplier: f64,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub max_leads_per_agent: u32,
    /// Spoken languages that earn the language bonus in this territory
    #[serde(default)]
    pub bonus_languages: Vec<String>,
}

fn default_lead_multiplier() -> f64 {
    1.0
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Territory {
    /// Value booked against an assignment in this territory
    pub fn estimated_value(&self) -> f64 {
        self.avg_deal_size * self.lead_multiplier
    }

    /// True if `preference` names this territory by id or display name
    pub fn matches_preference(&self, preference: &str) -> bool {
        let preference = preference.trim();
        preference.eq_ignore_ascii_case(&self.id) || preference.eq_ignore_ascii_case(&self.name)
    }
}

/// Ordered territory list with a fallback territory
#[derive(Debug, Clone, Serialize)]
pub struct TerritoryCatalog {
    territories: Vec<Territory>,
    default_id: String,
}

impl TerritoryCatalog {
    /// Build a validated catalog
    pub fn new(territories: Vec<Territory>, default_id: impl Into<String>) -> Result<Self> {
        let default_id = default_id.into();

        if territories.is_empty() {
            return Err(Error::Config("territory catalog is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for territory in &territories {
            if territory.id.trim().is_empty() {
                return Err(Error::Config("territory id must not be empty".to_string()));
            }
            if !seen.insert(territory.id.as_str()) {
                return Err(Error::Config(format!("duplicate territory id '{}'", territory.id)));
            }
            if territory.max_leads_per_agent == 0 {
                return Err(Error::Config(format!(
                    "territory '{}' has max_leads_per_agent = 0",
                    territory.id
                )));
            }
            if !(territory.avg_deal_size >= 0.0) {
                return Err(Error::Config(format!(
                    "territory '{}' has negative avg_deal_size",
                    territory.id
                )));
            }
            if !(territory.lead_multiplier > 0.0) {
                return Err(Error::Config(format!(
                    "territory '{}' needs a positive lead_multiplier",
                    territory.id
                )));
            }
        }

        if !seen.contains(default_id.as_str()) {
            return Err(Error::Config(format!(
                "default territory '{}' is not in the catalog",
                default_id
            )));
        }

        Ok(Self {
            territories,
            default_id,
        })
    }

    /// Built-in Milan partition
    pub fn milan_default() -> Self {
        let territories = vec![
            Territory {
                id: "centro_premium".to_string(),
                name: "Centro Premium".to_string(),
                caps: strings(&["20121", "20122", "20123"]),
                zones: vec![Zone::Centro],
                priority: Priority::High,
                difficulty: Difficulty::High,
                avg_deal_size: 15_000.0,
                lead_multiplier: 1.5,
                required_skills: strings(&["high_value_sales", "professional_services", "italian_fluent"]),
                max_leads_per_agent: 50,
                bonus_languages: Vec::new(),
            },
            Territory {
                id: "centro_extended".to_string(),
                name: "Centro Extended".to_string(),
                caps: strings(&["20124", "20125", "20126", "20127"]),
                zones: vec![Zone::Centro],
                priority: Priority::High,
                difficulty: Difficulty::Medium,
                avg_deal_size: 12_000.0,
                lead_multiplier: 1.3,
                required_skills: strings(&["consultative_sales", "professional_services"]),
                max_leads_per_agent: 75,
                bonus_languages: Vec::new(),
            },
            Territory {
                id: "porta_nuova".to_string(),
                name: "Porta Nuova Business".to_string(),
                caps: strings(&["20154"]),
                zones: vec![Zone::PortaNuova, Zone::Isola],
                priority: Priority::High,
                difficulty: Difficulty::Medium,
                avg_deal_size: 14_000.0,
                lead_multiplier: 1.4,
                required_skills: strings(&["corporate_sales", "english_fluent", "tech_savvy"]),
                max_leads_per_agent: 60,
                bonus_languages: strings(&["english"]),
            },
            Territory {
                id: "navigli_brera".to_string(),
                name: "Navigli & Brera".to_string(),
                caps: strings(&["20143", "20144", "20145"]),
                zones: vec![Zone::Navigli, Zone::Brera],
                priority: Priority::Medium,
                difficulty: Difficulty::Medium,
                avg_deal_size: 9_000.0,
                lead_multiplier: 1.2,
                required_skills: strings(&["lifestyle_sales", "creative_approach"]),
                max_leads_per_agent: 80,
                bonus_languages: Vec::new(),
            },
            Territory {
                id: "sempione".to_string(),
                name: "Sempione & North".to_string(),
                caps: strings(&["20154", "20145"]),
                zones: vec![Zone::Sempione, Zone::Isola],
                priority: Priority::Medium,
                difficulty: Difficulty::Low,
                avg_deal_size: 7_000.0,
                lead_multiplier: 1.0,
                required_skills: strings(&["volume_sales", "local_knowledge"]),
                max_leads_per_agent: 100,
                bonus_languages: Vec::new(),
            },
            Territory {
                id: "provincia".to_string(),
                name: "Provincia Milano".to_string(),
                caps: strings(&[
                    "20131", "20132", "20134", "20135", "20136", "20137", "20138", "20139",
                ]),
                zones: vec![Zone::Provincia],
                priority: Priority::Low,
                difficulty: Difficulty::Low,
                avg_deal_size: 5_000.0,
                lead_multiplier: 0.8,
                required_skills: strings(&["relationship_building", "persistence"]),
                max_leads_per_agent: 150,
                bonus_languages: Vec::new(),
            },
        ];

        Self {
            territories,
            default_id: "provincia".to_string(),
        }
    }

    /// Resolve the territory for a lead's postal code and zone
    ///
    /// A postal code match anywhere in the catalog wins over a zone match; within
    /// each pass the first territory in declaration order wins. Falls back to
    /// the default territory, so resolution never fails.
    pub fn resolve(&self, cap: Option<&str>, zone: Option<Zone>) -> &Territory {
        if let Some(cap) = cap.map(str::trim).filter(|c| !c.is_empty()) {
            if let Some(t) = self.territories.iter().find(|t| t.caps.iter().any(|c| c == cap)) {
                return t;
            }
        }

        if let Some(zone) = zone {
            if let Some(t) = self.territories.iter().find(|t| t.zones.contains(&zone)) {
                return t;
            }
        }

        self.default_territory()
    }

    pub fn get(&self, id: &str) -> Option<&Territory> {
        self.territories.iter().find(|t| t.id == id)
    }

    pub fn default_territory(&self) -> &Territory {
        // new() guarantees the default id is present
        self.territories
            .iter()
            .find(|t| t.id == self.default_id)
            .unwrap_or(&self.territories[0])
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn iter(&self) -> impl Iterator<Item = &Territory> {
        self.territories.iter()
    }

    pub fn len(&self) -> usize {
        self.territories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn territory(id: &str, caps: &[&str], zones: &[Zone]) -> Territory {
        Territory {
            id: id.to_string(),
            name: id.to_uppercase(),
            caps: caps.iter().map(|c| c.to_string()).collect(),
            zones: zones.to_vec(),
            priority: Priority::Medium,
            difficulty: Difficulty::Low,
            avg_deal_size: 1000.0,
            lead_multiplier: 1.0,
            required_skills: Vec::new(),
            max_leads_per_agent: 10,
            bonus_languages: Vec::new(),
        }
    }

    #[test]
    fn test_milan_default_is_valid() {
        let catalog = TerritoryCatalog::milan_default();
        let rebuilt = TerritoryCatalog::new(catalog.iter().cloned().collect(), catalog.default_id());
        assert!(rebuilt.is_ok());
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.default_territory().id, "provincia");
    }

    #[test]
    fn test_resolve_by_cap() {
        let catalog = TerritoryCatalog::milan_default();
        assert_eq!(catalog.resolve(Some("20122"), None).id, "centro_premium");
        assert_eq!(catalog.resolve(Some("20126"), Some(Zone::Centro)).id, "centro_extended");
    }

    #[test]
    fn test_shared_cap_goes_to_first_declared() {
        // 20154 is listed by both porta_nuova and sempione
        let catalog = TerritoryCatalog::milan_default();
        assert_eq!(catalog.resolve(Some("20154"), Some(Zone::Isola)).id, "porta_nuova");
    }

    #[test]
    fn test_cap_match_beats_earlier_zone_match() {
        let catalog = TerritoryCatalog::new(
            vec![
                territory("by_zone", &[], &[Zone::Navigli]),
                territory("by_cap", &["20143"], &[]),
            ],
            "by_zone",
        )
        .unwrap();

        assert_eq!(catalog.resolve(Some("20143"), Some(Zone::Navigli)).id, "by_cap");
    }

    #[test]
    fn test_resolve_by_zone_when_cap_unknown() {
        let catalog = TerritoryCatalog::milan_default();
        assert_eq!(catalog.resolve(Some("20199"), Some(Zone::Brera)).id, "navigli_brera");
        assert_eq!(catalog.resolve(None, Some(Zone::Sempione)).id, "sempione");
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let catalog = TerritoryCatalog::milan_default();
        assert_eq!(catalog.resolve(Some("99999"), None).id, "provincia");
        assert_eq!(catalog.resolve(None, None).id, "provincia");
        assert_eq!(catalog.resolve(Some("  "), None).id, "provincia");
    }

    #[test]
    fn test_rejects_missing_default() {
        let result = TerritoryCatalog::new(vec![territory("a", &[], &[])], "b");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_duplicate_ids_and_zero_capacity() {
        let dup = TerritoryCatalog::new(vec![territory("a", &[], &[]), territory("a", &[], &[])], "a");
        assert!(dup.is_err());

        let mut zero = territory("a", &[], &[]);
        zero.max_leads_per_agent = 0;
        assert!(TerritoryCatalog::new(vec![zero], "a").is_err());

        assert!(TerritoryCatalog::new(Vec::new(), "a").is_err());
    }

    #[test]
    fn test_preference_matches_id_or_name() {
        let catalog = TerritoryCatalog::milan_default();
        let porta_nuova = catalog.get("porta_nuova").unwrap();
        assert!(porta_nuova.matches_preference("Porta Nuova Business"));
        assert!(porta_nuova.matches_preference("porta_nuova"));
        assert!(!porta_nuova.matches_preference("Centro Premium"));
    }

    #[test]
    fn test_estimated_value() {
        let catalog = TerritoryCatalog::milan_default();
        let centro = catalog.get("centro_premium").unwrap();
        assert!((centro.estimated_value() - 22_500.0).abs() < f64::EPSILON);
    }
}
