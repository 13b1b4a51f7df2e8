//! Skill synonym expansion
//!
//! A territory lists the skills it requires; an agent satisfies a required
//! skill by holding it verbatim or by holding one of its synonyms.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static mapping from a required skill to the skills that also satisfy it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSynonyms {
    table: HashMap<String, Vec<String>>,
}

impl SkillSynonyms {
    pub fn new(table: HashMap<String, Vec<String>>) -> Self {
        Self { table }
    }

    /// Built-in synonym table
    pub fn standard() -> Self {
        let entries: [(&str, &[&str]); 7] = [
            ("high_value_sales", &["consultative_sales", "enterprise_sales", "luxury_sales"]),
            ("professional_services", &["b2b_sales", "consulting_experience"]),
            ("italian_fluent", &["native_italian", "business_italian"]),
            ("english_fluent", &["business_english", "international_sales"]),
            ("tech_savvy", &["digital_sales", "software_knowledge"]),
            ("relationship_building", &["customer_retention", "networking"]),
            ("volume_sales", &["phone_sales", "direct_sales"]),
        ];

        let table = entries
            .iter()
            .map(|(skill, synonyms)| {
                (
                    skill.to_string(),
                    synonyms.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();

        Self { table }
    }

    /// Overlay entries from configuration; configured lists replace built-in ones
    pub fn with_overrides(mut self, overrides: HashMap<String, Vec<String>>) -> Self {
        self.table.extend(overrides);
        self
    }

    pub fn synonyms_of(&self, skill: &str) -> &[String] {
        self.table.get(skill).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if the agent holds `required` or one of its synonyms
    pub fn satisfies(&self, agent_skills: &[String], required: &str) -> bool {
        agent_skills.iter().any(|s| s == required)
            || self
                .synonyms_of(required)
                .iter()
                .any(|syn| agent_skills.iter().any(|s| s == syn))
    }

    /// True if every required skill is satisfied
    pub fn satisfies_all(&self, agent_skills: &[String], required: &[String]) -> bool {
        required.iter().all(|skill| self.satisfies(agent_skills, skill))
    }
}

/// Number of required skills the agent holds verbatim
///
/// Synonyms make an agent eligible but do not add to the match score.
pub fn exact_matches(agent_skills: &[String], required: &[String]) -> usize {
    required
        .iter()
        .filter(|skill| agent_skills.contains(skill))
        .count()
}
