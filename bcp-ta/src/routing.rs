//! Agent eligibility, scoring and selection for a territory
//!
//! Scoring is a pure function of the agent record, the territory and the
//! weights, so the same inputs always pick the same agent.

use crate::agent::{Agent, AgentStatus, ExperienceTier};
use crate::territory::{exact_matches, Difficulty, SkillSynonyms, Territory};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Success rate at which the success term contributes nothing
pub const SUCCESS_RATE_BASELINE: f64 = 50.0;

/// Weights of the agent-territory compatibility score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub expert: f64,
    pub senior: f64,
    pub junior: f64,
    /// Per required skill held verbatim
    pub skill_match: f64,
    /// Multiplied by the spare capacity fraction
    pub spare_capacity: f64,
    /// Per success-rate point above or below the baseline
    pub success_rate: f64,
    pub preference_bonus: f64,
    pub language_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            expert: 30.0,
            senior: 20.0,
            junior: 10.0,
            skill_match: 15.0,
            spare_capacity: 25.0,
            success_rate: 0.5,
            preference_bonus: 20.0,
            language_bonus: 10.0,
        }
    }
}

impl ScoringWeights {
    pub fn experience(&self, tier: ExperienceTier) -> f64 {
        match tier {
            ExperienceTier::Expert => self.expert,
            ExperienceTier::Senior => self.senior,
            ExperienceTier::Junior => self.junior,
        }
    }
}

/// Leads an agent may hold while working this territory
pub fn effective_capacity(agent: &Agent, territory: &Territory) -> u32 {
    agent.max_leads.min(territory.max_leads_per_agent)
}

/// Whether an agent may receive a lead in this territory
pub fn is_eligible(agent: &Agent, territory: &Territory, synonyms: &SkillSynonyms) -> bool {
    agent.status == AgentStatus::Active
        && agent.current_leads < effective_capacity(agent, territory)
        && synonyms.satisfies_all(&agent.skills, &territory.required_skills)
        && !(territory.difficulty == Difficulty::High
            && agent.experience == ExperienceTier::Junior)
}

/// Compatibility score of an agent for a territory
pub fn score(agent: &Agent, territory: &Territory, weights: &ScoringWeights) -> f64 {
    let mut score = weights.experience(agent.experience);

    score += exact_matches(&agent.skills, &territory.required_skills) as f64 * weights.skill_match;

    let capacity = effective_capacity(agent, territory);
    if capacity > 0 {
        let spare = capacity.saturating_sub(agent.current_leads) as f64 / capacity as f64;
        score += spare * weights.spare_capacity;
    }

    score += (agent.success_rate - SUCCESS_RATE_BASELINE) * weights.success_rate;

    if agent
        .preferred_territories
        .iter()
        .any(|p| territory.matches_preference(p))
    {
        score += weights.preference_bonus;
    }

    if territory.bonus_languages.iter().any(|l| agent.speaks(l)) {
        score += weights.language_bonus;
    }

    score
}

/// The agent chosen for a lead
#[derive(Debug, Clone)]
pub struct Candidate {
    pub agent: Agent,
    pub score: f64,
}

/// Pick the best eligible agent
///
/// Highest score wins; ties go to the agent with the fewest current leads,
/// then to the lowest agent id.
pub fn select_agent(
    agents: &[Agent],
    territory: &Territory,
    synonyms: &SkillSynonyms,
    weights: &ScoringWeights,
) -> Option<Candidate> {
    agents
        .iter()
        .filter(|agent| is_eligible(agent, territory, synonyms))
        .map(|agent| Candidate {
            score: score(agent, territory, weights),
            agent: agent.clone(),
        })
        .min_by(rank)
}

/// Ordering where the preferred candidate compares as Less
fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.agent.current_leads.cmp(&b.agent.current_leads))
        .then_with(|| a.agent.id.cmp(&b.agent.id))
}
