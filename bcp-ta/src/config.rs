//! Configuration for bcp-ta
//!
//! One TOML file carries the shared `[logging]` and `[service]` sections plus
//! the territory catalog, scoring weights and synonym overrides. Batch options
//! resolve as: explicit argument, then `[assignment]`, then the `settings`
//! table.

use crate::assignment::BatchOptions;
use crate::routing::ScoringWeights;
use crate::territory::{SkillSynonyms, Territory, TerritoryCatalog};
use bcp_common::config::{load_toml_or_default, LoggingConfig, ServiceConfig};
use bcp_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// `[assignment]` section
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentConfig {
    #[serde(default)]
    pub batch_limit: Option<u32>,
    #[serde(default)]
    pub min_quality: Option<u8>,
}

/// Full bcp-ta configuration file
///
/// The file's `root_folder` key is read by `RootFolderResolver`, not here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub assignment: AssignmentConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
    /// Replaces the built-in Milan catalog when non-empty
    #[serde(default)]
    pub territories: Vec<Territory>,
    #[serde(default)]
    pub default_territory: Option<String>,
    /// Entries replace the built-in synonym lists of the same skill
    #[serde(default)]
    pub skill_synonyms: HashMap<String, Vec<String>>,
}

impl TaConfig {
    /// Load from `path`, falling back to defaults if missing or invalid
    pub fn load(path: Option<&Path>) -> Self {
        load_toml_or_default(path)
    }

    pub fn catalog(&self) -> Result<TerritoryCatalog> {
        if self.territories.is_empty() {
            let builtin = TerritoryCatalog::milan_default();
            return match &self.default_territory {
                Some(id) => TerritoryCatalog::new(builtin.iter().cloned().collect(), id.clone()),
                None => Ok(builtin),
            };
        }

        let default_id = self.default_territory.clone().ok_or_else(|| {
            Error::Config("default_territory is required with custom territories".to_string())
        })?;

        info!("Using {} configured territories", self.territories.len());
        TerritoryCatalog::new(self.territories.clone(), default_id)
    }

    pub fn synonyms(&self) -> SkillSynonyms {
        SkillSynonyms::standard().with_overrides(self.skill_synonyms.clone())
    }

    /// Batch options with `limit` / `min_quality` overriding configured values
    pub async fn batch_options(
        &self,
        pool: &SqlitePool,
        limit: Option<u32>,
        min_quality: Option<u8>,
    ) -> BatchOptions {
        let stored = BatchOptions::from_settings(pool).await;
        BatchOptions {
            limit: limit.or(self.assignment.batch_limit).unwrap_or(stored.limit),
            min_quality: min_quality
                .or(self.assignment.min_quality)
                .unwrap_or(stored.min_quality),
        }
    }
}
