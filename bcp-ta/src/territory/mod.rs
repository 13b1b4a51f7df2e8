//! Territories: zones, the territory catalog and skill requirements

pub mod catalog;
pub mod skills;
pub mod zone;

pub use catalog::{Difficulty, Priority, Territory, TerritoryCatalog};
pub use skills::{exact_matches, SkillSynonyms};
pub use zone::Zone;
