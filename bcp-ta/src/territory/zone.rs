//! Milan zones and postal code lookup

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// City zone a lead lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    Centro,
    #[serde(rename = "Porta Nuova", alias = "porta_nuova", alias = "PortaNuova")]
    PortaNuova,
    Navigli,
    Brera,
    Sempione,
    Isola,
    Provincia,
}

impl Zone {
    pub const ALL: [Zone; 7] = [
        Zone::Centro,
        Zone::PortaNuova,
        Zone::Navigli,
        Zone::Brera,
        Zone::Sempione,
        Zone::Isola,
        Zone::Provincia,
    ];

    /// Display label, also the stored database value
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Centro => "Centro",
            Zone::PortaNuova => "Porta Nuova",
            Zone::Navigli => "Navigli",
            Zone::Brera => "Brera",
            Zone::Sempione => "Sempione",
            Zone::Isola => "Isola",
            Zone::Provincia => "Provincia",
        }
    }

    /// Zone for a Milan postal code (CAP); unknown codes fall in the province
    pub fn from_cap(cap: &str) -> Zone {
        match cap.trim() {
            "20121" | "20122" | "20123" => Zone::Centro,
            "20124" | "20125" | "20129" => Zone::PortaNuova,
            "20143" | "20144" => Zone::Navigli,
            "20145" => Zone::Sempione,
            "20154" => Zone::Isola,
            _ => Zone::Provincia,
        }
    }

    /// Baseline yearly household income estimate in euros
    pub fn base_income(&self) -> u32 {
        match self {
            Zone::Centro => 70_000,
            Zone::PortaNuova => 80_000,
            Zone::Sempione => 65_000,
            Zone::Navigli => 58_000,
            Zone::Isola => 55_000,
            Zone::Brera => 90_000,
            Zone::Provincia => 45_000,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        Zone::ALL
            .into_iter()
            .find(|zone| zone.as_str().replace(' ', "").to_lowercase() == normalized)
            .ok_or_else(|| format!("unknown zone '{}'", s))
    }
}
