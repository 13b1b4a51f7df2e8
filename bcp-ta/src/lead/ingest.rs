//! Lead normalisation, scoring and import
//!
//! Raw records come from directory scrapes (business listings) or from
//! hand-entered contacts. Normalisation derives the zone, an income estimate,
//! per-product propensity scores and a data quality score. All derived values
//! are deterministic.

use super::types::{Lead, LeadStatus, RawLead};
use crate::db;
use crate::territory::Zone;
use bcp_common::{Error, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Business type given to scraped insurance listings
pub const INSURANCE_PROFESSIONAL: &str = "insurance_professional";

/// Person-name heuristics for listing titles, tried in order
///
/// Each pattern captures first and last name as its final two groups.
static LISTING_NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // "Dott. Mario Rossi", "Ing Paolo Verdi"
        r"(?i)^(Dott\.?\s+|Dr\.?\s+|Sig\.?\s+|Ing\.?\s+)([A-Z][a-z]+)\s+([A-Z][a-z]+)",
        // "Mario Rossi - Assicurazioni"
        r"(?i)^([A-Z][a-z]+)\s+([A-Z][a-z]+)\s*-?\s*Assicurazioni",
        // A bare "Mario Rossi"
        r"^([A-Z][a-z]+)\s+([A-Z][a-z]+)$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("listing name pattern is valid"))
    .collect()
});

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub duplicates: usize,
    pub rejected: usize,
    /// Reasons for rejected records, keyed by position in the input
    pub rejections: Vec<Rejection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub index: usize,
    pub reason: String,
}

/// Split a listing title into first and last name
///
/// Titles that do not look like a person become first name "Business" with
/// the whole title as last name.
pub fn split_listing_name(title: &str) -> (String, String) {
    let title = title.trim();

    for pattern in LISTING_NAME_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(title) {
            let n = caps.len();
            if let (Some(first), Some(last)) = (caps.get(n - 2), caps.get(n - 1)) {
                return (first.as_str().to_string(), last.as_str().to_string());
            }
        }
    }

    ("Business".to_string(), title.to_string())
}

/// Yearly household income estimate for a zone
pub fn estimate_income(zone: Zone) -> u32 {
    zone.base_income()
}

fn clamp_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Home insurance propensity
pub fn propensity_casa(zone: Zone, income: u32) -> u8 {
    let multiplier = match zone {
        Zone::Centro => 1.2,
        Zone::PortaNuova => 1.3,
        Zone::Sempione => 1.1,
        Zone::Navigli => 1.0,
        Zone::Isola => 0.9,
        Zone::Brera => 1.4,
        Zone::Provincia => 0.8,
    };

    let income_step = if income > 60_000 {
        20.0
    } else if income > 40_000 {
        10.0
    } else {
        -10.0
    };

    clamp_score(50.0 * multiplier + income_step)
}

/// Car insurance propensity; higher outside the centre where more people drive
pub fn propensity_auto(zone: Zone, income: u32) -> u8 {
    let multiplier = match zone {
        Zone::Centro => 0.7,
        Zone::PortaNuova => 0.8,
        Zone::Sempione => 1.0,
        Zone::Navigli => 0.9,
        Zone::Isola => 0.9,
        Zone::Brera => 0.8,
        Zone::Provincia => 1.3,
    };

    let income_step = if income > 50_000 { 15.0 } else { 0.0 };
    clamp_score(60.0 * multiplier + income_step)
}

/// Life insurance propensity; driven by income only
pub fn propensity_vita(income: u32) -> u8 {
    let income_step = if income > 70_000 {
        25.0
    } else if income > 50_000 {
        15.0
    } else {
        0.0
    };
    clamp_score(40.0 + income_step)
}

pub fn propensity_business(business_type: Option<&str>) -> u8 {
    if business_type == Some(INSURANCE_PROFESSIONAL) {
        85
    } else {
        20
    }
}

/// Completeness of contact data, 0-100
pub fn data_quality(email: Option<&str>, phone: Option<&str>, street: Option<&str>) -> u8 {
    let mut score: u32 = 30;
    if email.is_some() {
        score += 30;
    }
    if phone.is_some() {
        score += 25;
    }
    if street.is_some_and(|s| s.chars().count() > 10) {
        score += 15;
    }
    score.min(100) as u8
}

/// Conversion likelihood in percent, 40 to 70 by data quality
pub fn conversion_probability(quality: u8) -> u8 {
    (40 + quality.min(100) as u32 * 30 / 100) as u8
}

/// Identity used to reject repeated leads
///
/// Lowercased email, else phone digits, else `first|last|cap` lowercased.
pub fn dedup_key(
    first_name: &str,
    last_name: &str,
    email: Option<&str>,
    phone: Option<&str>,
    cap: Option<&str>,
) -> String {
    if let Some(email) = email {
        return email.to_lowercase();
    }

    if let Some(digits) = phone
        .map(|p| p.chars().filter(char::is_ascii_digit).collect::<String>())
        .filter(|d| !d.is_empty())
    {
        return digits;
    }

    format!("{}|{}|{}", first_name, last_name, cap.unwrap_or_default()).to_lowercase()
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Keep digits and a leading plus sign
fn clean_phone(value: Option<String>) -> Option<String> {
    clean(value)
        .map(|p| {
            p.chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .collect::<String>()
        })
        .filter(|p| p.chars().any(|c| c.is_ascii_digit()))
}

/// Turn a raw record into a scored lead with status `new`
pub fn normalize(raw: RawLead) -> Result<Lead> {
    let first_name = clean(raw.first_name);
    let last_name = clean(raw.last_name);
    let business_name = clean(raw.business_name);
    let cap = clean(raw.address_cap);

    let (first_name, last_name, from_listing) = match (first_name, last_name, business_name) {
        (Some(first), Some(last), _) => (first, last, false),
        (_, _, Some(title)) => {
            let (first, last) = split_listing_name(&title);
            (first, last, true)
        }
        _ => {
            return Err(Error::InvalidInput(
                "lead needs first and last name or a business name".to_string(),
            ))
        }
    };

    if first_name.chars().count() < 2 || last_name.chars().count() < 2 {
        return Err(Error::InvalidInput(format!(
            "name '{} {}' is too short",
            first_name, last_name
        )));
    }

    let email = clean(raw.email);
    let phone = clean_phone(raw.phone);

    // Listings without a street are placed in their postal code area
    let street = clean(raw.address_street).or_else(|| {
        if from_listing {
            cap.as_ref().map(|c| format!("Milano {}", c))
        } else {
            None
        }
    });

    let business_type = clean(raw.business_type).or_else(|| {
        if from_listing {
            Some(INSURANCE_PROFESSIONAL.to_string())
        } else {
            None
        }
    });

    let zone = raw
        .zone
        .unwrap_or_else(|| Zone::from_cap(cap.as_deref().unwrap_or_default()));
    let income = estimate_income(zone);
    let quality = data_quality(email.as_deref(), phone.as_deref(), street.as_deref());
    let key = dedup_key(
        &first_name,
        &last_name,
        email.as_deref(),
        phone.as_deref(),
        cap.as_deref(),
    );
    let now = Utc::now();

    Ok(Lead {
        id: Uuid::new_v4(),
        propensity_casa: propensity_casa(zone, income),
        propensity_auto: propensity_auto(zone, income),
        propensity_vita: propensity_vita(income),
        propensity_business: propensity_business(business_type.as_deref()),
        first_name,
        last_name,
        email,
        phone,
        address_street: street,
        address_cap: cap,
        zone,
        business_type,
        estimated_income: income,
        family_size: raw.family_size.unwrap_or(1).max(1),
        home_ownership: clean(raw.home_ownership).unwrap_or_else(|| "unknown".to_string()),
        data_source: clean(raw.data_source),
        data_quality_score: quality,
        conversion_probability: conversion_probability(quality),
        status: LeadStatus::New,
        assigned_agent_id: None,
        territory_id: None,
        revenue_opportunity: None,
        dedup_key: key,
        created_at: now,
        updated_at: now,
    })
}

/// Normalise and store a batch of raw leads in one transaction
///
/// Invalid records are rejected and counted; records whose dedup key already
/// exists, in the database or earlier in the batch, are counted as duplicates.
pub async fn import_leads(pool: &SqlitePool, raws: Vec<RawLead>) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut tx = pool.begin().await?;

    for (index, raw) in raws.into_iter().enumerate() {
        let lead = match normalize(raw) {
            Ok(lead) => lead,
            Err(e) => {
                warn!("Rejected lead #{}: {}", index, e);
                summary.rejected += 1;
                summary.rejections.push(Rejection {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if db::leads::insert_lead(&mut tx, &lead).await? {
            debug!("Imported lead {} ({})", lead.display_name(), lead.id);
            summary.imported += 1;
        } else {
            debug!("Skipped duplicate lead {}", lead.dedup_key);
            summary.duplicates += 1;
        }
    }

    tx.commit().await?;

    info!(
        "Lead import: {} imported, {} duplicates, {} rejected",
        summary.imported, summary.duplicates, summary.rejected
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_listing_name_title_prefix() {
        assert_eq!(
            split_listing_name("Dott. Mario Rossi Consulenze"),
            ("Mario".to_string(), "Rossi".to_string())
        );
        assert_eq!(
            split_listing_name("ing paolo verdi"),
            ("paolo".to_string(), "verdi".to_string())
        );
    }

    #[test]
    fn test_split_listing_name_agency_suffix() {
        assert_eq!(
            split_listing_name("Laura Bianchi - Assicurazioni"),
            ("Laura".to_string(), "Bianchi".to_string())
        );
    }

    #[test]
    fn test_split_listing_name_company_fallback() {
        assert_eq!(
            split_listing_name("Generali Agenzia Milano Centro"),
            ("Business".to_string(), "Generali Agenzia Milano Centro".to_string())
        );
    }

    #[test]
    fn test_propensity_scores() {
        // Porta Nuova, 80k: 50 * 1.3 + 20
        assert_eq!(propensity_casa(Zone::PortaNuova, 80_000), 85);
        // Provincia, 45k: 50 * 0.8 + 10
        assert_eq!(propensity_casa(Zone::Provincia, 45_000), 50);
        // Provincia, 45k: 60 * 1.3
        assert_eq!(propensity_auto(Zone::Provincia, 45_000), 78);
        // Centro, 70k: 60 * 0.7 + 15
        assert_eq!(propensity_auto(Zone::Centro, 70_000), 57);
        assert_eq!(propensity_vita(90_000), 65);
        assert_eq!(propensity_vita(58_000), 55);
        assert_eq!(propensity_vita(45_000), 40);
        assert_eq!(propensity_casa(Zone::Brera, 90_000), 90);
    }

    #[test]
    fn test_data_quality() {
        assert_eq!(data_quality(None, None, None), 30);
        assert_eq!(data_quality(Some("a@b.it"), None, None), 60);
        assert_eq!(data_quality(Some("a@b.it"), Some("021234"), Some("Via Roma 12")), 100);
        assert_eq!(data_quality(None, None, Some("Via Roma")), 30);
    }

    #[test]
    fn test_conversion_probability_range() {
        assert_eq!(conversion_probability(0), 40);
        assert_eq!(conversion_probability(60), 58);
        assert_eq!(conversion_probability(100), 70);
    }

    #[test]
    fn test_dedup_key_precedence() {
        assert_eq!(
            dedup_key("Mario", "Rossi", Some("Mario@Example.it"), Some("+39 02 1"), None),
            "mario@example.it"
        );
        assert_eq!(dedup_key("Mario", "Rossi", None, Some("+39 02-11"), None), "390211");
        assert_eq!(dedup_key("Mario", "Rossi", None, None, Some("20121")), "mario|rossi|20121");
    }

    #[test]
    fn test_normalize_business_listing() {
        let lead = normalize(RawLead {
            business_name: Some("Dott. Mario Rossi".to_string()),
            phone: Some("02 1234 5678".to_string()),
            address_cap: Some("20121".to_string()),
            data_source: Some("pagine_gialle".to_string()),
            ..RawLead::default()
        })
        .unwrap();

        assert_eq!(lead.first_name, "Mario");
        assert_eq!(lead.last_name, "Rossi");
        assert_eq!(lead.zone, Zone::Centro);
        assert_eq!(lead.estimated_income, 70_000);
        assert_eq!(lead.address_street.as_deref(), Some("Milano 20121"));
        assert_eq!(lead.business_type.as_deref(), Some(INSURANCE_PROFESSIONAL));
        assert_eq!(lead.propensity_business, 85);
        assert_eq!(lead.phone.as_deref(), Some("0212345678"));
        // 30 + 25 phone + 15 street
        assert_eq!(lead.data_quality_score, 70);
        assert_eq!(lead.status, LeadStatus::New);
    }

    #[test]
    fn test_normalize_is_deterministic_apart_from_identity() {
        let raw = RawLead {
            first_name: Some("Anna".to_string()),
            last_name: Some("Verdi".to_string()),
            email: Some("anna@example.it".to_string()),
            address_cap: Some("20143".to_string()),
            ..RawLead::default()
        };

        let a = normalize(raw.clone()).unwrap();
        let b = normalize(raw).unwrap();
        assert_eq!(a.propensity_casa, b.propensity_casa);
        assert_eq!(a.propensity_auto, b.propensity_auto);
        assert_eq!(a.conversion_probability, b.conversion_probability);
        assert_eq!(a.dedup_key, b.dedup_key);
        assert_eq!(a.zone, Zone::Navigli);
        assert_eq!(a.propensity_business, 20);
    }

    #[test]
    fn test_normalize_rejects_short_or_missing_names() {
        let short = RawLead {
            first_name: Some("A".to_string()),
            last_name: Some("Verdi".to_string()),
            ..RawLead::default()
        };
        assert!(matches!(normalize(short), Err(Error::InvalidInput(_))));
        assert!(normalize(RawLead::default()).is_err());
    }

    #[test]
    fn test_explicit_zone_overrides_cap() {
        let lead = normalize(RawLead {
            first_name: Some("Anna".to_string()),
            last_name: Some("Verdi".to_string()),
            address_cap: Some("20121".to_string()),
            zone: Some(Zone::Brera),
            ..RawLead::default()
        })
        .unwrap();
        assert_eq!(lead.zone, Zone::Brera);
        assert_eq!(lead.estimated_income, 90_000);
    }

    #[tokio::test]
    async fn test_import_counts_duplicates_and_rejections() {
        let pool = bcp_common::db::init_memory_database().await.unwrap();
        let person = |email: &str| RawLead {
            first_name: Some("Luca".to_string()),
            last_name: Some("Neri".to_string()),
            email: Some(email.to_string()),
            ..RawLead::default()
        };

        let summary = import_leads(
            &pool,
            vec![person("luca@example.it"), person("LUCA@example.it"), RawLead::default()],
        )
        .await
        .unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.rejections[0].index, 2);

        let again = import_leads(&pool, vec![person("luca@example.it")]).await.unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.duplicates, 1);
    }
}
