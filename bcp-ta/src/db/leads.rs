//! Lead persistence

use crate::lead::{Lead, LeadStatus};
use crate::territory::Zone;
use bcp_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};

/// Columns selected by every lead query, in `lead_from_row` order
pub const LEAD_COLUMNS: &str = "id, first_name, last_name, email, phone, address_street, \
    address_cap, zona, business_type, estimated_income, family_size, home_ownership, \
    propensity_casa, propensity_auto, propensity_vita, propensity_business, data_source, \
    data_quality_score, conversion_probability, lead_status, assigned_agent_id, territory_id, \
    revenue_opportunity, dedup_key, created_at, updated_at";

/// Insert a lead unless its dedup key already exists
///
/// Returns false when the lead was a duplicate.
pub async fn insert_lead(conn: &mut SqliteConnection, lead: &Lead) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO leads (
            id, first_name, last_name, email, phone, address_street, address_cap, zona,
            business_type, estimated_income, family_size, home_ownership,
            propensity_casa, propensity_auto, propensity_vita, propensity_business,
            data_source, data_quality_score, conversion_probability, lead_status,
            assigned_agent_id, territory_id, revenue_opportunity, dedup_key,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(dedup_key) DO NOTHING
        "#,
    )
    .bind(lead.id.to_string())
    .bind(&lead.first_name)
    .bind(&lead.last_name)
    .bind(&lead.email)
    .bind(&lead.phone)
    .bind(&lead.address_street)
    .bind(&lead.address_cap)
    .bind(lead.zone.as_str())
    .bind(&lead.business_type)
    .bind(lead.estimated_income as i64)
    .bind(lead.family_size as i64)
    .bind(&lead.home_ownership)
    .bind(lead.propensity_casa as i64)
    .bind(lead.propensity_auto as i64)
    .bind(lead.propensity_vita as i64)
    .bind(lead.propensity_business as i64)
    .bind(&lead.data_source)
    .bind(lead.data_quality_score as i64)
    .bind(lead.conversion_probability as i64)
    .bind(lead.status.as_str())
    .bind(lead.assigned_agent_id.map(|id| id.to_string()))
    .bind(&lead.territory_id)
    .bind(lead.revenue_opportunity)
    .bind(&lead.dedup_key)
    .bind(lead.created_at.to_rfc3339())
    .bind(lead.updated_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get_lead(pool: &SqlitePool, id: Uuid) -> Result<Option<Lead>> {
    let sql = format!("SELECT {} FROM leads WHERE id = ?", LEAD_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(lead_from_row).transpose()
}

/// Unassigned new leads ready for routing, best data first
pub async fn load_assignment_queue(
    pool: &SqlitePool,
    min_quality: u8,
    limit: u32,
) -> Result<Vec<Lead>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM leads
        WHERE lead_status = 'new'
          AND assigned_agent_id IS NULL
          AND data_quality_score >= ?
        ORDER BY data_quality_score DESC, created_at ASC, id ASC
        LIMIT ?
        "#,
        LEAD_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(min_quality as i64)
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

    rows.iter().map(lead_from_row).collect()
}

pub async fn count_leads(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub(crate) fn lead_from_row(row: &SqliteRow) -> Result<Lead> {
    let id: String = row.get("id");
    let cap: Option<String> = row.get("address_cap");
    let zona: Option<String> = row.get("zona");
    let status: String = row.get("lead_status");
    let agent_id: Option<String> = row.get("assigned_agent_id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    // Rows written by other tools may carry a zone label we do not know
    let zone = zona
        .as_deref()
        .and_then(|z| z.parse::<Zone>().ok())
        .unwrap_or_else(|| Zone::from_cap(cap.as_deref().unwrap_or_default()));

    Ok(Lead {
        id: parse_uuid(&id)?,
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        address_street: row.get("address_street"),
        address_cap: cap,
        zone,
        business_type: row.get("business_type"),
        estimated_income: row
            .get::<Option<i64>, _>("estimated_income")
            .unwrap_or_default()
            .max(0) as u32,
        family_size: row.get::<i64, _>("family_size").max(0) as u32,
        home_ownership: row.get("home_ownership"),
        propensity_casa: score_column(row, "propensity_casa"),
        propensity_auto: score_column(row, "propensity_auto"),
        propensity_vita: score_column(row, "propensity_vita"),
        propensity_business: score_column(row, "propensity_business"),
        data_source: row.get("data_source"),
        data_quality_score: score_column(row, "data_quality_score"),
        conversion_probability: score_column(row, "conversion_probability"),
        status: status.parse::<LeadStatus>()?,
        assigned_agent_id: agent_id.as_deref().map(parse_uuid).transpose()?,
        territory_id: row.get("territory_id"),
        revenue_opportunity: row.get("revenue_opportunity"),
        dedup_key: row.get("dedup_key"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Read a 0-100 integer column
fn score_column(row: &SqliteRow, column: &str) -> u8 {
    row.get::<i64, _>(column).clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::ingest::normalize;
    use crate::lead::RawLead;
    use bcp_common::db::init_memory_database;

    fn raw(first: &str, email: &str, cap: &str) -> RawLead {
        RawLead {
            first_name: Some(first.to_string()),
            last_name: Some("Rossi".to_string()),
            email: Some(email.to_string()),
            address_cap: Some(cap.to_string()),
            ..RawLead::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let pool = init_memory_database().await.unwrap();
        let lead = normalize(raw("Luca", "luca@example.it", "20121")).unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert!(insert_lead(&mut conn, &lead).await.unwrap());
        drop(conn);

        let loaded = get_lead(&pool, lead.id).await.unwrap().unwrap();
        assert_eq!(loaded, lead);
    }

    #[tokio::test]
    async fn test_insert_duplicate_is_skipped() {
        let pool = init_memory_database().await.unwrap();
        let first = normalize(raw("Luca", "luca@example.it", "20121")).unwrap();
        let second = normalize(raw("Luca", "LUCA@example.it", "20122")).unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert!(insert_lead(&mut conn, &first).await.unwrap());
        assert!(!insert_lead(&mut conn, &second).await.unwrap());
        drop(conn);

        assert_eq!(count_leads(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_assignment_queue_order_and_threshold() {
        let pool = init_memory_database().await.unwrap();

        // Email only: quality 60. Email and phone: quality 85. Name only: 30.
        let mid = normalize(raw("Anna", "anna@example.it", "20121")).unwrap();
        let mut with_phone = raw("Bruno", "bruno@example.it", "20121");
        with_phone.phone = Some("+39 02 1234567".to_string());
        let high = normalize(with_phone).unwrap();
        let low = normalize(RawLead {
            first_name: Some("Carla".to_string()),
            last_name: Some("Neri".to_string()),
            ..RawLead::default()
        })
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        for lead in [&mid, &high, &low] {
            insert_lead(&mut conn, lead).await.unwrap();
        }
        drop(conn);

        let queue = load_assignment_queue(&pool, 60, 10).await.unwrap();
        let ids: Vec<Uuid> = queue.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![high.id, mid.id]);

        let limited = load_assignment_queue(&pool, 0, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
