//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies connection pragmas and
//! creates every table idempotently. Safe to call on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::settings::ensure_setting;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Default for the minimum data quality a lead needs to enter an assignment batch
pub const DEFAULT_ASSIGNMENT_MIN_QUALITY: &str = "60";
/// Default number of leads considered per assignment batch
pub const DEFAULT_ASSIGNMENT_BATCH_LIMIT: &str = "100";
/// Default EventBus channel capacity
pub const DEFAULT_EVENT_BUS_CAPACITY: &str = "500";

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas go through the connect options so every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create an in-memory database with the full schema
///
/// A single connection is used so every query sees the same in-memory file.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create every table, index and default setting
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_agents_table(pool).await?;
    create_leads_table(pool).await?;
    create_lead_assignments_table(pool).await?;

    init_default_settings(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores runtime configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_agents_table(pool: &SqlitePool) -> Result<()> {
    // List-valued columns (skills, languages, preferred_territories) hold JSON arrays
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agents (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            skills TEXT NOT NULL DEFAULT '[]',
            languages TEXT NOT NULL DEFAULT '[]',
            experience TEXT NOT NULL DEFAULT 'junior',
            max_leads INTEGER NOT NULL CHECK (max_leads > 0),
            preferred_territories TEXT NOT NULL DEFAULT '[]',
            current_leads INTEGER NOT NULL DEFAULT 0 CHECK (current_leads >= 0),
            total_assigned INTEGER NOT NULL DEFAULT 0,
            success_rate REAL NOT NULL DEFAULT 50,
            avg_deal_size REAL NOT NULL DEFAULT 8000,
            last_assignment TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_leads_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            address_street TEXT,
            address_cap TEXT,
            zona TEXT,
            business_type TEXT,
            estimated_income INTEGER,
            family_size INTEGER NOT NULL DEFAULT 1,
            home_ownership TEXT NOT NULL DEFAULT 'unknown',
            propensity_casa INTEGER NOT NULL DEFAULT 0,
            propensity_auto INTEGER NOT NULL DEFAULT 0,
            propensity_vita INTEGER NOT NULL DEFAULT 0,
            propensity_business INTEGER NOT NULL DEFAULT 0,
            data_source TEXT,
            data_quality_score INTEGER NOT NULL DEFAULT 50,
            conversion_probability INTEGER NOT NULL DEFAULT 0,
            lead_status TEXT NOT NULL DEFAULT 'new',
            assigned_agent_id TEXT REFERENCES agents(id),
            territory_id TEXT,
            revenue_opportunity REAL,
            dedup_key TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_leads_assignment_queue ON leads (lead_status, data_quality_score)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_agent ON leads (assigned_agent_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_lead_assignments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lead_assignments (
            id TEXT PRIMARY KEY,
            lead_id TEXT NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
            agent_id TEXT NOT NULL REFERENCES agents(id),
            territory_id TEXT NOT NULL,
            score REAL NOT NULL,
            priority TEXT NOT NULL,
            estimated_value REAL NOT NULL,
            assigned_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_lead_assignments_agent ON lead_assignments (agent_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Ensure every runtime setting exists, resetting NULL values to defaults
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "assignment_min_quality", DEFAULT_ASSIGNMENT_MIN_QUALITY).await?;
    ensure_setting(pool, "assignment_batch_limit", DEFAULT_ASSIGNMENT_BATCH_LIMIT).await?;
    ensure_setting(pool, "event_bus_capacity", DEFAULT_EVENT_BUS_CAPACITY).await?;
    Ok(())
}
