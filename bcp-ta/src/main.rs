//! bcp-ta - territory assignment service
//!
//! Runs the HTTP service, or performs one-shot imports, assignment batches
//! and reports against the same database.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use bcp_common::config::{RootFolderInitializer, RootFolderResolver};
use bcp_common::db::init_database;
use bcp_ta::agent::AgentProfile;
use bcp_ta::config::TaConfig;
use bcp_ta::lead::export::write_csv;
use bcp_ta::lead::{export_leads, import_leads, ExportFormat, ExportParams, LeadExport, RawLead};
use bcp_ta::reports::territory_report;
use bcp_ta::{build_router, AppState};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use std::io::Write;
use tokio::signal;
use uuid::Uuid;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MODULE_NAME: &str = "territory-assignment";

/// Command-line arguments for bcp-ta
#[derive(Parser, Debug)]
#[command(name = "bcp-ta")]
#[command(about = "Lead territory assignment service for BudgetCasa Pro")]
#[command(version)]
struct Cli {
    /// Root folder holding the database
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// TOML config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long, env = "BCP_TA_PORT")]
        port: Option<u16>,
    },
    /// Import leads from a JSON array file
    Import { file: PathBuf },
    /// Register or update agents from a JSON array file
    Agents { file: PathBuf },
    /// Run one assignment batch
    Assign {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        min_quality: Option<u8>,
    },
    /// Print the territory report
    Report,
    /// Export leads as CSV or JSON
    Export {
        #[arg(long)]
        agent_id: Option<Uuid>,
        #[arg(long)]
        territory_id: Option<String>,
        #[arg(long)]
        min_quality: Option<u8>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolver = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(cli.root_folder.clone())
        .with_config_file(cli.config.clone());
    let config_path = resolver.config_file_path();
    let config = TaConfig::load(config_path.as_deref());

    init_tracing(&config)?;

    info!(
        "Starting BudgetCasa Pro territory assignment (bcp-ta) v{}",
        env!("CARGO_PKG_VERSION")
    );
    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => info!("No config file at {}, using defaults", path.display()),
        None => info!("No config directory available, using defaults"),
    }

    let root_folder = resolver.resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    match cli.command {
        Command::Serve { host, port } => serve(pool, config, host, port).await,
        Command::Import { file } => {
            let raws: Vec<RawLead> = read_json(&file)?;
            let summary = import_leads(&pool, raws).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Agents { file } => {
            let profiles: Vec<AgentProfile> = read_json(&file)?;
            let state = AppState::initialize(pool, config).await?;

            let mut registered = 0;
            for profile in profiles {
                let name = format!("{} {}", profile.first_name, profile.last_name);
                match state.registry().register(&state.db, profile).await {
                    Ok(_) => registered += 1,
                    Err(e) => warn!("Skipped agent {}: {}", name, e),
                }
            }
            println!("Registered {} agents", registered);
            Ok(())
        }
        Command::Assign { limit, min_quality } => {
            let state = AppState::initialize(pool, config).await?;
            let options = state
                .config
                .batch_options(&state.db, limit, min_quality)
                .await;
            let report = state.engine.run_batch(options).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Report => {
            let catalog = config.catalog()?;
            let report = territory_report(&pool, &catalog).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Export {
            agent_id,
            territory_id,
            min_quality,
            limit,
            format,
            output,
        } => {
            let catalog = config.catalog()?;
            let params = ExportParams {
                agent_id,
                territory_id,
                min_quality,
                limit,
                format,
                ..ExportParams::default()
            };
            let leads = export_leads(&pool, &catalog, &params).await?;
            let count = leads.len();

            let mut out: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    std::fs::File::create(path)
                        .with_context(|| format!("Cannot create {}", path.display()))?,
                ),
                None => Box::new(std::io::stdout().lock()),
            };
            match format {
                ExportFormat::Csv => write_csv(&leads, &mut out)?,
                ExportFormat::Json => {
                    serde_json::to_writer_pretty(&mut out, &LeadExport::new(leads))?;
                    writeln!(out)?;
                }
            }
            out.flush()?;

            if let Some(path) = &output {
                info!("Exported {} leads to {}", count, path.display());
            }
            Ok(())
        }
    }
}

async fn serve(
    pool: SqlitePool,
    config: TaConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.service.host.clone());
    let port = port.unwrap_or(config.service.port);

    let state = AppState::initialize(pool, config)
        .await
        .context("Failed to initialize service state")?;
    info!(
        "✓ {} agents, {} territories loaded",
        state.registry().len().await,
        state.engine.catalog().len()
    );

    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("bcp-ta listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Console logging plus an optional plain-text log file
///
/// Console output goes to stderr; stdout carries command output.
/// `RUST_LOG` overrides the configured level.
fn init_tracing(config: &TaConfig) -> Result<()> {
    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("bcp_ta={level},bcp_common={level},tower_http={level}").into()
    });

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
