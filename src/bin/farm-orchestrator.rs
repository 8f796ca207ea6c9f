//! # Farm Orchestrator
//!
//! Entry point for the orchestrator. `serve` (the default) exposes the HTTP
//! trigger surface; `run` and `manual` execute a single pipeline run or manual
//! task from the command line, which is how cron-style schedulers invoke it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use farm_orchestrator::config::{ConfigManager, OrchestratorConfig};
use farm_orchestrator::constants::PeriodKind;
use farm_orchestrator::logging::init_structured_logging;
use farm_orchestrator::models::TaskStatus;
use farm_orchestrator::orchestration::{
    parse_compact_date, ExternalTaskLauncher, PgAggregationProcedure, PipelineCoordinator,
    TaskEventKind,
};
use farm_orchestrator::registry::{PgEntityRegistry, PgRegistrationStore};
use farm_orchestrator::web::{self, AppState};

#[derive(Parser)]
#[command(name = "farm-orchestrator")]
#[command(about = "Scheduled farm report pipeline and manual ETL launcher")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration directory (default: config)
    #[arg(short, long, env = "FARM_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Environment overlay to load (default: FARM_ENV, APP_ENV or development)
    #[arg(short, long)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP trigger API
    Serve,

    /// Execute one scheduled pipeline run and wait for it to end
    Run {
        /// WEEK, MONTH or QUARTER
        #[arg(short, long)]
        period: PeriodKind,
    },

    /// Launch a manual ETL run for one farm and follow its output
    Manual {
        #[arg(long)]
        entity_id: i64,

        /// First day of the window, YYYYMMDD
        #[arg(long)]
        date_from: Option<String>,

        /// Last day of the window, YYYYMMDD
        #[arg(long)]
        date_to: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_structured_logging();
    let cli = Cli::parse();

    let manager = match &cli.environment {
        Some(environment) => {
            ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), environment)
        }
        None => ConfigManager::load_from_directory(cli.config_dir.clone()),
    }
    .context("Failed to load configuration")?;
    let config = manager.config();

    let pool = connect(config).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, pool).await,
        Commands::Run { period } => run_once(config, pool, period).await,
        Commands::Manual {
            entity_id,
            date_from,
            date_to,
        } => run_manual(config, pool, entity_id, date_from, date_to).await,
    }
}

async fn connect(config: &OrchestratorConfig) -> Result<PgPool> {
    // Lazy so that `serve` starts even while the database is still coming up
    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect_lazy(&config.database.url)
        .context("Invalid database URL")
}

fn build_coordinator(config: &OrchestratorConfig, pool: PgPool) -> Result<PipelineCoordinator> {
    let registry = Arc::new(PgEntityRegistry::new(pool.clone()));
    let aggregation = Arc::new(PgAggregationProcedure::new(
        pool,
        &config.pipeline.aggregation_procedure,
    )?);
    Ok(PipelineCoordinator::new(
        registry,
        aggregation,
        &config.pipeline,
    ))
}

fn build_launcher(config: &OrchestratorConfig, pool: PgPool) -> ExternalTaskLauncher {
    ExternalTaskLauncher::new(
        Arc::new(PgEntityRegistry::new(pool.clone())),
        Arc::new(PgRegistrationStore::new(pool)),
        config.manual_tasks.clone(),
    )
}

async fn serve(config: &OrchestratorConfig, pool: PgPool) -> Result<()> {
    let coordinator = Arc::new(build_coordinator(config, pool.clone())?);
    let launcher = Arc::new(build_launcher(config, pool));
    let app = web::app(AppState::new(coordinator, launcher));

    let bind_address = &config.web.bind_address;
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind to {bind_address}"))?;

    info!("🌾 Farm orchestrator listening on {}", bind_address);
    info!("   Health Check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("🛑 Shutdown signal received");
        })
        .await
        .context("Web server error")?;

    Ok(())
}

async fn run_once(config: &OrchestratorConfig, pool: PgPool, period: PeriodKind) -> Result<()> {
    let coordinator = build_coordinator(config, pool)?;
    let run = coordinator
        .run_scheduled(period)
        .await
        .with_context(|| format!("{period} pipeline run failed"))?;

    println!("{}", serde_json::to_string_pretty(&run)?);
    Ok(())
}

async fn run_manual(
    config: &OrchestratorConfig,
    pool: PgPool,
    entity_id: i64,
    date_from: Option<String>,
    date_to: Option<String>,
) -> Result<()> {
    let date_from = date_from.as_deref().map(parse_compact_date).transpose()?;
    let date_to = date_to.as_deref().map(parse_compact_date).transpose()?;

    let launcher = build_launcher(config, pool);
    // Subscribe first so no event of this task is missed
    let mut events = launcher.subscribe();
    let handle = launcher
        .launch_manual(entity_id, date_from, date_to)
        .await?;
    info!(task_id = %handle.task_id, "Manual task launched");

    loop {
        match events.recv().await {
            Ok(event) if event.task_id != handle.task_id => continue,
            Ok(event) => match event.kind {
                TaskEventKind::Output { line, .. } => println!("{line}"),
                TaskEventKind::Exited { code, status } => {
                    info!(task_id = %handle.task_id, ?code, %status, "Manual task ended");
                    if status == TaskStatus::Failed {
                        anyhow::bail!("task {} exited with {:?}", handle.task_id, code);
                    }
                    return Ok(());
                }
                TaskEventKind::LaunchFailed { reason } => {
                    anyhow::bail!("task {} failed to launch: {}", handle.task_id, reason);
                }
                TaskEventKind::Started { .. } => {}
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event stream lagged, some output lines were dropped");
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}
