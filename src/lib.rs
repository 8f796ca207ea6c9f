#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Farm Orchestrator
//!
//! Batch and external-task orchestration for the farm reporting system.
//!
//! ## Overview
//!
//! Two independent execution paths share the farm registry:
//!
//! - **Scheduled pipeline**: for a period kind (`WEEK`, `MONTH`, `QUARTER`) the
//!   [`orchestration::PipelineCoordinator`] resolves the auto-enrolled farms, fans
//!   statistics and weather ingestion out per farm through the
//!   [`orchestration::StageRunner`], then invokes the aggregation procedure once.
//!   Per-farm failures are recorded and never stop the run.
//! - **Manual tasks**: the [`orchestration::ExternalTaskLauncher`] registers a farm
//!   for manual processing and spawns the ETL program as a child process,
//!   returning a task handle immediately and streaming output as events.
//!
//! ## Module Organization
//!
//! - [`models`] - Farms, enrollments, pipeline runs and external tasks
//! - [`registry`] - Farm registry and enrollment store (Postgres and in-memory)
//! - [`state_machine`] - Pipeline run states and allowed transitions
//! - [`orchestration`] - Stage runner, coordinator, aggregation and task launcher
//! - [`web`] - HTTP trigger surface
//! - [`config`] - Layered YAML/environment configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use farm_orchestrator::config::PipelineConfig;
//! use farm_orchestrator::constants::PeriodKind;
//! use farm_orchestrator::orchestration::{PgAggregationProcedure, PipelineCoordinator};
//! use farm_orchestrator::registry::PgEntityRegistry;
//! use sqlx::PgPool;
//!
//! # async fn example(pool: PgPool) -> farm_orchestrator::Result<()> {
//! let config = PipelineConfig::default();
//! let registry = Arc::new(PgEntityRegistry::new(pool.clone()));
//! let aggregation = Arc::new(PgAggregationProcedure::new(pool, &config.aggregation_procedure)?);
//!
//! let coordinator = PipelineCoordinator::new(registry, aggregation, &config);
//! let run = coordinator.run_scheduled(PeriodKind::Week).await?;
//! println!("run {} ended in {}", run.run_id(), run.state());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test                            # Unit and in-memory integration tests
//! cargo test --features database-tests  # Postgres-backed store tests (needs DATABASE_URL)
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod state_machine;
pub mod web;

pub use config::{ConfigManager, OrchestratorConfig};
pub use constants::{PeriodKind, RegistrationMode};
pub use error::{OrchestratorError, Result};
pub use models::{Enrollment, ExternalTask, Farm, PipelineRun, TaskHandle, TaskStatus};
pub use orchestration::{ExternalTaskLauncher, PipelineCoordinator, StageRunner};
pub use registry::{EntityRegistry, RegistrationStore};
pub use state_machine::PipelineState;
