//! # Orchestrator Configuration
//!
//! Layered configuration: an optional base YAML file, an optional per-environment
//! overlay, then `FARM__SECTION__KEY` environment variables. Every field has a
//! default so an empty environment still yields a runnable development setup.
//!
//! ```rust,no_run
//! use farm_orchestrator::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let hint = manager.config().pipeline.parallelism_hint;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use crate::constants::{DEFAULT_AGGREGATION_PROCEDURE, DEFAULT_PARALLELISM_HINT};
use crate::error::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use loader::ConfigManager;

/// Root configuration structure mirroring farm-orchestrator.yaml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub database: DatabaseConfig,
    pub pipeline: PipelineConfig,
    pub manual_tasks: ManualTaskConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/farm_reporting_development".to_string(),
            max_connections: 10,
            acquire_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Passed verbatim to the aggregation procedure
    pub parallelism_hint: i32,
    pub aggregation_procedure: String,
    /// Unbounded fan-out when absent
    pub max_concurrent_entities: Option<usize>,
    /// No per-farm timeout when absent
    pub entity_operation_timeout_seconds: Option<u64>,
    /// Number of ended runs kept in memory for audit
    pub run_history_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallelism_hint: DEFAULT_PARALLELISM_HINT,
            aggregation_procedure: DEFAULT_AGGREGATION_PROCEDURE.to_string(),
            max_concurrent_entities: None,
            entity_operation_timeout_seconds: None,
            run_history_capacity: 50,
        }
    }
}

impl PipelineConfig {
    pub fn entity_operation_timeout(&self) -> Option<Duration> {
        self.entity_operation_timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManualTaskConfig {
    /// Interpreter or executable that runs the ETL job
    pub program: String,
    /// Fixed script/target reference passed as the first argument
    pub target: String,
    pub working_directory: Option<PathBuf>,
    pub event_channel_capacity: usize,
}

impl Default for ManualTaskConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            target: "etl/farm_etl.py".to_string(),
            working_directory: None,
            event_channel_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind_address: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Reject configurations that would fail at runtime rather than at startup
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(OrchestratorError::ConfigurationError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }
        if self.pipeline.parallelism_hint <= 0 {
            return Err(OrchestratorError::ConfigurationError(
                "pipeline.parallelism_hint must be greater than 0".to_string(),
            ));
        }
        if !is_sql_identifier(&self.pipeline.aggregation_procedure) {
            return Err(OrchestratorError::ConfigurationError(format!(
                "pipeline.aggregation_procedure is not a valid identifier: {}",
                self.pipeline.aggregation_procedure
            )));
        }
        if self.pipeline.max_concurrent_entities == Some(0) {
            return Err(OrchestratorError::ConfigurationError(
                "pipeline.max_concurrent_entities must be greater than 0 when set".to_string(),
            ));
        }
        if self.pipeline.entity_operation_timeout_seconds == Some(0) {
            return Err(OrchestratorError::ConfigurationError(
                "pipeline.entity_operation_timeout_seconds must be greater than 0 when set"
                    .to_string(),
            ));
        }
        if self.pipeline.run_history_capacity == 0 {
            return Err(OrchestratorError::ConfigurationError(
                "pipeline.run_history_capacity must be greater than 0".to_string(),
            ));
        }
        if self.manual_tasks.program.trim().is_empty() || self.manual_tasks.target.trim().is_empty()
        {
            return Err(OrchestratorError::ConfigurationError(
                "manual_tasks.program and manual_tasks.target are required".to_string(),
            ));
        }
        if self.manual_tasks.event_channel_capacity == 0 {
            return Err(OrchestratorError::ConfigurationError(
                "manual_tasks.event_channel_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Plain or schema-qualified SQL identifier (`name` or `schema.name`)
pub fn is_sql_identifier(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
