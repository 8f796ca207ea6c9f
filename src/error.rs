//! # Orchestrator Error Types
//!
//! Structured error handling for the batch pipeline and the manual task launcher.
//!
//! Only two variants are fatal to a scheduled run: [`OrchestratorError::RegistryUnavailable`]
//! and [`OrchestratorError::AggregationFailed`]. Per-farm failures are recorded as
//! [`OrchestratorError::EntityOperationFailed`] inside a stage result and never unwind.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestratorError {
    #[error("Entity registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Entity operation failed for farm {farm_id} in stage {stage}: {reason}")]
    EntityOperationFailed {
        farm_id: i64,
        stage: String,
        reason: String,
    },

    #[error("Aggregation failed for period {period_kind}: {reason}")]
    AggregationFailed { period_kind: String, reason: String },

    #[error("Farm not found or inactive: {farm_id}")]
    NotFound { farm_id: i64 },

    #[error("Registration storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Failed to launch process for task {task_id}: {reason}")]
    ProcessLaunchFailed { task_id: String, reason: String },

    #[error("Invalid pipeline transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl OrchestratorError {
    pub fn registry_unavailable(message: impl Into<String>) -> Self {
        Self::RegistryUnavailable(message.into())
    }

    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable(message.into())
    }

    pub fn entity_operation_failed(
        farm_id: i64,
        stage: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::EntityOperationFailed {
            farm_id,
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    pub fn aggregation_failed(period_kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AggregationFailed {
            period_kind: period_kind.into(),
            reason: reason.into(),
        }
    }

    pub fn process_launch_failed(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProcessLaunchFailed {
            task_id: task_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts a scheduled pipeline run
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            Self::RegistryUnavailable(_) | Self::AggregationFailed { .. }
        )
    }
}

impl From<config::ConfigError> for OrchestratorError {
    fn from(err: config::ConfigError) -> Self {
        OrchestratorError::ConfigurationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
