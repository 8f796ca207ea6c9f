//! # Orchestration Types
//!
//! Shared result types for pipeline stages. A stage never fails as a whole:
//! per-farm errors are collected into [`StageResult::failed`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::OrchestratorError;

/// Outcome of a single successful per-farm operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityOutcome {
    /// Operation ran to completion
    Completed,
    /// Preconditions missing; counted as a success with no work done
    Skipped { reason: String },
}

impl EntityOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// A farm whose operation failed inside a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFailure {
    pub farm_id: i64,
    pub error: String,
}

impl EntityFailure {
    pub fn from_error(farm_id: i64, error: &OrchestratorError) -> Self {
        Self {
            farm_id,
            error: error.to_string(),
        }
    }
}

/// Aggregated result of one stage across all target farms.
///
/// `succeeded` includes skipped farms, so `succeeded + failed.len()` always equals
/// the number of farms the stage was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: String,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<EntityFailure>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl StageResult {
    pub fn empty(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            succeeded: 0,
            skipped: 0,
            failed: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// No farm failed
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Some farms failed but the stage still ran to completion
    pub fn is_degraded(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    pub fn failed_farm_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.failed.iter().map(|f| f.farm_id).collect();
        ids.sort_unstable();
        ids
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
