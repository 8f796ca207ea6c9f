//! Test doubles for the orchestration seams.
//!
//! Each double records what it was asked to do so tests can assert on call
//! counts and arguments without a database.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use farm_orchestrator::constants::PeriodKind;
use farm_orchestrator::error::{OrchestratorError, Result};
use farm_orchestrator::models::Farm;
use farm_orchestrator::orchestration::{AggregationProcedure, EntityOperation, EntityOutcome};

/// Aggregation procedure that records every call
#[derive(Debug, Default)]
pub struct RecordingAggregation {
    calls: Mutex<Vec<(PeriodKind, i32)>>,
    failure: Option<String>,
}

impl RecordingAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(reason.into()),
        }
    }

    pub fn calls(&self) -> Vec<(PeriodKind, i32)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AggregationProcedure for RecordingAggregation {
    async fn aggregate(&self, period_kind: PeriodKind, parallelism_hint: i32) -> Result<()> {
        self.calls.lock().push((period_kind, parallelism_hint));
        match &self.failure {
            Some(reason) => Err(OrchestratorError::aggregation_failed(
                period_kind.as_str(),
                reason.clone(),
            )),
            None => Ok(()),
        }
    }
}

/// Per-farm operation with scripted failures, delays and panics
#[derive(Debug, Default)]
pub struct ScriptedOperation {
    failing: HashSet<i64>,
    fail_all: bool,
    panicking: HashSet<i64>,
    delay: Option<Duration>,
    seen: Mutex<Vec<i64>>,
}

impl ScriptedOperation {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing_all() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn failing_for(farm_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            failing: farm_ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_panic_for(mut self, farm_id: i64) -> Self {
        self.panicking.insert(farm_id);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Farm ids in the order their operation started
    pub fn seen(&self) -> Vec<i64> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl EntityOperation for ScriptedOperation {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(&self, farm: &Farm) -> Result<EntityOutcome> {
        self.seen.lock().push(farm.farm_id);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panicking.contains(&farm.farm_id) {
            panic!("scripted panic for farm {}", farm.farm_id);
        }
        if self.fail_all || self.failing.contains(&farm.farm_id) {
            return Err(OrchestratorError::ValidationError(format!(
                "scripted failure for farm {}",
                farm.farm_id
            )));
        }
        Ok(EntityOutcome::Completed)
    }
}

/// Ordered event record shared between several doubles
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Indexes of every event starting with `prefix`
    pub fn positions(&self, prefix: &str) -> Vec<usize> {
        self.0
            .lock()
            .iter()
            .enumerate()
            .filter(|(_, event)| event.starts_with(prefix))
            .map(|(index, _)| index)
            .collect()
    }
}

/// Per-farm operation that logs its start and end; farm N sleeps N times `step`
#[derive(Debug)]
pub struct LoggingOperation {
    label: &'static str,
    log: EventLog,
    step: Duration,
}

impl LoggingOperation {
    pub fn new(label: &'static str, log: EventLog, step: Duration) -> Self {
        Self { label, log, step }
    }
}

#[async_trait]
impl EntityOperation for LoggingOperation {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn execute(&self, farm: &Farm) -> Result<EntityOutcome> {
        self.log.record(format!("{}_start:{}", self.label, farm.farm_id));
        let factor = u32::try_from(farm.farm_id).unwrap_or(1);
        tokio::time::sleep(self.step * factor).await;
        self.log.record(format!("{}_done:{}", self.label, farm.farm_id));
        Ok(EntityOutcome::Completed)
    }
}

/// Aggregation procedure that logs when it is called
#[derive(Debug)]
pub struct LoggingAggregation {
    log: EventLog,
}

impl LoggingAggregation {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl AggregationProcedure for LoggingAggregation {
    async fn aggregate(&self, period_kind: PeriodKind, _parallelism_hint: i32) -> Result<()> {
        self.log.record(format!("aggregate:{}", period_kind.as_str()));
        Ok(())
    }
}
