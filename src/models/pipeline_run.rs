use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::PeriodKind;
use crate::error::{OrchestratorError, Result};
use crate::orchestration::types::StageResult;
use crate::state_machine::PipelineState;

/// One scheduled batch execution.
///
/// Fields are read through accessors and changed only through the methods
/// below; every mutator refuses to touch a run that has reached DONE or FAILED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    run_id: Uuid,
    period_kind: PeriodKind,
    state: PipelineState,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    elapsed_ms: Option<u64>,
    target_count: usize,
    stats_stage: Option<StageResult>,
    weather_stage: Option<StageResult>,
    failure_reason: Option<String>,
}

impl PipelineRun {
    pub fn new(period_kind: PeriodKind) -> Self {
        Self::with_id(Uuid::new_v4(), period_kind)
    }

    pub fn with_id(run_id: Uuid, period_kind: PeriodKind) -> Self {
        Self {
            run_id,
            period_kind,
            state: PipelineState::Ready,
            started_at: Utc::now(),
            ended_at: None,
            elapsed_ms: None,
            target_count: 0,
            stats_stage: None,
            weather_stage: None,
            failure_reason: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn period_kind(&self) -> PeriodKind {
        self.period_kind
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Wall-clock duration, set once the run ends
    pub fn elapsed_ms(&self) -> Option<u64> {
        self.elapsed_ms
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    pub fn stats_stage(&self) -> Option<&StageResult> {
        self.stats_stage.as_ref()
    }

    pub fn weather_stage(&self) -> Option<&StageResult> {
        self.weather_stage.as_ref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn is_ended(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `next`, stamping end time and elapsed time on terminal states
    pub fn transition(&mut self, next: PipelineState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(OrchestratorError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;

        if next.is_terminal() {
            let ended_at = Utc::now();
            let elapsed = (ended_at - self.started_at).num_milliseconds().max(0) as u64;
            self.ended_at = Some(ended_at);
            self.elapsed_ms = Some(elapsed);
        }
        Ok(())
    }

    /// Transition to FAILED, keeping the reason for audit
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(PipelineState::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    pub fn set_target_count(&mut self, count: usize) -> Result<()> {
        self.ensure_open()?;
        self.target_count = count;
        Ok(())
    }

    /// Record the result of the stage the run is currently in
    pub fn record_stage(&mut self, result: StageResult) -> Result<()> {
        self.ensure_open()?;
        match self.state {
            PipelineState::IngestStats => self.stats_stage = Some(result),
            PipelineState::IngestWeather => self.weather_stage = Some(result),
            other => {
                return Err(OrchestratorError::InvalidTransition {
                    from: other.to_string(),
                    to: format!("record {}", result.stage),
                })
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(OrchestratorError::InvalidTransition {
                from: self.state.to_string(),
                to: "mutation".to_string(),
            });
        }
        Ok(())
    }
}
