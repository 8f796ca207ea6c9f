//! # Pipeline Coordinator
//!
//! Drives one scheduled run through `READY → INGEST_STATS → INGEST_WEATHER →
//! AGGREGATE → DONE`. Ingest stages never gate advancement: aggregation runs even
//! when every farm failed upstream, because the procedure tolerates missing rows.
//! Only a registry failure at READY or an aggregation failure ends in FAILED, and
//! those are the only errors returned to the caller.
//!
//! Nothing is retried here; retry policy belongs to whatever scheduler triggers runs.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::constants::PeriodKind;
use crate::error::{OrchestratorError, Result};
use crate::logging::{log_error, log_pipeline_operation, log_stage_result};
use crate::models::{Farm, PipelineRun};
use crate::orchestration::aggregation::AggregationProcedure;
use crate::orchestration::operations::{StatisticsIngest, WeatherIngest};
use crate::orchestration::stage_runner::{EntityOperation, StageRunner};
use crate::registry::EntityRegistry;
use crate::state_machine::PipelineState;

pub struct PipelineCoordinator {
    registry: Arc<dyn EntityRegistry>,
    aggregation: Arc<dyn AggregationProcedure>,
    stats_operation: Arc<dyn EntityOperation>,
    weather_operation: Arc<dyn EntityOperation>,
    stage_runner: StageRunner,
    parallelism_hint: i32,
    /// Ended runs, oldest first
    history: RwLock<VecDeque<PipelineRun>>,
    history_capacity: usize,
}

impl PipelineCoordinator {
    /// Coordinator with the default ingestion operations
    pub fn new(
        registry: Arc<dyn EntityRegistry>,
        aggregation: Arc<dyn AggregationProcedure>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            registry,
            aggregation,
            stats_operation: Arc::new(StatisticsIngest::new()),
            weather_operation: Arc::new(WeatherIngest::new()),
            stage_runner: StageRunner::from_config(config),
            parallelism_hint: config.parallelism_hint,
            history: RwLock::new(VecDeque::new()),
            history_capacity: config.run_history_capacity.max(1),
        }
    }

    /// Replace the per-farm ingestion operations
    pub fn with_operations(
        mut self,
        stats_operation: Arc<dyn EntityOperation>,
        weather_operation: Arc<dyn EntityOperation>,
    ) -> Self {
        self.stats_operation = stats_operation;
        self.weather_operation = weather_operation;
        self
    }

    pub fn with_stage_runner(mut self, stage_runner: StageRunner) -> Self {
        self.stage_runner = stage_runner;
        self
    }

    /// Start a run in the background and return its id immediately.
    /// The outcome is only observable through logs and [`Self::recent_runs`].
    pub fn trigger(self: &Arc<Self>, period_kind: PeriodKind) -> Uuid {
        let run = PipelineRun::new(period_kind);
        let run_id = run.run_id();
        let coordinator = Arc::clone(self);

        tokio::spawn(async move {
            if let Err(error) = coordinator.execute_run(run).await {
                log_error(
                    "pipeline_coordinator",
                    "trigger",
                    &error.to_string(),
                    Some(&run_id.to_string()),
                );
            }
        });

        run_id
    }

    /// Run the full pipeline for `period_kind` and wait for it to end
    pub async fn run_scheduled(&self, period_kind: PeriodKind) -> Result<PipelineRun> {
        self.execute_run(PipelineRun::new(period_kind)).await
    }

    #[instrument(skip(self, run), fields(run_id = %run.run_id(), period_kind = %run.period_kind()))]
    async fn execute_run(&self, mut run: PipelineRun) -> Result<PipelineRun> {
        let run_id = run.run_id().to_string();
        let period_kind = run.period_kind();
        log_pipeline_operation(
            "run_started",
            &run_id,
            period_kind.as_str(),
            run.state().as_str(),
            None,
        );

        let targets = match self.registry.list_scheduled_targets(period_kind).await {
            Ok(targets) => targets,
            Err(error) => {
                let error = match error {
                    err @ OrchestratorError::RegistryUnavailable(_) => err,
                    other => OrchestratorError::registry_unavailable(other.to_string()),
                };
                return Err(self.fail_run(run, error));
            }
        };
        run.set_target_count(targets.len())?;
        if targets.is_empty() {
            info!(run_id = %run_id, "No scheduled targets, continuing with empty set");
        }

        self.run_ingest_stage(&mut run, PipelineState::IngestStats, &targets)
            .await?;
        self.run_ingest_stage(&mut run, PipelineState::IngestWeather, &targets)
            .await?;

        run.transition(PipelineState::Aggregate)?;
        log_pipeline_operation(
            "aggregation_started",
            &run_id,
            period_kind.as_str(),
            run.state().as_str(),
            None,
        );

        if let Err(error) = self
            .aggregation
            .aggregate(period_kind, self.parallelism_hint)
            .await
        {
            let error = match error {
                err @ OrchestratorError::AggregationFailed { .. } => err,
                other => OrchestratorError::aggregation_failed(period_kind.as_str(), other.to_string()),
            };
            return Err(self.fail_run(run, error));
        }

        run.transition(PipelineState::Done)?;
        let details = format!(
            "targets={} elapsed_ms={}",
            run.target_count(),
            run.elapsed_ms().unwrap_or_default()
        );
        log_pipeline_operation(
            "run_completed",
            &run_id,
            period_kind.as_str(),
            run.state().as_str(),
            Some(&details),
        );

        self.archive(run.clone());
        Ok(run)
    }

    async fn run_ingest_stage(
        &self,
        run: &mut PipelineRun,
        stage: PipelineState,
        targets: &[Farm],
    ) -> Result<()> {
        run.transition(stage)?;
        let operation = match stage {
            PipelineState::IngestStats => Arc::clone(&self.stats_operation),
            _ => Arc::clone(&self.weather_operation),
        };

        let result = self
            .stage_runner
            .run_stage(stage.as_str(), targets, operation)
            .await;

        log_stage_result(
            &run.run_id().to_string(),
            stage.as_str(),
            result.succeeded,
            result.skipped,
            result.failed.len(),
            result.duration.as_millis() as u64,
        );
        run.record_stage(result)
    }

    /// Move the run to FAILED, archive it and hand back the error for the caller
    fn fail_run(&self, mut run: PipelineRun, error: OrchestratorError) -> OrchestratorError {
        let from_state = run.state();
        if let Err(transition_error) = run.fail(error.to_string()) {
            log_error(
                "pipeline_coordinator",
                "fail_run",
                &transition_error.to_string(),
                Some(&run.run_id().to_string()),
            );
        }
        log_error(
            "pipeline_coordinator",
            from_state.as_str(),
            &error.to_string(),
            Some(&run.run_id().to_string()),
        );
        self.archive(run);
        error
    }

    fn archive(&self, run: PipelineRun) {
        let mut history = self.history.write();
        if history.len() == self.history_capacity {
            history.pop_front();
        }
        history.push_back(run);
    }

    /// Ended runs, newest first
    pub fn recent_runs(&self) -> Vec<PipelineRun> {
        self.history.read().iter().rev().cloned().collect()
    }

    pub fn find_run(&self, run_id: Uuid) -> Option<PipelineRun> {
        self.history
            .read()
            .iter()
            .find(|run| run.run_id() == run_id)
            .cloned()
    }
}
