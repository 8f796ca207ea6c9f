//! # Stage Runner
//!
//! Executes one pipeline stage against a set of farms. Every farm gets its own
//! tokio task and the runner joins all of them before returning, so one slow farm
//! delays the stage but one failing farm never affects the others. Errors,
//! timeouts and panics are all folded into [`StageResult::failed`].

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::config::PipelineConfig;
use crate::error::{OrchestratorError, Result};
use crate::models::Farm;
use crate::orchestration::types::{EntityFailure, EntityOutcome, StageResult};

/// Work performed for one farm inside a stage
#[async_trait]
pub trait EntityOperation: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, farm: &Farm) -> Result<EntityOutcome>;
}

#[derive(Debug, Clone, Default)]
pub struct StageRunner {
    /// Caps in-flight farm operations when set
    semaphore: Option<Arc<Semaphore>>,
    operation_timeout: Option<Duration>,
}

impl StageRunner {
    /// Unbounded fan-out, no per-farm timeout
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            semaphore: config
                .max_concurrent_entities
                .map(|limit| Arc::new(Semaphore::new(limit.max(1)))),
            operation_timeout: config.entity_operation_timeout(),
        }
    }

    /// A limit of 0 is treated as 1
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.semaphore = Some(Arc::new(Semaphore::new(limit.max(1))));
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Run `op` for every farm concurrently and wait for all of them
    #[instrument(skip(self, farms, op), fields(farm_count = farms.len(), operation = op.name()))]
    pub async fn run_stage(
        &self,
        stage: &str,
        farms: &[Farm],
        op: Arc<dyn EntityOperation>,
    ) -> StageResult {
        let started = Instant::now();
        let mut result = StageResult::empty(stage);

        let (farm_ids, handles): (Vec<i64>, Vec<JoinHandle<Result<EntityOutcome>>>) = farms
            .iter()
            .cloned()
            .map(|farm| (farm.farm_id, self.spawn_operation(stage, farm, Arc::clone(&op))))
            .unzip();

        let outcomes = join_all(handles).await;

        for (farm_id, joined) in farm_ids.into_iter().zip(outcomes) {
            match joined {
                Ok(Ok(outcome)) => {
                    if let EntityOutcome::Skipped { reason } = &outcome {
                        debug!(farm_id = farm_id, stage = %stage, reason = %reason, "Farm skipped");
                        result.skipped += 1;
                    }
                    result.succeeded += 1;
                }
                Ok(Err(error)) => {
                    let error = match error {
                        err @ OrchestratorError::EntityOperationFailed { .. } => err,
                        other => OrchestratorError::entity_operation_failed(
                            farm_id,
                            stage,
                            other.to_string(),
                        ),
                    };
                    warn!(farm_id = farm_id, stage = %stage, error = %error, "Farm operation failed");
                    result.failed.push(EntityFailure::from_error(farm_id, &error));
                }
                Err(join_error) => {
                    let error = OrchestratorError::entity_operation_failed(
                        farm_id,
                        stage,
                        format!("operation panicked: {join_error}"),
                    );
                    warn!(farm_id = farm_id, stage = %stage, error = %error, "Farm operation panicked");
                    result.failed.push(EntityFailure::from_error(farm_id, &error));
                }
            }
        }

        result.duration = started.elapsed();
        result
    }

    fn spawn_operation(
        &self,
        stage: &str,
        farm: Farm,
        op: Arc<dyn EntityOperation>,
    ) -> JoinHandle<Result<EntityOutcome>> {
        let semaphore = self.semaphore.clone();
        let timeout = self.operation_timeout;
        let stage = stage.to_string();

        tokio::spawn(async move {
            let _permit = match semaphore {
                Some(semaphore) => Some(semaphore.acquire_owned().await.map_err(|e| {
                    OrchestratorError::entity_operation_failed(farm.farm_id, &stage, e.to_string())
                })?),
                None => None,
            };

            match timeout {
                Some(limit) => tokio::time::timeout(limit, op.execute(&farm))
                    .await
                    .map_err(|_| {
                        OrchestratorError::entity_operation_failed(
                            farm.farm_id,
                            &stage,
                            format!("timed out after {}ms", limit.as_millis()),
                        )
                    })?,
                None => op.execute(&farm).await,
            }
        })
    }
}
