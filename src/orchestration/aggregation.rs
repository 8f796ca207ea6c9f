//! Aggregation stage: the single whole-batch call that finalizes a scheduled run.
//!
//! The procedure on the far side is transactional and idempotent per period, so
//! the orchestrator calls it exactly once per run and never retries.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use crate::config::is_sql_identifier;
use crate::constants::PeriodKind;
use crate::error::{OrchestratorError, Result};

#[async_trait]
pub trait AggregationProcedure: Send + Sync {
    /// Failures surface as `AggregationFailed`
    async fn aggregate(&self, period_kind: PeriodKind, parallelism_hint: i32) -> Result<()>;
}

/// Calls a stored procedure `CALL <procedure>(period_kind, parallelism_hint)`
#[derive(Debug, Clone)]
pub struct PgAggregationProcedure {
    pool: PgPool,
    statement: String,
}

impl PgAggregationProcedure {
    /// The procedure name is interpolated into SQL, so it must be a plain identifier
    pub fn new(pool: PgPool, procedure: &str) -> Result<Self> {
        if !is_sql_identifier(procedure) {
            return Err(OrchestratorError::ConfigurationError(format!(
                "Invalid aggregation procedure name: {procedure}"
            )));
        }
        Ok(Self {
            pool,
            statement: format!("CALL {procedure}($1::text, $2::int)"),
        })
    }
}

#[async_trait]
impl AggregationProcedure for PgAggregationProcedure {
    #[instrument(skip(self))]
    async fn aggregate(&self, period_kind: PeriodKind, parallelism_hint: i32) -> Result<()> {
        sqlx::query(&self.statement)
            .bind(period_kind.as_str())
            .bind(parallelism_hint)
            .execute(&self.pool)
            .await
            .map_err(|e| OrchestratorError::aggregation_failed(period_kind.as_str(), e.to_string()))?;
        Ok(())
    }
}
