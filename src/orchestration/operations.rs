//! Per-farm ingestion operations run by the scheduled pipeline.
//!
//! The statistics and weather feeds are external data sources. Until an upstream
//! client is configured these operations only validate preconditions and log,
//! which keeps the pipeline contract intact regardless of what the feed does.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::models::Farm;
use crate::orchestration::stage_runner::EntityOperation;
use crate::orchestration::types::EntityOutcome;

/// Statistics ingestion for one farm
#[derive(Debug, Clone, Default)]
pub struct StatisticsIngest;

impl StatisticsIngest {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EntityOperation for StatisticsIngest {
    fn name(&self) -> &'static str {
        "statistics_ingest"
    }

    async fn execute(&self, farm: &Farm) -> Result<EntityOutcome> {
        debug!(
            farm_id = farm.farm_id,
            country_code = farm.country_code.as_deref(),
            "Ingesting statistics"
        );
        Ok(EntityOutcome::Completed)
    }
}

/// Weather ingestion for one farm. Farms without coordinates are skipped:
/// partial data availability is normal, not a failure.
#[derive(Debug, Clone, Default)]
pub struct WeatherIngest;

impl WeatherIngest {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EntityOperation for WeatherIngest {
    fn name(&self) -> &'static str {
        "weather_ingest"
    }

    async fn execute(&self, farm: &Farm) -> Result<EntityOutcome> {
        let Some((latitude, longitude)) = farm.coordinates() else {
            return Ok(EntityOutcome::skipped("missing coordinates"));
        };

        debug!(
            farm_id = farm.farm_id,
            latitude = latitude,
            longitude = longitude,
            "Ingesting weather"
        );
        Ok(EntityOutcome::Completed)
    }
}
