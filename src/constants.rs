//! Shared enumerations and defaults used across the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default parallelism hint passed to the aggregation procedure
pub const DEFAULT_PARALLELISM_HINT: i32 = 4;

/// Default stored procedure invoked by the aggregation stage
pub const DEFAULT_AGGREGATION_PROCEDURE: &str = "sp_aggregate_farm_reports";

/// Prefix of manual task identities
pub const MANUAL_TASK_PREFIX: &str = "manual";

/// Reporting period covered by a scheduled pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeriodKind {
    Week,
    Month,
    Quarter,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Week => "WEEK",
            PeriodKind::Month => "MONTH",
            PeriodKind::Quarter => "QUARTER",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PeriodKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WEEK" => Ok(PeriodKind::Week),
            "MONTH" => Ok(PeriodKind::Month),
            "QUARTER" => Ok(PeriodKind::Quarter),
            _ => Err(format!("Invalid period kind: {s}")),
        }
    }
}

/// How a farm was enrolled in the ETL service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegistrationMode {
    Auto,
    Manual,
}

impl RegistrationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationMode::Auto => "AUTO",
            RegistrationMode::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for RegistrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RegistrationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTO" => Ok(RegistrationMode::Auto),
            "MANUAL" => Ok(RegistrationMode::Manual),
            _ => Err(format!("Invalid registration mode: {s}")),
        }
    }
}
