use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one scheduled pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    /// Run created, targets not yet fetched
    #[default]
    Ready,
    /// Statistics ingestion fan-out in progress
    IngestStats,
    /// Weather ingestion fan-out in progress
    IngestWeather,
    /// Single aggregation call in progress
    Aggregate,
    /// Run completed, possibly with degraded stages
    Done,
    /// Registry unreachable or aggregation failed
    Failed,
}

impl PipelineState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Check if the run is past READY and not yet ended
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::IngestStats | Self::IngestWeather | Self::Aggregate
        )
    }

    /// Allowed transitions. FAILED is reachable only from READY (registry
    /// failure) and AGGREGATE (aggregation failure).
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        matches!(
            (self, next),
            (Self::Ready, Self::IngestStats)
                | (Self::Ready, Self::Failed)
                | (Self::IngestStats, Self::IngestWeather)
                | (Self::IngestWeather, Self::Aggregate)
                | (Self::Aggregate, Self::Done)
                | (Self::Aggregate, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::IngestStats => "INGEST_STATS",
            Self::IngestWeather => "INGEST_WEATHER",
            Self::Aggregate => "AGGREGATE",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PipelineState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(Self::Ready),
            "INGEST_STATS" => Ok(Self::IngestStats),
            "INGEST_WEATHER" => Ok(Self::IngestWeather),
            "AGGREGATE" => Ok(Self::Aggregate),
            "DONE" => Ok(Self::Done),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Invalid pipeline state: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            PipelineState::Ready,
            PipelineState::IngestStats,
            PipelineState::IngestWeather,
            PipelineState::Aggregate,
            PipelineState::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failed_only_from_ready_or_aggregate() {
        assert!(PipelineState::Ready.can_transition_to(PipelineState::Failed));
        assert!(PipelineState::Aggregate.can_transition_to(PipelineState::Failed));
        assert!(!PipelineState::IngestStats.can_transition_to(PipelineState::Failed));
        assert!(!PipelineState::IngestWeather.can_transition_to(PipelineState::Failed));
    }

    #[test]
    fn test_no_skipping_and_no_leaving_terminal_states() {
        assert!(!PipelineState::Ready.can_transition_to(PipelineState::Aggregate));
        assert!(!PipelineState::IngestStats.can_transition_to(PipelineState::Done));
        assert!(!PipelineState::Done.can_transition_to(PipelineState::Ready));
        assert!(!PipelineState::Failed.can_transition_to(PipelineState::Aggregate));
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(PipelineState::IngestWeather.is_active());
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&PipelineState::IngestWeather).unwrap();
        assert_eq!(json, "\"INGEST_WEATHER\"");
        assert_eq!(
            "AGGREGATE".parse::<PipelineState>().unwrap(),
            PipelineState::Aggregate
        );
    }

    #[test]
    fn test_default_state_is_ready() {
        assert_eq!(PipelineState::default(), PipelineState::Ready);
        assert!(PipelineState::default().can_transition_to(PipelineState::IngestStats));
    }
}
