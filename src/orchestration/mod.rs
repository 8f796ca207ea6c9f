//! # Orchestration
//!
//! The scheduled batch pipeline ([`PipelineCoordinator`] over [`StageRunner`]) and
//! the on-demand external task path ([`ExternalTaskLauncher`]).

pub mod aggregation;
pub mod event_publisher;
pub mod operations;
pub mod pipeline_coordinator;
pub mod stage_runner;
pub mod task_identity;
pub mod task_launcher;
pub mod types;

pub use aggregation::{AggregationProcedure, PgAggregationProcedure};
pub use event_publisher::{OutputStream, TaskEvent, TaskEventKind, TaskEventPublisher};
pub use operations::{StatisticsIngest, WeatherIngest};
pub use pipeline_coordinator::PipelineCoordinator;
pub use stage_runner::{EntityOperation, StageRunner};
pub use task_launcher::{build_arguments, parse_compact_date, ExternalTaskLauncher};
pub use types::{EntityFailure, EntityOutcome, StageResult};
