//! # Models
//!
//! Data types owned or read by the orchestrator. `Farm` and `Enrollment` map to
//! database rows; `PipelineRun` and `ExternalTask` live only in memory.

pub mod enrollment;
pub mod external_task;
pub mod farm;
pub mod pipeline_run;

pub use enrollment::Enrollment;
pub use external_task::{ExternalTask, TaskHandle, TaskStatus};
pub use farm::Farm;
pub use pipeline_run::PipelineRun;
