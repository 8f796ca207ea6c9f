//! State machine for scheduled pipeline runs.
//!
//! Transitions are validated here and applied by `PipelineRun::transition`, which
//! also freezes the run once a terminal state is reached.

pub mod states;

pub use states::PipelineState;
