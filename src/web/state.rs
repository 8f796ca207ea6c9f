//! # Web API Application State

use std::sync::Arc;

use crate::orchestration::{ExternalTaskLauncher, PipelineCoordinator};

/// Shared handles the trigger endpoints call into
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<PipelineCoordinator>,
    pub launcher: Arc<ExternalTaskLauncher>,
}

impl AppState {
    pub fn new(coordinator: Arc<PipelineCoordinator>, launcher: Arc<ExternalTaskLauncher>) -> Self {
        Self {
            coordinator,
            launcher,
        }
    }
}
