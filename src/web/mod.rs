//! # Trigger Surface
//!
//! Thin axum layer over the coordinator and the launcher. Scheduled runs and
//! manual tasks are both accepted asynchronously (`202 Accepted`).

pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use errors::{ApiError, ApiResult};
pub use routes::app;
pub use state::AppState;
