//! # Structured Logging Module
//!
//! Environment-aware console logging using the tracing ecosystem. The log sink is
//! also where manual task output ends up, so every record carries enough fields
//! (run id, task id, farm id) to be filtered downstream.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));
        let json_output = matches!(
            std::env::var("FARM_LOG_FORMAT").as_deref(),
            Ok("json") | Ok("JSON")
        );

        let console_layer = if json_output {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stdout()))
                .with_filter(filter)
                .boxed()
        };

        // A subscriber may already be installed by an embedding process or a test harness
        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json_output = json_output,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
pub fn get_environment() -> String {
    std::env::var("FARM_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for pipeline lifecycle operations
pub fn log_pipeline_operation(
    operation: &str,
    run_id: &str,
    period_kind: &str,
    state: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        run_id = %run_id,
        period_kind = %period_kind,
        state = %state,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 PIPELINE_OPERATION"
    );
}

/// Log the outcome of one pipeline stage
pub fn log_stage_result(
    run_id: &str,
    stage: &str,
    succeeded: usize,
    skipped: usize,
    failed: usize,
    duration_ms: u64,
) {
    if failed > 0 {
        tracing::warn!(
            run_id = %run_id,
            stage = %stage,
            succeeded = succeeded,
            skipped = skipped,
            failed = failed,
            duration_ms = duration_ms,
            "⚠️ STAGE_DEGRADED"
        );
    } else {
        tracing::info!(
            run_id = %run_id,
            stage = %stage,
            succeeded = succeeded,
            skipped = skipped,
            failed = failed,
            duration_ms = duration_ms,
            "✅ STAGE_COMPLETE"
        );
    }
}

/// Log a lifecycle event of a manual external task
pub fn log_task_event(task_id: &str, farm_id: i64, event: &str, details: Option<&str>) {
    tracing::info!(
        task_id = %task_id,
        farm_id = farm_id,
        event = %event,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🔧 TASK_EVENT"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
