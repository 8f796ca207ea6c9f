//! # Task Event Publisher
//!
//! One-way channel from manual task supervisors to the log sink. Every event is
//! written to tracing first and then broadcast to any subscribers; a missing
//! subscriber is not an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::OrchestratorError;
use crate::logging::{log_error, log_task_event};
use crate::models::TaskStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEventKind {
    Started { pid: Option<u32> },
    Output { stream: OutputStream, line: String },
    Exited { code: Option<i32>, status: TaskStatus },
    LaunchFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub task_id: String,
    pub farm_id: i64,
    pub kind: TaskEventKind,
    pub occurred_at: DateTime<Utc>,
}

impl TaskEvent {
    pub fn new(task_id: impl Into<String>, farm_id: i64, kind: TaskEventKind) -> Self {
        Self {
            task_id: task_id.into(),
            farm_id,
            kind,
            occurred_at: Utc::now(),
        }
    }

    /// Exited or failed to launch
    pub fn is_final(&self) -> bool {
        matches!(
            self.kind,
            TaskEventKind::Exited { .. } | TaskEventKind::LaunchFailed { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct TaskEventPublisher {
    sender: broadcast::Sender<TaskEvent>,
}

impl TaskEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: TaskEvent) {
        match &event.kind {
            TaskEventKind::Started { pid } => {
                let details = pid.map(|pid| format!("pid={pid}"));
                log_task_event(&event.task_id, event.farm_id, "started", details.as_deref());
            }
            TaskEventKind::Output {
                stream: OutputStream::Stdout,
                line,
            } => {
                tracing::info!(task_id = %event.task_id, farm_id = event.farm_id, stream = "stdout", "{line}");
            }
            TaskEventKind::Output {
                stream: OutputStream::Stderr,
                line,
            } => {
                tracing::warn!(task_id = %event.task_id, farm_id = event.farm_id, stream = "stderr", "{line}");
            }
            TaskEventKind::Exited {
                code,
                status: TaskStatus::Succeeded,
            } => {
                let details = format!("exit_code={}", code.unwrap_or_default());
                log_task_event(&event.task_id, event.farm_id, "succeeded", Some(&details));
            }
            TaskEventKind::Exited { code, .. } => {
                let details = match code {
                    Some(code) => format!("exit_code={code}"),
                    None => "terminated by signal".to_string(),
                };
                log_error("external_task_launcher", "process_exit", &details, Some(&event.task_id));
            }
            TaskEventKind::LaunchFailed { reason } => {
                let error = OrchestratorError::process_launch_failed(&event.task_id, reason);
                log_error(
                    "external_task_launcher",
                    "spawn",
                    &error.to_string(),
                    Some(&event.task_id),
                );
            }
        }

        // No subscribers is fine; the log line above is the record of truth
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for TaskEventPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}
