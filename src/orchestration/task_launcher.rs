//! # External Task Launcher
//!
//! Launches the ETL process for a manual farm run and supervises it in a detached
//! tokio task. `launch_manual` is a "request accepted" operation: it returns the
//! task identity as soon as the process is spawned, and everything after that
//! (output lines, exit status) is only visible through the event stream and logs.
//!
//! Preconditions are checked before any side effect: an unknown farm is rejected
//! with `NotFound` and the enrollment upsert must succeed before anything spawns.

use chrono::NaiveDate;
use dashmap::DashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

use crate::config::ManualTaskConfig;
use crate::error::{OrchestratorError, Result};
use crate::models::{ExternalTask, TaskHandle, TaskStatus};
use crate::orchestration::event_publisher::{
    OutputStream, TaskEvent, TaskEventKind, TaskEventPublisher,
};
use crate::orchestration::task_identity::TaskIdentityGenerator;
use crate::registry::{EntityRegistry, RegistrationStore};

/// Date format of `--date-from`/`--date-to`
pub const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

pub struct ExternalTaskLauncher {
    registry: Arc<dyn EntityRegistry>,
    store: Arc<dyn RegistrationStore>,
    config: ManualTaskConfig,
    identities: TaskIdentityGenerator,
    /// Running tasks by task id; entries are dropped once the process exits
    tasks: Arc<DashMap<String, ExternalTask>>,
    events: TaskEventPublisher,
}

impl ExternalTaskLauncher {
    pub fn new(
        registry: Arc<dyn EntityRegistry>,
        store: Arc<dyn RegistrationStore>,
        config: ManualTaskConfig,
    ) -> Self {
        let events = TaskEventPublisher::new(config.event_channel_capacity);
        Self {
            registry,
            store,
            config,
            identities: TaskIdentityGenerator::new(),
            tasks: Arc::new(DashMap::new()),
            events,
        }
    }

    /// Validate, register and spawn a manual run for `farm_id`.
    ///
    /// Spawn errors do not fail the call: the identity was already allocated, so
    /// the handle is returned and the failure is reported as a `LaunchFailed` event.
    #[instrument(skip(self))]
    pub async fn launch_manual(
        &self,
        farm_id: i64,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<TaskHandle> {
        validate_date_range(date_from, date_to)?;

        if !self.registry.exists(farm_id).await? {
            return Err(OrchestratorError::NotFound { farm_id });
        }

        let enrollment = self.store.upsert_manual(farm_id).await?;
        debug!(
            farm_id = farm_id,
            registration_mode = %enrollment.registration_mode,
            "Enrollment registered for manual run"
        );

        let (task_id, launched_at) = self.identities.next(farm_id);
        let handle = TaskHandle {
            task_id: task_id.clone(),
            farm_id,
            launched_at,
        };
        let arguments = build_arguments(&self.config.target, farm_id, date_from, date_to);

        let mut command = Command::new(&self.config.program);
        command
            .args(&arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(directory) = &self.config.working_directory {
            command.current_dir(directory);
        }

        let child = match command.spawn() {
            Ok(child) => child,
            Err(error) => {
                self.events.publish(TaskEvent::new(
                    &task_id,
                    farm_id,
                    TaskEventKind::LaunchFailed {
                        reason: error.to_string(),
                    },
                ));
                return Ok(handle);
            }
        };

        let pid = child.id();
        self.tasks.insert(
            task_id.clone(),
            ExternalTask {
                task_id: task_id.clone(),
                farm_id,
                date_from,
                date_to,
                pid,
                status: TaskStatus::Running,
                last_output_line: None,
                launched_at,
            },
        );
        self.events.publish(TaskEvent::new(
            &task_id,
            farm_id,
            TaskEventKind::Started { pid },
        ));

        tokio::spawn(supervise(
            child,
            task_id,
            farm_id,
            Arc::clone(&self.tasks),
            self.events.clone(),
        ));

        Ok(handle)
    }

    /// Snapshot of tasks whose process has not exited yet, oldest first
    pub fn active_tasks(&self) -> Vec<ExternalTask> {
        let mut tasks: Vec<ExternalTask> = self
            .tasks
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        tasks.sort_by_key(|task| task.launched_at);
        tasks
    }

    pub fn task(&self, task_id: &str) -> Option<ExternalTask> {
        self.tasks.get(task_id).map(|entry| entry.value().clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }
}

/// `<target> --entity-id <id> --manual [--date-from YYYYMMDD] [--date-to YYYYMMDD]`
pub fn build_arguments(
    target: &str,
    farm_id: i64,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
) -> Vec<String> {
    let mut arguments = vec![
        target.to_string(),
        "--entity-id".to_string(),
        farm_id.to_string(),
        "--manual".to_string(),
    ];
    if let Some(date_from) = date_from {
        arguments.push("--date-from".to_string());
        arguments.push(date_from.format(COMPACT_DATE_FORMAT).to_string());
    }
    if let Some(date_to) = date_to {
        arguments.push("--date-to".to_string());
        arguments.push(date_to.format(COMPACT_DATE_FORMAT).to_string());
    }
    arguments
}

/// Parse a `YYYYMMDD` date
pub fn parse_compact_date(value: &str) -> Result<NaiveDate> {
    if value.len() != 8 {
        return Err(OrchestratorError::ValidationError(format!(
            "Expected date as YYYYMMDD, got '{value}'"
        )));
    }
    NaiveDate::parse_from_str(value, COMPACT_DATE_FORMAT).map_err(|e| {
        OrchestratorError::ValidationError(format!("Invalid date '{value}': {e}"))
    })
}

fn validate_date_range(date_from: Option<NaiveDate>, date_to: Option<NaiveDate>) -> Result<()> {
    if let (Some(from), Some(to)) = (date_from, date_to) {
        if from > to {
            return Err(OrchestratorError::ValidationError(format!(
                "date_from {} is after date_to {}",
                from.format(COMPACT_DATE_FORMAT),
                to.format(COMPACT_DATE_FORMAT)
            )));
        }
    }
    Ok(())
}

async fn supervise(
    mut child: Child,
    task_id: String,
    farm_id: i64,
    tasks: Arc<DashMap<String, ExternalTask>>,
    events: TaskEventPublisher,
) {
    let stdout = child.stdout.take().map(|pipe| {
        tokio::spawn(stream_lines(
            pipe,
            OutputStream::Stdout,
            task_id.clone(),
            farm_id,
            Arc::clone(&tasks),
            events.clone(),
        ))
    });
    let stderr = child.stderr.take().map(|pipe| {
        tokio::spawn(stream_lines(
            pipe,
            OutputStream::Stderr,
            task_id.clone(),
            farm_id,
            Arc::clone(&tasks),
            events.clone(),
        ))
    });

    let exit = child.wait().await;

    // Drain remaining output before reporting the exit
    for reader in [stdout, stderr].into_iter().flatten() {
        if let Err(error) = reader.await {
            warn!(task_id = %task_id, error = %error, "Output reader ended abnormally");
        }
    }

    let (code, status) = match exit {
        Ok(exit_status) if exit_status.success() => (exit_status.code(), TaskStatus::Succeeded),
        Ok(exit_status) => (exit_status.code(), TaskStatus::Failed),
        Err(error) => {
            warn!(task_id = %task_id, error = %error, "Failed to wait for process");
            (None, TaskStatus::Failed)
        }
    };

    if let Some(mut task) = tasks.get_mut(&task_id) {
        task.status = status;
    }
    events.publish(TaskEvent::new(
        &task_id,
        farm_id,
        TaskEventKind::Exited { code, status },
    ));
    tasks.remove(&task_id);
}

async fn stream_lines<R>(
    pipe: R,
    stream: OutputStream,
    task_id: String,
    farm_id: i64,
    tasks: Arc<DashMap<String, ExternalTask>>,
    events: TaskEventPublisher,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) => break,
            Ok(_) => {
                let line = decode_line(&buffer);
                if let Some(mut task) = tasks.get_mut(&task_id) {
                    task.last_output_line = Some(line.clone());
                }
                events.publish(TaskEvent::new(
                    &task_id,
                    farm_id,
                    TaskEventKind::Output { stream, line },
                ));
            }
            Err(error) => {
                warn!(task_id = %task_id, ?stream, error = %error, "Stopped reading process output");
                // Keep the pipe open until EOF so the child never writes into a closed pipe
                if let Err(error) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    debug!(task_id = %task_id, ?stream, error = %error, "Discarding remaining output failed");
                }
                break;
            }
        }
    }
}

/// One output line without its terminator. Bytes that are not UTF-8 (legacy
/// encodings) are replaced rather than ending the stream.
fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
