//! Task identities for manual runs: `manual_<farmId>_<launchMillis>`.
//!
//! The millisecond component is forced to be strictly increasing within the
//! process, so two launches in the same millisecond still get distinct ids while
//! keeping the `manual_<id>_<digits>` shape downstream log queries rely on.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::constants::MANUAL_TASK_PREFIX;

#[derive(Debug, Default)]
pub struct TaskIdentityGenerator {
    last_millis: AtomicI64,
}

impl TaskIdentityGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an identity for `farm_id` together with the launch timestamp it encodes
    pub fn next(&self, farm_id: i64) -> (String, DateTime<Utc>) {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(if now > last { now } else { last + 1 })
            })
            .unwrap_or_else(|last| last);
        let assigned = if now > previous { now } else { previous + 1 };

        let launched_at = Utc
            .timestamp_millis_opt(assigned)
            .single()
            .unwrap_or_else(Utc::now);

        (
            format!("{MANUAL_TASK_PREFIX}_{farm_id}_{assigned}"),
            launched_at,
        )
    }
}

/// Split a manual task id back into `(farm_id, launch_millis)`
pub fn parse_task_id(task_id: &str) -> Option<(i64, i64)> {
    let rest = task_id.strip_prefix(MANUAL_TASK_PREFIX)?.strip_prefix('_')?;
    let (farm_id, millis) = rest.rsplit_once('_')?;
    if millis.is_empty() || !millis.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((farm_id.parse().ok()?, millis.parse().ok()?))
}
