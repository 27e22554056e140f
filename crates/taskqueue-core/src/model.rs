//! Core data model: queues, tasks, events, and the retry policy attached to
//! each task.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Opaque queue identity, assigned monotonically by the store.
pub type QueueId = i64;
pub type TaskId = i64;
pub type EventId = i64;

/// Persisted task status. A single character on the wire (`Q`/`S`/`F`),
/// matching the legacy schema this design is grounded on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn code(self) -> char {
        match self {
            TaskStatus::Queued => 'Q',
            TaskStatus::Succeeded => 'S',
            TaskStatus::Failed => 'F',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Q" => Some(TaskStatus::Queued),
            "S" => Some(TaskStatus::Succeeded),
            "F" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

/// The retry policy a task carries in its payload metadata. Defaults mirror
/// §6 of the specification: 17 retries, exponential backoff starting at 2s,
/// capped so the delay never grows past `max_retry_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub retry_limit: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_limit: 17,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3600),
        }
    }
}

impl RetryPolicy {
    /// Delay after attempt `n` (0-indexed): `2^(n+1) * base_delay`, capped at
    /// `max_delay`. With the default `base_delay` of one second this is the
    /// literal `2^(n+1)` seconds the specification calls for.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_add(1).min(31);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        let scaled = self.base_delay.saturating_mul(factor);
        scaled.min(self.max_delay)
    }
}

/// A queue: a named, independently-scheduled stream of tasks.
#[derive(Debug, Clone)]
pub struct Queue {
    pub id: QueueId,
    pub name: String,
}

/// A persisted task row plus its decoded bookkeeping fields.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: TaskId,
    pub queue_id: QueueId,
    pub queued_at: DateTime<Utc>,
    pub priority: i64,
    pub status: TaskStatus,
    pub retry_at: DateTime<Utc>,
    pub retry_count: u32,
    pub failure_reason: Option<String>,
    pub exception_blob: Option<Vec<u8>>,
    pub payload_blob: Vec<u8>,
}

impl TaskRecord {
    /// A task is runnable iff it is queued and its retry time has arrived.
    pub fn is_runnable(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Queued && self.retry_at <= now
    }
}

/// A persisted event row.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: EventId,
    pub task_id: Option<TaskId>,
    pub event_blob: Vec<u8>,
    pub event_at: DateTime<Utc>,
}

/// The result of `Store::next_task`: either an eligible-now task (`wait` is
/// zero) or the soonest-future task along with how long to sleep before it
/// becomes eligible.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub task: TaskRecord,
    pub wait: Duration,
}

impl ScheduledTask {
    pub fn eligible_now(&self) -> bool {
        self.wait.is_zero()
    }
}

/// Kinds of cursor projection over the task table (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    All,
    Failed,
    Active,
    Queued,
}
