//! The durable store interface.
//!
//! Mirrors the shape of the teacher crate's `JobStore` trait (`claim_ready`,
//! `mark_succeeded`, `mark_failed`, `heartbeat`) generalized to multiple
//! named queues, priority + eligibility-time scheduling, and an attached
//! event log. A concrete implementation lives in the `taskqueue-sqlite`
//! crate; tests can swap in an in-memory fake from `taskqueue-testing`.

use crate::model::{EventId, QueueId, ScheduledTask, TaskId, TaskKind};
use async_trait::async_trait;

/// A task or event row as returned by the cursor queries (§4.5). Carries an
/// `event_count` for tasks, and ephemeral UI selection state the core never
/// reads.
#[derive(Debug, Clone)]
pub struct TaskView {
    pub id: TaskId,
    pub queue_id: QueueId,
    pub queued_at: chrono::DateTime<chrono::Utc>,
    pub retry_at: chrono::DateTime<chrono::Utc>,
    pub retry_count: u32,
    pub status_code: char,
    pub failure_reason: Option<String>,
    pub exception_blob: Option<Vec<u8>>,
    pub payload_blob: Vec<u8>,
    pub event_count: i64,
    /// Per-row UI selection flag. Never set by the core; embedders use it
    /// for multi-select list views. Not persisted.
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct EventView {
    pub id: EventId,
    pub task_id: Option<TaskId>,
    pub event_blob: Vec<u8>,
    pub event_at: chrono::DateTime<chrono::Utc>,
}

/// Durable, transactional persistence of queues, tasks, and events.
///
/// All multi-statement mutations run in a transaction; partial failures
/// leave prior state untouched. A task row being absent when a write method
/// is called is NOT an error — implementations must tolerate concurrent
/// deletion by the dispatcher (see §4.1 failure semantics).
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Idempotent: inserts the queue if absent, returns its id either way.
    async fn get_or_create_queue(&self, name: &str) -> anyhow::Result<QueueId>;

    /// Enqueue a new task. If `creating` is false and the queue does not
    /// exist, returns `Ok(None)` to signal `UnknownQueue` to the caller
    /// (the dispatcher maps this to `SchedulerError::UnknownQueue`).
    async fn enqueue(
        &self,
        queue_name: &str,
        priority: i64,
        payload_blob: Vec<u8>,
        creating: bool,
    ) -> anyhow::Result<Option<TaskId>>;

    /// Two-phase eligible-now / soonest-future query, scoped to one queue.
    /// Returns `None` only if the queue has no queued rows at all.
    async fn next_task(&self, queue_name: &str) -> anyhow::Result<Option<ScheduledTask>>;

    /// If the task has no events, deletes the row outright; otherwise marks
    /// it Succeeded. A no-op if the row is already gone.
    async fn mark_success(&self, task_id: TaskId) -> anyhow::Result<()>;

    /// Applies backoff and increments `retry_count`, or transitions to
    /// Failed with "Retry limit exceeded" if the limit has been reached.
    /// `retry_limit` and `retry_delay` come from the task's own policy
    /// (decoded by the caller, since the store does not interpret payloads).
    async fn mark_requeue(
        &self,
        task_id: TaskId,
        retry_limit: u32,
        retry_delay: std::time::Duration,
    ) -> anyhow::Result<()>;

    /// Sets `status='F'` and persists the failure reason and optional
    /// serialized exception. A no-op if the row is already gone.
    async fn mark_failure(
        &self,
        task_id: TaskId,
        reason: &str,
        exception_blob: Option<Vec<u8>>,
    ) -> anyhow::Result<()>;

    /// Rewrites the payload blob of an existing task. A no-op if the row has
    /// been deleted.
    async fn update(&self, task_id: TaskId, payload_blob: Vec<u8>) -> anyhow::Result<()>;

    /// Transactionally verifies the task still exists before inserting the
    /// event; returns `None` without inserting if it does not.
    async fn store_task_event(
        &self,
        task_id: TaskId,
        event_blob: Vec<u8>,
    ) -> anyhow::Result<Option<EventId>>;

    /// Inserts a free-standing event, unconditionally.
    async fn store_event(&self, event_blob: Vec<u8>) -> anyhow::Result<EventId>;

    /// Deletes the task's events, then the task itself. Idempotent.
    async fn delete_task(&self, task_id: TaskId) -> anyhow::Result<()>;

    /// Deletes the event, then runs orphan cleanup. Idempotent.
    async fn delete_event(&self, event_id: EventId) -> anyhow::Result<()>;

    /// Deletes task rows whose `retry_at` is older than `days_old` days,
    /// then runs orphan cleanup.
    async fn cleanup_old_tasks(&self, days_old: i64) -> anyhow::Result<()>;

    /// Deletes event rows whose `event_at` is older than `days_old` days,
    /// then runs orphan cleanup.
    async fn cleanup_old_events(&self, days_old: i64) -> anyhow::Result<()>;

    /// Deletes orphaned events (non-null `task_id` with no matching task)
    /// and succeeded tasks with no remaining events.
    async fn cleanup_orphans(&self) -> anyhow::Result<()>;

    /// Sets the task's priority to one less than the current minimum queued
    /// priority (in its queue). Implementations must perform the min-read
    /// and the write atomically with respect to concurrent callers.
    async fn bring_task_to_front(&self, task_id: TaskId) -> anyhow::Result<()>;

    /// Sets the task's priority to one more than the current maximum queued
    /// priority (in its queue).
    async fn send_task_to_back(&self, task_id: TaskId) -> anyhow::Result<()>;

    /// All queue names known to the store, used at startup to spawn one
    /// worker per existing queue.
    async fn all_queue_names(&self) -> anyhow::Result<Vec<String>>;

    /// Snapshot projection over the task table for the given kind.
    async fn tasks(&self, kind: TaskKind) -> anyhow::Result<Vec<TaskView>>;

    /// All events attached to a single task, oldest first.
    async fn events_for_task(&self, task_id: TaskId) -> anyhow::Result<Vec<EventView>>;

    /// All events in the store, oldest first.
    async fn all_events(&self) -> anyhow::Result<Vec<EventView>>;
}
