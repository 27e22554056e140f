//! The per-queue worker loop.
//!
//! ```text
//! Starting -> Polling <-> Waiting <-> Running -> Polling
//!                                            \-> Terminating
//! ```
//!
//! One worker runs at a time per queue; tasks within a queue therefore
//! execute strictly sequentially. Across queues, workers run concurrently as
//! ordinary Tokio tasks with no ordering promised between them.

use crate::dispatcher::Dispatcher;
use crate::error::SchedulerError;
use crate::executor::{Outcome, TaskHandle};
use crate::model::{ScheduledTask, TaskId, TaskRecord};
use crate::observer::TaskChange;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

pub type WorkerId = u64;

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_worker_id() -> WorkerId {
    NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed)
}

/// The dispatcher-visible half of a worker: its wake signal and a record of
/// which task (if any) it is currently running, so `delete_task` can find
/// and abort it.
pub struct WorkerHandle {
    pub id: WorkerId,
    pub notify: Notify,
    pub current: Mutex<Option<(TaskId, Arc<TaskHandle>)>>,
}

impl WorkerHandle {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            notify: Notify::new(),
            current: Mutex::new(None),
        }
    }
}

/// Runs the worker loop for `queue_name` until the queue is drained, then
/// deregisters itself from the dispatcher.
///
/// Deregistration happens inside `poll_next_or_deregister` itself, under the
/// same lock hold as the poll that discovered the queue was drained — there
/// is no separate step afterwards, and so no gap for a racing submit to land
/// in between "decided to terminate" and "removed from the registry".
pub async fn run_worker(dispatcher: Arc<Dispatcher>, queue_name: String, handle: Arc<WorkerHandle>) {
    debug!(queue = %queue_name, worker_id = handle.id, "queue worker starting");

    loop {
        let scheduled = match dispatcher
            .poll_next_or_deregister(&queue_name, handle.id)
            .await
        {
            Ok(Some(scheduled)) => scheduled,
            Ok(None) => {
                debug!(queue = %queue_name, "queue drained, terminating worker");
                return;
            }
            Err(err) => {
                error!(queue = %queue_name, error = %err, "store unavailable, terminating worker");
                return;
            }
        };

        if scheduled.eligible_now() {
            run_one(&dispatcher, &handle, scheduled.task).await;
        } else {
            wait_for_wake_or_timeout(&dispatcher, &handle, &scheduled).await;
        }
    }
}

async fn wait_for_wake_or_timeout(dispatcher: &Arc<Dispatcher>, handle: &WorkerHandle, scheduled: &ScheduledTask) {
    let wait = scheduled.wait.min(dispatcher.config().max_poll_wait);
    tokio::select! {
        _ = tokio::time::sleep(wait) => {}
        _ = handle.notify.notified() => {}
    }
}

async fn run_one(dispatcher: &Arc<Dispatcher>, handle: &WorkerHandle, task: TaskRecord) {
    let task_handle = TaskHandle::new();
    *handle.current.lock().unwrap() = Some((task.id, Arc::clone(&task_handle)));

    dispatcher
        .task_observers()
        .notify(TaskChange::Running { task_id: task.id });

    let outcome = dispatcher
        .executor()
        .run(&task.payload_blob, Arc::clone(&task_handle))
        .await;

    *handle.current.lock().unwrap() = None;

    record_outcome(dispatcher, task.id, task.retry_count, outcome).await;
}

async fn record_outcome(
    dispatcher: &Arc<Dispatcher>,
    task_id: TaskId,
    retry_count: u32,
    outcome: crate::error::Result<Outcome>,
) {
    match outcome {
        Ok(Outcome::Success) => {
            if let Err(err) = dispatcher.store().mark_success(task_id).await {
                warn!(task_id, error = %err, "mark_success failed, task left in prior state");
            }
            dispatcher
                .task_observers()
                .notify(TaskChange::Completed { task_id });
        }
        Ok(Outcome::Requeue) => {
            let policy = dispatcher.config().default_retry_policy;
            let delay = policy.delay_for_attempt(retry_count);
            if let Err(err) = dispatcher
                .store()
                .mark_requeue(task_id, policy.retry_limit, delay)
                .await
            {
                warn!(task_id, error = %err, "mark_requeue failed, task left in prior state");
            }
            dispatcher
                .task_observers()
                .notify(TaskChange::Waiting { task_id });
        }
        Ok(Outcome::Failed {
            reason,
            exception_blob,
        }) => {
            if let Err(err) = dispatcher
                .store()
                .mark_failure(task_id, &reason, exception_blob)
                .await
            {
                warn!(task_id, error = %err, "mark_failure failed, task left in prior state");
            }
            dispatcher
                .task_observers()
                .notify(TaskChange::Completed { task_id });
        }
        Err(SchedulerError::DecodeFailure(reason)) => {
            let reason = format!("could not decode task payload: {reason}");
            if let Err(err) = dispatcher.store().mark_failure(task_id, &reason, None).await {
                warn!(task_id, error = %err, "mark_failure (decode) failed");
            }
            dispatcher
                .task_observers()
                .notify(TaskChange::Completed { task_id });
        }
        Err(err) => {
            let reason = err.to_string();
            if let Err(store_err) = dispatcher.store().mark_failure(task_id, &reason, None).await {
                warn!(task_id, error = %store_err, "mark_failure (executor error) failed");
            }
            dispatcher
                .task_observers()
                .notify(TaskChange::Completed { task_id });
        }
    }
}
