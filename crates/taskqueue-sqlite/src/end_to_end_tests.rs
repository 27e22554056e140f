//! End-to-end tests that drive the full worker/dispatcher loop against a
//! real in-memory SQLite store, using the scripted fixtures from
//! `taskqueue-testing`. Unlike the unit tests alongside `SqliteStore`, these
//! exercise `Dispatcher::submit` and the spawned queue worker together —
//! the surface the retry-then-success and concurrent-delete scenarios live
//! on.

use crate::SqliteStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskqueue_core::{
    Dispatcher, DispatcherBuilder, Outcome, Result as SchedulerResult, RetryPolicy, SchedulerConfig, Store,
    TaskChange, TaskExecutor, TaskHandle, TaskKind, TaskListener,
};
use taskqueue_testing::{ScriptedExecutor, ScriptedOutcome};

/// Polls `condition` until it is true or `deadline` is exceeded. The worker
/// loop and observer notifications both run on spawned tasks, so tests
/// cannot just assert on store state immediately after `submit` returns.
async fn wait_until(mut condition: impl FnMut() -> bool, what: &str) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}

/// Like `wait_until`, but for the store-emptiness check, which itself is
/// async and so cannot be expressed as a plain `FnMut() -> bool`.
async fn wait_until_drained(store: &SqliteStore) {
    for _ in 0..200 {
        if store.tasks(TaskKind::All).await.unwrap().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("queue did not drain in time");
}

struct RecordingListener {
    changes: Mutex<Vec<TaskChange>>,
}

impl RecordingListener {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            changes: Mutex::new(Vec::new()),
        })
    }

    fn snapshot(&self) -> Vec<TaskChange> {
        self.changes.lock().unwrap().clone()
    }
}

impl TaskListener for RecordingListener {
    fn on_task_change(&self, change: TaskChange) {
        self.changes.lock().unwrap().push(change);
    }
}

fn fast_retry_config() -> SchedulerConfig {
    SchedulerConfig::default().with_retry_policy(RetryPolicy {
        retry_limit: 3,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(200),
    })
}

async fn memory_dispatcher(executor: Arc<dyn TaskExecutor>, config: SchedulerConfig) -> (Arc<Dispatcher>, SqliteStore) {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    let dispatcher = DispatcherBuilder::new(Arc::new(store.clone()), executor)
        .with_config(config)
        .build();
    (dispatcher, store)
}

/// §8 scenario: a task that requeues once and succeeds on its second
/// attempt ends up with no row left behind, and the dispatcher runs it
/// exactly twice.
#[tokio::test]
async fn retry_then_success_runs_twice_and_leaves_no_row_behind() {
    let executor = ScriptedExecutor::new(vec![ScriptedOutcome::Requeue, ScriptedOutcome::Success]);
    let (dispatcher, store) = memory_dispatcher(executor.clone(), fast_retry_config()).await;

    let listener = RecordingListener::new();
    dispatcher.register_task_listener(listener.clone());

    dispatcher.submit("net", 0, b"payload".to_vec()).await.unwrap();

    wait_until(|| executor.call_count() == 2, "executor to run twice").await;
    wait_until_drained(&store).await;

    let running_count = listener
        .snapshot()
        .into_iter()
        .filter(|c| matches!(c, TaskChange::Running { .. }))
        .count();
    assert_eq!(running_count, 2, "task should be observed Running on each attempt");
}

/// §8 scenario: deleting a task while its worker is mid-execution requests
/// cooperative abort; an executor that ignores the request and finishes
/// anyway still leaves the dispatcher consistent — the row stays deleted
/// and `mark_success` against the now-missing row is a harmless no-op.
#[tokio::test]
async fn deleting_a_running_task_requests_abort_but_does_not_panic_on_late_completion() {
    struct SlowExecutor {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl TaskExecutor for SlowExecutor {
        async fn run(&self, _payload_blob: &[u8], handle: Arc<TaskHandle>) -> SchedulerResult<Outcome> {
            tokio::time::sleep(Duration::from_millis(60)).await;
            // Deliberately ignores handle.abort_requested() — the scenario
            // is about a worker that cannot be preempted, not one that
            // cooperates.
            let _ = handle.abort_requested();
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Success)
        }
    }

    let executor = Arc::new(SlowExecutor {
        runs: AtomicUsize::new(0),
    });
    let (dispatcher, store) = memory_dispatcher(executor.clone(), SchedulerConfig::default()).await;

    let listener = RecordingListener::new();
    dispatcher.register_task_listener(listener.clone());

    let task_id = dispatcher.submit("slow", 0, b"payload".to_vec()).await.unwrap();

    // Give the worker time to claim the task and start running it before
    // the delete races in.
    tokio::time::sleep(Duration::from_millis(20)).await;
    dispatcher.delete_task(task_id).await.unwrap();

    wait_until(
        || executor.runs.load(Ordering::SeqCst) == 1,
        "slow executor to finish despite the abort request",
    )
    .await;

    let all = store.tasks(TaskKind::All).await.unwrap();
    assert!(all.is_empty(), "deleted task must not reappear");

    wait_until(
        || {
            listener
                .snapshot()
                .iter()
                .any(|c| matches!(c, TaskChange::Deleted { task_id: id } if *id == task_id))
        },
        "Deleted notification to arrive",
    )
    .await;
}

/// A submit to a queue whose worker has just drained and terminated must
/// still be picked up, not stranded with no live worker. This targets the
/// termination/deregistration race directly: the worker has nothing left,
/// terminates, and a submit that lands right after must see an empty
/// registry and spawn its own worker rather than notifying one that is
/// already gone.
#[tokio::test]
async fn submit_after_queue_drains_spawns_a_fresh_worker() {
    let executor = ScriptedExecutor::new(vec![ScriptedOutcome::Success, ScriptedOutcome::Success]);
    let (dispatcher, store) = memory_dispatcher(executor.clone(), SchedulerConfig::default()).await;

    dispatcher.submit("jobs", 0, b"first".to_vec()).await.unwrap();
    wait_until(|| executor.call_count() == 1, "first task to run").await;
    wait_until_drained(&store).await;

    // The worker has had time to observe the drained queue and deregister.
    tokio::time::sleep(Duration::from_millis(20)).await;

    dispatcher.submit("jobs", 0, b"second".to_vec()).await.unwrap();
    wait_until(|| executor.call_count() == 2, "second task to run").await;
}

/// `submit_existing` must dispatch against an existing-but-drained queue,
/// not just persist the row.
#[tokio::test]
async fn submit_existing_wakes_a_worker_for_an_already_known_queue() {
    let executor = ScriptedExecutor::new(vec![ScriptedOutcome::Success]);
    let (dispatcher, store) = memory_dispatcher(executor.clone(), SchedulerConfig::default()).await;

    store.get_or_create_queue("known").await.unwrap();

    dispatcher
        .submit_existing("known", 0, b"payload".to_vec())
        .await
        .unwrap();

    wait_until(|| executor.call_count() == 1, "submit_existing task to run").await;
}
