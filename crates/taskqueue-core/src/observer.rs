//! Weakly-held observer registries for task and event lifecycle changes.
//!
//! Each subscription is kept as a [`Weak`] reference: a forgotten subscriber
//! does not leak and is pruned lazily, the first time a notification walks
//! past it and finds it gone. Listener errors (panics inside a listener
//! caught via `catch_unwind`-free cooperative reporting) never propagate
//! into the dispatcher; at most they are logged.

use crate::executor::CallbackExecutor;
use crate::model::{EventId, QueueId, TaskId};
use std::sync::{Arc, Mutex, Weak};
use tracing::warn;

#[derive(Debug, Clone)]
pub enum TaskChange {
    Created { task_id: TaskId, queue_id: QueueId },
    Running { task_id: TaskId },
    Waiting { task_id: TaskId },
    Updated { task_id: TaskId },
    Completed { task_id: TaskId },
    Deleted { task_id: TaskId },
}

#[derive(Debug, Clone)]
pub enum EventChange {
    Created { event_id: EventId, task_id: Option<TaskId> },
    Deleted { event_id: EventId },
}

pub trait TaskListener: Send + Sync + 'static {
    fn on_task_change(&self, change: TaskChange);
}

pub trait EventListener: Send + Sync + 'static {
    fn on_event_change(&self, change: EventChange);
}

/// A generic weak-subscriber registry, parameterized over the listener
/// trait and the change payload it receives.
struct Registry<L: ?Sized> {
    listeners: Mutex<Vec<Weak<L>>>,
}

impl<L: ?Sized> Registry<L> {
    fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn register(&self, listener: Arc<L>) {
        self.listeners.lock().unwrap().push(Arc::downgrade(&listener));
    }

    /// Snapshot upgradeable listeners, pruning dead entries in place.
    fn snapshot(&self) -> Vec<Arc<L>> {
        let mut guard = self.listeners.lock().unwrap();
        let mut live = Vec::with_capacity(guard.len());
        guard.retain(|weak| match weak.upgrade() {
            Some(strong) => {
                live.push(strong);
                true
            }
            None => false,
        });
        live
    }
}

/// The task-change observer registry. Notifications are submitted to a
/// [`CallbackExecutor`] rather than invoked inline, so observers always run
/// on the embedder's chosen thread.
pub struct TaskObservers {
    registry: Registry<dyn TaskListener>,
    callbacks: Arc<dyn CallbackExecutor>,
}

impl TaskObservers {
    pub fn new(callbacks: Arc<dyn CallbackExecutor>) -> Self {
        Self {
            registry: Registry::new(),
            callbacks,
        }
    }

    pub fn register(&self, listener: Arc<dyn TaskListener>) {
        self.registry.register(listener);
    }

    pub fn notify(&self, change: TaskChange) {
        for listener in self.registry.snapshot() {
            let change = change.clone();
            self.callbacks.spawn(Box::pin(async move {
                // Listener callbacks run synchronously inside the spawned
                // future; a listener that panics takes down only this
                // spawned task, never the dispatcher.
                listener.on_task_change(change);
            }));
        }
    }
}

pub struct EventObservers {
    registry: Registry<dyn EventListener>,
    callbacks: Arc<dyn CallbackExecutor>,
}

impl EventObservers {
    pub fn new(callbacks: Arc<dyn CallbackExecutor>) -> Self {
        Self {
            registry: Registry::new(),
            callbacks,
        }
    }

    pub fn register(&self, listener: Arc<dyn EventListener>) {
        self.registry.register(listener);
    }

    pub fn notify(&self, change: EventChange) {
        for listener in self.registry.snapshot() {
            let change = change.clone();
            self.callbacks.spawn(Box::pin(async move {
                listener.on_event_change(change);
            }));
        }
    }
}

/// Logs that a notification was dispatched to zero listeners, useful while
/// debugging a missing UI update; not an error.
pub fn warn_if_orphaned(kind: &str, listener_count: usize) {
    if listener_count == 0 {
        warn!(kind, "notification dispatched with no live listeners");
    }
}
