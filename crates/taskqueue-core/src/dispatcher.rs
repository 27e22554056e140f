//! The process-wide coordinator.
//!
//! Modeled as a dependency-injected value rather than an implicit global:
//! the embedder builds one with [`DispatcherBuilder`] and shares it (usually
//! as `Arc<Dispatcher>`); nothing here reaches for a process-global
//! singleton, so tests can construct an independent instance per test.
//!
//! A single internal mutex serializes queue-set mutation, `next_task`
//! selection, enqueue, delete, and priority mutation (§5). It is held only
//! briefly and never across user task execution.

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::executor::{CallbackExecutor, InlineTokioExecutor, TaskExecutor};
use crate::model::{EventId, TaskId, TaskKind};
use crate::observer::{EventChange, EventListener, EventObservers, TaskChange, TaskListener, TaskObservers};
use crate::store::{EventView, Store, TaskView};
use crate::worker::{self, WorkerHandle, WorkerId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// State guarded by the dispatcher-wide mutex: the set of live workers.
struct DispatcherState {
    workers: HashMap<String, Arc<WorkerHandle>>,
}

pub struct Dispatcher {
    store: Arc<dyn Store>,
    executor: Arc<dyn TaskExecutor>,
    config: SchedulerConfig,
    task_observers: TaskObservers,
    event_observers: EventObservers,
    state: Mutex<DispatcherState>,
}

impl Dispatcher {
    pub(crate) fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub(crate) fn executor(&self) -> &Arc<dyn TaskExecutor> {
        &self.executor
    }

    pub(crate) fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub(crate) fn task_observers(&self) -> &TaskObservers {
        &self.task_observers
    }

    pub(crate) fn event_observers(&self) -> &EventObservers {
        &self.event_observers
    }

    /// Called by a queue worker under the dispatcher mutex: returns the next
    /// eligible or soonest-future task for `queue_name`, deregistering the
    /// worker in the same lock hold if the queue is drained or the store is
    /// unavailable. Doing both under one guard closes the gap a concurrent
    /// `submit`/`submit_existing` could otherwise land in: without it, a
    /// submit could see the worker still registered and `notify_one()` a
    /// worker that has already decided to terminate, losing the wakeup.
    pub(crate) async fn poll_next_or_deregister(
        &self,
        queue_name: &str,
        worker_id: WorkerId,
    ) -> anyhow::Result<Option<crate::model::ScheduledTask>> {
        let mut state = self.state.lock().await;
        let result = self.store.next_task(queue_name).await;
        if !matches!(result, Ok(Some(_))) {
            let still_current =
                matches!(state.workers.get(queue_name), Some(handle) if handle.id == worker_id);
            if still_current {
                state.workers.remove(queue_name);
                debug!(queue = queue_name, worker_id, "queue worker terminated");
            }
        }
        result
    }

    /// Submit a new task to `queue_name`, creating the queue if it does not
    /// already exist. Wakes the queue's worker if one is registered,
    /// otherwise spawns one.
    pub async fn submit(
        self: &Arc<Self>,
        queue_name: &str,
        priority: i64,
        payload_blob: Vec<u8>,
    ) -> Result<TaskId> {
        let mut state = self.state.lock().await;
        let queue_id = self
            .store
            .get_or_create_queue(queue_name)
            .await
            .map_err(SchedulerError::StoreUnavailable)?;
        let task_id = self
            .store
            .enqueue(queue_name, priority, payload_blob, true)
            .await
            .map_err(SchedulerError::StoreUnavailable)?
            .ok_or_else(|| SchedulerError::UnknownQueue(queue_name.to_string()))?;
        self.wake_or_spawn(&mut state, queue_name);
        drop(state);

        self.task_observers
            .notify(TaskChange::Created { task_id, queue_id });
        Ok(task_id)
    }

    /// Like `submit`, but fails with `UnknownQueue` instead of creating the
    /// queue on demand. Still wakes or spawns the queue's worker under the
    /// state lock on success, so a submit to an existing-but-drained queue
    /// is dispatched rather than silently stranded.
    pub async fn submit_existing(
        self: &Arc<Self>,
        queue_name: &str,
        priority: i64,
        payload_blob: Vec<u8>,
    ) -> Result<TaskId> {
        let mut state = self.state.lock().await;
        let task_id = self
            .store
            .enqueue(queue_name, priority, payload_blob, false)
            .await
            .map_err(SchedulerError::StoreUnavailable)?
            .ok_or_else(|| SchedulerError::UnknownQueue(queue_name.to_string()))?;
        // The enqueue above only succeeds if the queue already exists, so
        // this cannot create one — it just resolves the id for the notify.
        let queue_id = self
            .store
            .get_or_create_queue(queue_name)
            .await
            .map_err(SchedulerError::StoreUnavailable)?;
        self.wake_or_spawn(&mut state, queue_name);
        drop(state);

        self.task_observers
            .notify(TaskChange::Created { task_id, queue_id });
        Ok(task_id)
    }

    fn wake_or_spawn(self: &Arc<Self>, state: &mut DispatcherState, queue_name: &str) {
        if let Some(existing) = state.workers.get(queue_name) {
            existing.notify.notify_one();
            return;
        }

        let handle = Arc::new(WorkerHandle::new(worker::next_worker_id()));
        state.workers.insert(queue_name.to_string(), Arc::clone(&handle));

        let dispatcher = Arc::clone(self);
        let name = queue_name.to_string();
        tokio::spawn(async move {
            worker::run_worker(dispatcher, name, handle).await;
        });
        debug!(queue = queue_name, "spawned queue worker");
    }

    /// Spawn a worker for every queue the store already knows about. Call
    /// once at startup to recover queues left over from a prior process.
    pub async fn recover(self: &Arc<Self>) -> Result<()> {
        let names = self
            .store
            .all_queue_names()
            .await
            .map_err(SchedulerError::StoreUnavailable)?;
        let mut state = self.state.lock().await;
        for name in names {
            self.wake_or_spawn(&mut state, &name);
        }
        Ok(())
    }

    pub async fn save_task(&self, task_id: TaskId, payload_blob: Vec<u8>) -> Result<()> {
        self.store
            .update(task_id, payload_blob)
            .await
            .map_err(SchedulerError::StoreUnavailable)?;
        self.task_observers.notify(TaskChange::Updated { task_id });
        Ok(())
    }

    /// Deletes a task. If a worker is currently running it, requests
    /// cooperative abort first; the executor is not forcibly interrupted.
    pub async fn delete_task(&self, task_id: TaskId) -> Result<()> {
        {
            let state = self.state.lock().await;
            for worker in state.workers.values() {
                let current = worker.current.lock().unwrap();
                if let Some((running_id, handle)) = current.as_ref() {
                    if *running_id == task_id {
                        handle.request_abort();
                    }
                }
            }
        }

        let cascaded_events = self
            .store
            .events_for_task(task_id)
            .await
            .unwrap_or_default();

        self.store
            .delete_task(task_id)
            .await
            .map_err(SchedulerError::StoreUnavailable)?;

        for event in cascaded_events {
            self.event_observers
                .notify(EventChange::Deleted { event_id: event.id });
        }
        self.task_observers.notify(TaskChange::Deleted { task_id });
        Ok(())
    }

    pub async fn store_task_event(&self, task_id: TaskId, event_blob: Vec<u8>) -> Result<Option<EventId>> {
        let event_id = self
            .store
            .store_task_event(task_id, event_blob)
            .await
            .map_err(SchedulerError::StoreUnavailable)?;
        if let Some(id) = event_id {
            self.event_observers.notify(EventChange::Created {
                event_id: id,
                task_id: Some(task_id),
            });
        }
        Ok(event_id)
    }

    pub async fn store_event(&self, event_blob: Vec<u8>) -> Result<EventId> {
        let event_id = self
            .store
            .store_event(event_blob)
            .await
            .map_err(SchedulerError::StoreUnavailable)?;
        self.event_observers.notify(EventChange::Created {
            event_id,
            task_id: None,
        });
        Ok(event_id)
    }

    pub async fn delete_event(&self, event_id: EventId) -> Result<()> {
        self.store
            .delete_event(event_id)
            .await
            .map_err(SchedulerError::StoreUnavailable)?;
        self.event_observers.notify(EventChange::Deleted { event_id });
        Ok(())
    }

    pub async fn cleanup_old_tasks(&self, days_old: i64) -> Result<()> {
        self.store
            .cleanup_old_tasks(days_old)
            .await
            .map_err(SchedulerError::StoreUnavailable)
    }

    pub async fn cleanup_old_events(&self, days_old: i64) -> Result<()> {
        self.store
            .cleanup_old_events(days_old)
            .await
            .map_err(SchedulerError::StoreUnavailable)
    }

    pub async fn bring_task_to_front(&self, task_id: TaskId) -> Result<()> {
        let _guard = self.state.lock().await;
        self.store
            .bring_task_to_front(task_id)
            .await
            .map_err(SchedulerError::StoreUnavailable)?;
        drop(_guard);
        self.task_observers.notify(TaskChange::Updated { task_id });
        Ok(())
    }

    pub async fn send_task_to_back(&self, task_id: TaskId) -> Result<()> {
        let _guard = self.state.lock().await;
        self.store
            .send_task_to_back(task_id)
            .await
            .map_err(SchedulerError::StoreUnavailable)?;
        drop(_guard);
        self.task_observers.notify(TaskChange::Updated { task_id });
        Ok(())
    }

    pub async fn tasks(&self, kind: TaskKind) -> Result<Vec<TaskView>> {
        self.store.tasks(kind).await.map_err(SchedulerError::StoreUnavailable)
    }

    pub async fn task_events(&self, task_id: TaskId) -> Result<Vec<EventView>> {
        self.store
            .events_for_task(task_id)
            .await
            .map_err(SchedulerError::StoreUnavailable)
    }

    pub async fn all_events(&self) -> Result<Vec<EventView>> {
        self.store.all_events().await.map_err(SchedulerError::StoreUnavailable)
    }

    pub fn register_task_listener(&self, listener: Arc<dyn TaskListener>) {
        self.task_observers.register(listener);
    }

    pub fn register_event_listener(&self, listener: Arc<dyn EventListener>) {
        self.event_observers.register(listener);
    }

    /// Default task runner: delegates straight to the configured executor.
    /// Embedders that want custom dispatch supply their own `TaskExecutor`
    /// at construction time instead of overriding this method.
    pub async fn run_one_task(&self, payload_blob: &[u8]) -> Result<crate::executor::Outcome> {
        self.executor
            .run(payload_blob, crate::executor::TaskHandle::new())
            .await
    }
}

/// Builds a [`Dispatcher`], analogous to the teacher crate's
/// `RuntimeBuilder`/`EngineBuilder`.
pub struct DispatcherBuilder {
    store: Arc<dyn Store>,
    executor: Arc<dyn TaskExecutor>,
    config: SchedulerConfig,
    callback_executor: Arc<dyn CallbackExecutor>,
}

impl DispatcherBuilder {
    pub fn new(store: Arc<dyn Store>, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            store,
            executor,
            config: SchedulerConfig::default(),
            callback_executor: Arc::new(InlineTokioExecutor),
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_callback_executor(mut self, callbacks: Arc<dyn CallbackExecutor>) -> Self {
        self.callback_executor = callbacks;
        self
    }

    pub fn build(self) -> Arc<Dispatcher> {
        Arc::new(Dispatcher {
            store: self.store,
            executor: self.executor,
            config: self.config,
            task_observers: TaskObservers::new(Arc::clone(&self.callback_executor)),
            event_observers: EventObservers::new(self.callback_executor),
            state: Mutex::new(DispatcherState {
                workers: HashMap::new(),
            }),
        })
    }
}
