//! The "runnable capability" a task payload may expose, and the callback
//! executor collaborator that marshals observer notifications onto the
//! embedder's preferred thread.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A handle to the currently-running task, shared between the worker and
/// the dispatcher so `delete_task` can request cooperative cancellation.
#[derive(Debug, Default)]
pub struct TaskHandle {
    abort_requested: AtomicBool,
}

impl TaskHandle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn request_abort(&self) {
        self.abort_requested.store(true, Ordering::SeqCst);
    }

    pub fn abort_requested(&self) -> bool {
        self.abort_requested.load(Ordering::SeqCst)
    }
}

/// Outcome of running one task.
pub enum Outcome {
    /// The task completed and should be marked Succeeded.
    Success,
    /// The task asked to be requeued (backoff applies).
    Requeue,
    /// The task failed; carries the reason and optional serialized exception.
    Failed {
        reason: String,
        exception_blob: Option<Vec<u8>>,
    },
}

/// The default executor's contract: given a decoded payload and a handle for
/// cooperative cancellation, run it and report the outcome.
///
/// Embedders that want custom dispatch (§4.3 `run_one_task`) implement this
/// over their own task registry; the dispatcher is generic over it.
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    /// Run the task identified by `payload_blob`. Returns
    /// `Err(SchedulerError::UnsupportedTask)` if the payload does not expose
    /// a runnable capability the executor recognizes.
    async fn run(
        &self,
        payload_blob: &[u8],
        handle: Arc<TaskHandle>,
    ) -> crate::error::Result<Outcome>;
}

/// A boxed future an observer callback can return, used by
/// [`CallbackExecutor`] so embedders can run async callback logic.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Marshals a callback onto the embedder's preferred notification thread
/// (e.g. a UI main thread, or simply `tokio::spawn` for a headless
/// embedder). The dispatcher never invokes observers directly.
pub trait CallbackExecutor: Send + Sync + 'static {
    fn spawn(&self, future: BoxFuture);
}

/// A callback executor that just spawns onto the ambient Tokio runtime.
/// Adequate for headless embedders and for tests; UI embedders supply their
/// own that hops to the main thread instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineTokioExecutor;

impl CallbackExecutor for InlineTokioExecutor {
    fn spawn(&self, future: BoxFuture) {
        tokio::spawn(future);
    }
}
