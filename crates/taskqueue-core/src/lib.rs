//! # taskqueue-core
//!
//! A deterministic, persistent multi-queue task scheduler: durable storage,
//! priority + eligibility-time dispatch, exponential-backoff retry, and
//! observer notifications, storage-agnostic over a [`Store`] implementation.
//!
//! ## Architecture
//!
//! ```text
//! embedder
//!     │ submit()
//!     ▼
//! Dispatcher ──(single mutex)── queue set, next_task selection
//!     │
//!     ├─► queue worker "emails"  (Tokio task, loop: poll -> wait/run)
//!     ├─► queue worker "reports" (Tokio task, loop: poll -> wait/run)
//!     └─► queue worker "..."
//!              │
//!              ▼ TaskExecutor::run()
//!         embedder's task registry
//!              │
//!              ▼ Outcome
//!         mark_success / mark_requeue / mark_failure
//!              │
//!              ▼
//!         TaskObservers / EventObservers (weak, callback-marshaled)
//! ```
//!
//! A queue's worker exists only while that queue has pending work; it is
//! spawned on first submission (or at startup via [`Dispatcher::recover`])
//! and deregisters itself once the queue drains. Tasks within one queue run
//! strictly sequentially; queues run concurrently with no cross-queue
//! ordering.
//!
//! The default [`Store`] implementation lives in the separate
//! `taskqueue-sqlite` crate; an in-memory fake for tests lives in
//! `taskqueue-testing`.

pub mod audit;
pub mod clock;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod model;
pub mod observer;
pub mod store;
pub mod worker;

pub use clock::{Clock, SharedClock, SystemClock};
pub use codec::{Codec, DecodeError, Decoded, JsonCodec};
pub use config::SchedulerConfig;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{Categorizable, FailureCategory, Result, SchedulerError};
pub use executor::{BoxFuture, CallbackExecutor, InlineTokioExecutor, Outcome, TaskExecutor, TaskHandle};
pub use model::{EventId, EventRecord, Queue, QueueId, RetryPolicy, ScheduledTask, TaskId, TaskKind, TaskRecord, TaskStatus};
pub use observer::{EventChange, EventListener, TaskChange, TaskListener};
pub use store::{EventView, Store, TaskView};
