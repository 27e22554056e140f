//! Debug-only auditing for task and event visibility.
//!
//! An [`AuditLog`] is a [`TaskListener`]/[`EventListener`] that traces every
//! change at debug level. Wire it in during development with
//! `dispatcher.register_task_listener(Arc::new(AuditLog))`; leaving it
//! registered in a release build costs nothing beyond the `tracing` filter
//! check, but it is meant for debugging, not production observability.

use crate::observer::{EventChange, EventListener, TaskChange, TaskListener};
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct AuditLog;

impl TaskListener for AuditLog {
    fn on_task_change(&self, change: TaskChange) {
        debug!(?change, "task change");
    }
}

impl EventListener for AuditLog {
    fn on_event_change(&self, change: EventChange) {
        debug!(?change, "event change");
    }
}
