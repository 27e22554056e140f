//! Test fixtures for `taskqueue-core`, mirroring the teacher crate's
//! separate testing crate: a fake clock so tests can advance retry time
//! deterministically, and a scripted executor so tests can assert exactly
//! which task payloads ran and in what order without standing up real
//! task-execution code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use taskqueue_core::clock::Clock;
use taskqueue_core::error::{Result, SchedulerError};
use taskqueue_core::executor::{Outcome, TaskExecutor, TaskHandle};

/// A clock under direct test control. Starts at a fixed instant (UNIX epoch
/// by default) rather than the wall clock, so retry-timing assertions don't
/// depend on when the test happened to run.
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    pub fn epoch() -> Arc<Self> {
        Self::new(DateTime::UNIX_EPOCH)
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// One scripted response for a single call to [`ScriptedExecutor::run`].
pub enum ScriptedOutcome {
    Success,
    Requeue,
    Failed(String),
    DecodeFailure(String),
}

/// A [`TaskExecutor`] that returns a pre-programmed sequence of outcomes,
/// one per call, and records the raw payload bytes it was invoked with.
///
/// Exhausting the script panics on the next call — a test that under- or
/// over-estimates how many times its task runs should fail loudly rather
/// than silently falling back to a default outcome.
pub struct ScriptedExecutor {
    script: Mutex<Vec<ScriptedOutcome>>,
    calls: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedExecutor {
    pub fn new(script: Vec<ScriptedOutcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().rev().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Payload bytes passed to each call so far, in call order.
    pub fn calls(&self) -> Vec<Vec<u8>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn run(&self, payload_blob: &[u8], _handle: Arc<TaskHandle>) -> Result<Outcome> {
        self.calls.lock().unwrap().push(payload_blob.to_vec());

        let next = self
            .script
            .lock()
            .unwrap()
            .pop()
            .expect("ScriptedExecutor called more times than it was scripted for");

        match next {
            ScriptedOutcome::Success => Ok(Outcome::Success),
            ScriptedOutcome::Requeue => Ok(Outcome::Requeue),
            ScriptedOutcome::Failed(reason) => Ok(Outcome::Failed {
                reason,
                exception_blob: None,
            }),
            ScriptedOutcome::DecodeFailure(reason) => Err(SchedulerError::DecodeFailure(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_deterministically() {
        let clock = FakeClock::epoch();
        let start = clock.now();
        clock.advance(chrono::Duration::seconds(5));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(5));
    }

    #[tokio::test]
    async fn scripted_executor_plays_back_in_order() {
        let executor = ScriptedExecutor::new(vec![ScriptedOutcome::Requeue, ScriptedOutcome::Success]);

        let first = executor.run(b"payload", TaskHandle::new()).await.unwrap();
        assert!(matches!(first, Outcome::Requeue));

        let second = executor.run(b"payload", TaskHandle::new()).await.unwrap();
        assert!(matches!(second, Outcome::Success));

        assert_eq!(executor.call_count(), 2);
    }

    #[tokio::test]
    #[should_panic(expected = "called more times than it was scripted for")]
    async fn scripted_executor_panics_once_exhausted() {
        let executor = ScriptedExecutor::new(vec![ScriptedOutcome::Success]);
        let _ = executor.run(b"x", TaskHandle::new()).await;
        let _ = executor.run(b"x", TaskHandle::new()).await;
    }
}
