//! Injectable wall clock.
//!
//! The store stamps `queued_at`/`retry_at`/`event_at` from a [`Clock`] rather
//! than calling `Utc::now()` directly so tests can advance time deterministically
//! instead of sleeping in wall-clock time.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock, backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub type SharedClock = Arc<dyn Clock>;

pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// Computes a non-negative sleep duration between `now` and `retry_at`,
/// saturating at zero for past instants instead of panicking.
pub fn wait_duration(now: DateTime<Utc>, retry_at: DateTime<Utc>) -> Duration {
    let delta = retry_at - now;
    delta.to_std().unwrap_or(Duration::ZERO)
}
