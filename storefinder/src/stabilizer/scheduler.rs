//! Delay scheduler capability.
//!
//! The stabilizer never sleeps on its own; it asks a [`Scheduler`] to run a
//! task later and cancels it when the value changes again.
//!
//! # Implementors
//!
//! - [`TokioScheduler`] - one tokio task per timer
//! - [`crate::testing::ManualScheduler`] - virtual clock for tests

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Work run when a timer fires.
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Identifier of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Host delay scheduler.
pub trait Scheduler: Send + Sync {
    /// Run `task` once `delay` has elapsed.
    fn after(&self, delay: Duration, task: TimerTask) -> TimerId;

    /// Cancel a timer. Unknown or already fired ids are ignored.
    fn cancel(&self, id: TimerId);
}

/// Scheduler backed by a tokio runtime.
///
/// Each timer is a spawned task racing a sleep against its cancellation
/// token. Works with paused time in tests.
#[derive(Debug)]
pub struct TokioScheduler {
    handle: Handle,
    timers: Arc<DashMap<TimerId, CancellationToken>>,
    next_id: AtomicU64,
}

impl TokioScheduler {
    /// Create a scheduler spawning onto `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            timers: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a scheduler for the runtime of the calling context, if any.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Timers armed and not yet fired or cancelled.
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }
}

impl Scheduler for TokioScheduler {
    fn after(&self, delay: Duration, task: TimerTask) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        self.timers.insert(id, token.clone());

        let timers = Arc::clone(&self.timers);
        self.handle.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!(timer = id.0, "Timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    timers.remove(&id);
                    task();
                }
            }
        });
        id
    }

    fn cancel(&self, id: TimerId) {
        if let Some((_, token)) = self.timers.remove(&id) {
            token.cancel();
        }
    }
}
