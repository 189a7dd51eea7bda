//! Debounced value.
//!
//! Turns a rapidly changing raw value (search box text, map viewport) into a
//! settled value that only moves once the raw value has been quiet for the
//! requested period.
//!
//! ```text
//! raw:     a ─ b ─ c ───────────────── d ─────────────────
//!          │   │   │                   │
//! timer:   ├─x ├─x ├──── quiet ────►   ├──── quiet ────►
//!                                  │                   │
//! stable:  a ──────────────────────c ──────────────────d
//! ```
//!
//! Each change re-arms the timer and cancels the previous one. A generation
//! counter guards against a timer the scheduler failed to cancel in time: a
//! task carrying an old generation is ignored.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace};

use super::scheduler::{Scheduler, TimerId};

/// Quiet period used for search input when none is configured.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

#[derive(Debug)]
struct StabilizerState<T> {
    raw: T,
    stable: T,
    generation: u64,
    pending: Option<TimerId>,
    emissions: u64,
    torn_down: bool,
}

impl<T: Clone + PartialEq> StabilizerState<T> {
    fn settle(&mut self, updates: &watch::Sender<T>) {
        self.pending = None;
        if self.stable == self.raw {
            return;
        }
        self.stable = self.raw.clone();
        self.emissions += 1;
        updates.send_replace(self.stable.clone());
    }
}

#[derive(Debug)]
struct StabilizerShared<T> {
    state: Mutex<StabilizerState<T>>,
    updates: watch::Sender<T>,
}

impl<T> StabilizerShared<T> {
    /// Freeze the state and cancel the pending timer. Returns `true` if a
    /// timer was pending.
    fn shut_down(&self, scheduler: &dyn Scheduler) -> bool {
        let mut state = self.state.lock();
        if state.torn_down {
            return false;
        }
        state.torn_down = true;
        state.generation += 1;
        match state.pending.take() {
            Some(timer) => {
                scheduler.cancel(timer);
                true
            }
            None => false,
        }
    }
}

impl<T: Clone + PartialEq> StabilizerShared<T> {
    fn fire(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.torn_down || state.generation != generation {
            trace!(
                generation,
                current = state.generation,
                "Ignoring superseded stabilizer timer"
            );
            return;
        }
        state.settle(&self.updates);
        debug!(emissions = state.emissions, "Stabilized value emitted");
    }
}

/// Debounces a value behind a quiet period.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use storefinder::stabilizer::ValueStabilizer;
/// use storefinder::testing::ManualScheduler;
///
/// let scheduler = Arc::new(ManualScheduler::new());
/// let query = ValueStabilizer::new(String::new(), scheduler.clone());
/// let quiet = Duration::from_millis(300);
///
/// query.observe("g".to_string(), quiet);
/// query.observe("gi".to_string(), quiet);
/// query.observe("gim".to_string(), quiet);
/// assert_eq!(query.stable(), "");
///
/// scheduler.advance(Duration::from_millis(300));
/// assert_eq!(query.stable(), "gim");
/// assert_eq!(query.emissions(), 1);
/// ```
pub struct ValueStabilizer<T> {
    shared: Arc<StabilizerShared<T>>,
    scheduler: Arc<dyn Scheduler>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for ValueStabilizer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStabilizer")
            .field("state", &*self.shared.state.lock())
            .finish_non_exhaustive()
    }
}

impl<T> ValueStabilizer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a stabilizer whose stable value starts at `initial`.
    pub fn new(initial: T, scheduler: Arc<dyn Scheduler>) -> Self {
        let (updates, _) = watch::channel(initial.clone());
        Self {
            shared: Arc::new(StabilizerShared {
                state: Mutex::new(StabilizerState {
                    raw: initial.clone(),
                    stable: initial,
                    generation: 0,
                    pending: None,
                    emissions: 0,
                    torn_down: false,
                }),
                updates,
            }),
            scheduler,
        }
    }

    /// Feed the latest raw value and return the current stable value.
    ///
    /// A value different from the previous raw value re-arms the timer for
    /// `quiet_period`, cancelling any armed timer. A zero quiet period
    /// settles immediately. An unchanged value leaves the timer alone.
    pub fn observe(&self, raw: T, quiet_period: Duration) -> T {
        let mut state = self.shared.state.lock();
        if state.torn_down || state.raw == raw {
            return state.stable.clone();
        }

        state.raw = raw;
        state.generation += 1;
        if let Some(previous) = state.pending.take() {
            self.scheduler.cancel(previous);
        }

        if quiet_period.is_zero() {
            state.settle(&self.shared.updates);
            return state.stable.clone();
        }

        let generation = state.generation;
        let weak: Weak<StabilizerShared<T>> = Arc::downgrade(&self.shared);
        // Holding the state lock here means a timer firing early still waits
        // until `pending` is recorded.
        let timer = self.scheduler.after(
            quiet_period,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.fire(generation);
                }
            }),
        );
        state.pending = Some(timer);
        trace!(
            generation,
            quiet_ms = quiet_period.as_millis() as u64,
            "Stabilizer timer armed"
        );
        state.stable.clone()
    }

    /// Latest settled value.
    pub fn stable(&self) -> T {
        self.shared.state.lock().stable.clone()
    }

    /// Latest raw value.
    pub fn raw(&self) -> T {
        self.shared.state.lock().raw.clone()
    }

    /// Whether an emission is waiting on the quiet period.
    pub fn is_pending(&self) -> bool {
        self.shared.state.lock().pending.is_some()
    }

    /// Number of times the stable value changed.
    pub fn emissions(&self) -> u64 {
        self.shared.state.lock().emissions
    }

    /// Receiver notified on every settled value.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.shared.updates.subscribe()
    }

    /// Cancel any pending emission and freeze the stable value.
    ///
    /// Also runs on drop. Further observations are ignored.
    pub fn teardown(&self) {
        if self.shared.shut_down(self.scheduler.as_ref()) {
            debug!("Stabilizer torn down with pending emission");
        }
    }

    /// Whether [`teardown`](Self::teardown) has run.
    pub fn is_torn_down(&self) -> bool {
        self.shared.state.lock().torn_down
    }
}

impl<T> Drop for ValueStabilizer<T> {
    fn drop(&mut self) {
        self.shared.shut_down(self.scheduler.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stabilizer::TokioScheduler;
    use crate::testing::ManualScheduler;

    const QUIET: Duration = Duration::from_millis(300);

    fn manual() -> (Arc<ManualScheduler>, ValueStabilizer<&'static str>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let stabilizer = ValueStabilizer::new("", scheduler.clone() as Arc<dyn Scheduler>);
        (scheduler, stabilizer)
    }

    #[test]
    fn test_initial_value_is_stable_immediately() {
        let (_scheduler, stabilizer) = manual();
        assert_eq!(stabilizer.stable(), "");
        assert!(!stabilizer.is_pending());
    }

    #[test]
    fn test_rapid_changes_emit_only_last() {
        let (scheduler, stabilizer) = manual();
        let mut updates = stabilizer.subscribe();

        assert_eq!(stabilizer.observe("a", QUIET), "");
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(stabilizer.observe("b", QUIET), "");
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(stabilizer.observe("c", QUIET), "");
        assert_eq!(scheduler.pending_timers(), 1);

        scheduler.advance(Duration::from_millis(299));
        assert_eq!(stabilizer.stable(), "");
        assert!(!updates.has_changed().unwrap());

        scheduler.advance(Duration::from_millis(1));
        assert_eq!(stabilizer.stable(), "c");
        assert_eq!(stabilizer.emissions(), 1);
        assert_eq!(*updates.borrow_and_update(), "c");

        scheduler.advance(Duration::from_secs(5));
        assert_eq!(stabilizer.emissions(), 1);
    }

    #[test]
    fn test_oscillation_emits_final_value_only() {
        let (scheduler, stabilizer) = manual();
        stabilizer.observe("x", QUIET);
        scheduler.advance(QUIET);
        assert_eq!(stabilizer.stable(), "x");

        for value in ["y", "x", "y", "x", "y"] {
            stabilizer.observe(value, QUIET);
            scheduler.advance(Duration::from_millis(50));
        }
        assert_eq!(stabilizer.stable(), "x");

        scheduler.advance(QUIET);
        assert_eq!(stabilizer.stable(), "y");
        assert_eq!(stabilizer.emissions(), 2);
    }

    #[test]
    fn test_zero_quiet_period_emits_every_change() {
        let (scheduler, stabilizer) = manual();

        assert_eq!(stabilizer.observe("a", Duration::ZERO), "a");
        assert_eq!(stabilizer.observe("b", Duration::ZERO), "b");
        assert_eq!(stabilizer.observe("c", Duration::ZERO), "c");

        assert_eq!(stabilizer.emissions(), 3);
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn test_unchanged_value_does_not_rearm() {
        let (scheduler, stabilizer) = manual();
        stabilizer.observe("a", QUIET);
        scheduler.advance(Duration::from_millis(200));
        stabilizer.observe("a", QUIET);

        scheduler.advance(Duration::from_millis(100));
        assert_eq!(stabilizer.stable(), "a");
        assert_eq!(scheduler.scheduled_count(), 1);
    }

    #[test]
    fn test_teardown_cancels_pending_emission() {
        let (scheduler, stabilizer) = manual();
        stabilizer.observe("a", QUIET);
        stabilizer.teardown();

        assert_eq!(scheduler.pending_timers(), 0);
        scheduler.advance(QUIET * 2);
        assert_eq!(stabilizer.stable(), "");
        assert_eq!(stabilizer.observe("b", Duration::ZERO), "");
        assert!(stabilizer.is_torn_down());
    }

    #[test]
    fn test_late_firing_after_rearm_is_ignored() {
        let scheduler = Arc::new(ManualScheduler::firing_cancelled());
        let stabilizer = ValueStabilizer::new(0u32, scheduler.clone() as Arc<dyn Scheduler>);

        stabilizer.observe(1, Duration::from_millis(100));
        scheduler.advance(Duration::from_millis(50));
        stabilizer.observe(2, Duration::from_millis(100));

        // the cancelled timer for 1 still fires at t=100
        scheduler.advance(Duration::from_millis(60));
        assert_eq!(stabilizer.stable(), 0);

        scheduler.advance(Duration::from_millis(40));
        assert_eq!(stabilizer.stable(), 2);
        assert_eq!(stabilizer.emissions(), 1);
    }

    #[test]
    fn test_late_firing_after_drop_is_inert() {
        let scheduler = Arc::new(ManualScheduler::firing_cancelled());
        let stabilizer = ValueStabilizer::new(0u32, scheduler.clone() as Arc<dyn Scheduler>);
        let updates = stabilizer.subscribe();

        stabilizer.observe(7, Duration::from_millis(100));
        drop(stabilizer);
        scheduler.advance(Duration::from_millis(200));

        assert_eq!(scheduler.fired_count(), 1);
        assert_eq!(*updates.borrow(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_debounce() {
        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler::try_current().unwrap());
        let stabilizer = ValueStabilizer::new(String::new(), scheduler);
        let mut updates = stabilizer.subscribe();

        for query in ["c", "cu", "cup"] {
            stabilizer.observe(query.to_string(), QUIET);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(stabilizer.stable(), "");

        updates.changed().await.unwrap();
        assert_eq!(*updates.borrow_and_update(), "cup");
        assert_eq!(stabilizer.emissions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_teardown() {
        let tokio_scheduler = Arc::new(TokioScheduler::try_current().unwrap());
        let stabilizer = ValueStabilizer::new(0u64, tokio_scheduler.clone() as Arc<dyn Scheduler>);

        stabilizer.observe(5, QUIET);
        assert_eq!(tokio_scheduler.active_timers(), 1);
        stabilizer.teardown();
        assert_eq!(tokio_scheduler.active_timers(), 0);

        tokio::time::sleep(QUIET * 3).await;
        assert_eq!(stabilizer.stable(), 0);
    }
}
