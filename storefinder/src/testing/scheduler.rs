//! Virtual-clock scheduler.

use std::time::Duration;

use parking_lot::Mutex;

use crate::stabilizer::{Scheduler, TimerId, TimerTask};

struct ManualTimer {
    id: TimerId,
    due: Duration,
    task: TimerTask,
    cancelled: bool,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    timers: Vec<ManualTimer>,
    scheduled: usize,
    fired: usize,
}

/// Scheduler whose clock only moves when the test calls
/// [`advance`](Self::advance).
///
/// Timers due within an advance fire in `(due, id)` order, each one outside
/// the scheduler's lock so tasks may schedule or cancel further timers.
///
/// [`firing_cancelled`](Self::firing_cancelled) builds a scheduler that keeps
/// firing cancelled timers, standing in for a host whose cancel lost the race
/// against an expiring timer.
pub struct ManualScheduler {
    clock: Mutex<ManualClock>,
    fire_cancelled: bool,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clock = self.clock.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &clock.now)
            .field("timers", &clock.timers.len())
            .field("fire_cancelled", &self.fire_cancelled)
            .finish()
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    /// Scheduler that drops cancelled timers.
    pub fn new() -> Self {
        Self {
            clock: Mutex::new(ManualClock::default()),
            fire_cancelled: false,
        }
    }

    /// Scheduler that still fires cancelled timers.
    pub fn firing_cancelled() -> Self {
        Self {
            clock: Mutex::new(ManualClock::default()),
            fire_cancelled: true,
        }
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Move the clock forward, firing every timer that comes due.
    pub fn advance(&self, by: Duration) {
        let target = self.clock.lock().now + by;
        loop {
            let next = {
                let mut clock = self.clock.lock();
                let index = clock
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.due <= target)
                    .min_by_key(|(_, timer)| (timer.due, timer.id))
                    .map(|(index, _)| index);
                match index {
                    Some(index) => {
                        let timer = clock.timers.remove(index);
                        clock.now = clock.now.max(timer.due);
                        clock.fired += 1;
                        Some(timer)
                    }
                    None => None,
                }
            };
            match next {
                Some(timer) => (timer.task)(),
                None => break,
            }
        }
        let mut clock = self.clock.lock();
        clock.now = clock.now.max(target);
    }

    /// Timers armed and not cancelled.
    pub fn pending_timers(&self) -> usize {
        self.clock
            .lock()
            .timers
            .iter()
            .filter(|timer| !timer.cancelled)
            .count()
    }

    /// Total `after` calls.
    pub fn scheduled_count(&self) -> usize {
        self.clock.lock().scheduled
    }

    /// Total tasks run, cancelled ones included.
    pub fn fired_count(&self) -> usize {
        self.clock.lock().fired
    }
}

impl Scheduler for ManualScheduler {
    fn after(&self, delay: Duration, task: TimerTask) -> TimerId {
        let mut clock = self.clock.lock();
        clock.next_id += 1;
        clock.scheduled += 1;
        let id = TimerId(clock.next_id);
        let due = clock.now + delay;
        clock.timers.push(ManualTimer {
            id,
            due,
            task,
            cancelled: false,
        });
        id
    }

    fn cancel(&self, id: TimerId) {
        let mut clock = self.clock.lock();
        if self.fire_cancelled {
            if let Some(timer) = clock.timers.iter_mut().find(|timer| timer.id == id) {
                timer.cancelled = true;
            }
        } else {
            clock.timers.retain(|timer| timer.id != id);
        }
    }
}
