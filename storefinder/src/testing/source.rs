//! Scripted location source.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::position::{
    BoxFuture, PositionCallback, PositionOptions, PositionSource, SensorError, SensorReading,
    SourceWatchId,
};

struct WatchEntry {
    callback: Arc<Mutex<PositionCallback>>,
    options: PositionOptions,
    cancelled: bool,
}

#[derive(Default)]
struct ManualSourceState {
    scripted: VecDeque<SensorReading>,
    pending: VecDeque<oneshot::Sender<SensorReading>>,
    requests: usize,
    last_options: Option<PositionOptions>,
    watches: BTreeMap<SourceWatchId, WatchEntry>,
    cancels: usize,
    next_id: u64,
}

/// Location source driven entirely by the test.
///
/// One-shot requests are answered from a script ([`push_response`](Self::push_response))
/// or left pending until [`resolve_next`](Self::resolve_next). Watch callbacks
/// are kept even after cancellation so tests can deliver a reading the host
/// had already queued ([`emit_late`](Self::emit_late)).
pub struct ManualPositionSource {
    available: AtomicBool,
    state: Mutex<ManualSourceState>,
}

impl std::fmt::Debug for ManualPositionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualPositionSource")
            .field("available", &self.available.load(Ordering::SeqCst))
            .field("requests", &state.requests)
            .field("watches", &state.watches.len())
            .finish_non_exhaustive()
    }
}

impl Default for ManualPositionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualPositionSource {
    /// A host with a working sensor.
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            state: Mutex::new(ManualSourceState::default()),
        }
    }

    /// A host without a sensor.
    pub fn unavailable() -> Self {
        let source = Self::new();
        source.set_available(false);
        source
    }

    /// Toggle sensor availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Queue an immediate answer for the next one-shot request.
    pub fn push_response(&self, reading: SensorReading) {
        self.state.lock().scripted.push_back(reading);
    }

    /// Answer the oldest pending one-shot request.
    ///
    /// Returns `false` if nothing was waiting.
    pub fn resolve_next(&self, reading: SensorReading) -> bool {
        let mut state = self.state.lock();
        while let Some(tx) = state.pending.pop_front() {
            if tx.send(reading.clone()).is_ok() {
                return true;
            }
        }
        false
    }

    /// Total one-shot requests received.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests
    }

    /// One-shot requests still waiting on an answer.
    pub fn pending_requests(&self) -> usize {
        self.state
            .lock()
            .pending
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    /// Options of the most recent request or watch.
    pub fn last_options(&self) -> Option<PositionOptions> {
        self.state.lock().last_options
    }

    /// Every watch id ever issued, in order.
    pub fn watch_ids(&self) -> Vec<SourceWatchId> {
        self.state.lock().watches.keys().copied().collect()
    }

    /// Watch ids not yet cancelled.
    pub fn active_watch_ids(&self) -> Vec<SourceWatchId> {
        self.state
            .lock()
            .watches
            .iter()
            .filter(|(_, entry)| !entry.cancelled)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Options a watch was started with.
    pub fn watch_options(&self, id: SourceWatchId) -> Option<PositionOptions> {
        self.state.lock().watches.get(&id).map(|entry| entry.options)
    }

    /// Whether the watch has been cancelled.
    pub fn is_cancelled(&self, id: SourceWatchId) -> bool {
        self.state
            .lock()
            .watches
            .get(&id)
            .is_some_and(|entry| entry.cancelled)
    }

    /// Number of `cancel_watch` calls that hit a live watch.
    pub fn cancel_count(&self) -> usize {
        self.state.lock().cancels
    }

    /// Deliver a reading to a live watch. Returns `false` if it was cancelled
    /// or unknown.
    pub fn emit(&self, id: SourceWatchId, reading: SensorReading) -> bool {
        self.deliver(id, reading, false)
    }

    /// Deliver a reading to every live watch in id order.
    pub fn emit_all(&self, reading: SensorReading) -> usize {
        self.active_watch_ids()
            .into_iter()
            .filter(|id| self.emit(*id, reading.clone()))
            .count()
    }

    /// Deliver a reading even if the watch was already cancelled, as a host
    /// would with a callback queued before the cancel.
    pub fn emit_late(&self, id: SourceWatchId, reading: SensorReading) -> bool {
        self.deliver(id, reading, true)
    }

    fn deliver(&self, id: SourceWatchId, reading: SensorReading, include_cancelled: bool) -> bool {
        let callback = {
            let state = self.state.lock();
            match state.watches.get(&id) {
                Some(entry) if include_cancelled || !entry.cancelled => {
                    Arc::clone(&entry.callback)
                }
                _ => return false,
            }
        };
        let mut callback = callback.lock();
        (*callback)(reading);
        true
    }
}

impl PositionSource for ManualPositionSource {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn request_once(&self, options: &PositionOptions) -> BoxFuture<'_, SensorReading> {
        let mut state = self.state.lock();
        state.requests += 1;
        state.last_options = Some(*options);

        if let Some(reading) = state.scripted.pop_front() {
            return Box::pin(async move { reading });
        }

        let (tx, rx) = oneshot::channel();
        state.pending.push_back(tx);
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(SensorError::position_unavailable("request abandoned")))
        })
    }

    fn watch(&self, options: &PositionOptions, callback: PositionCallback) -> SourceWatchId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = SourceWatchId(state.next_id);
        state.last_options = Some(*options);
        state.watches.insert(
            id,
            WatchEntry {
                callback: Arc::new(Mutex::new(callback)),
                options: *options,
                cancelled: false,
            },
        );
        id
    }

    fn cancel_watch(&self, id: SourceWatchId) {
        let mut state = self.state.lock();
        if let Some(entry) = state.watches.get_mut(&id) {
            if !entry.cancelled {
                entry.cancelled = true;
                state.cancels += 1;
            }
        }
    }
}
