//! Position tracker.
//!
//! Owns the fix/error/loading state for one consumer and mediates access to
//! the injected [`PositionSource`].
//!
//! # State Machine
//!
//! ```text
//!            request_once / start_watching (clears a stale error)
//!   Empty ───────────────────────────────────────────────► Empty (loading)
//!     ▲                                                       │
//!     │ clear_error                          success ┌────────┴────────┐ failure
//!     │                                              ▼                 ▼
//!   Failed(TrackingError) ◄──────── failure ──── Fixed(Position)    Failed
//!                          ────────  success ──────►
//! ```
//!
//! A fix and an error are never live together. Watch callbacks go through the
//! same transitions as one-shot results.
//!
//! # Late Callbacks
//!
//! Every watch callback captures a `Weak` reference to the tracker state and
//! its own handle id. A reading is applied only if the handle is still in the
//! active set when the state lock is taken, so once [`PositionTracker::stop_watching`]
//! returns nothing from that subscription can touch the state, even if the
//! source delivers a reading it had already queued. One-shot results are
//! tagged with an epoch that [`PositionTracker::dispose`] bumps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use super::error::TrackingError;
use super::model::{Position, Reading, TrackerSnapshot};
use super::options::PositionOptions;
use super::source::{PositionCallback, PositionSource, SensorReading, SourceWatchId};

/// Handle ids are unique across all trackers in the process, so a handle
/// never matches a watch on a tracker that did not issue it.
static NEXT_WATCH_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Caller-owned token for a continuous watch.
///
/// Release it with [`PositionTracker::stop_watching`]; otherwise the source
/// subscription stays alive until the tracker is disposed.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping a WatchHandle without stop_watching leaks the subscription"]
pub struct WatchHandle {
    id: u64,
}

#[derive(Debug, Default)]
struct TrackerState {
    reading: Reading,
    in_flight: usize,
    epoch: u64,
    disposed: bool,
    /// Active handles. The source id is `None` while `start_watching` is
    /// still registering with the source.
    watches: HashMap<u64, Option<SourceWatchId>>,
}

impl TrackerState {
    fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            reading: self.reading.clone(),
            loading: self.in_flight > 0,
        }
    }

    fn apply(&mut self, reading: &Result<Position, TrackingError>) {
        self.reading = match reading {
            Ok(position) => Reading::Fixed(*position),
            Err(err) => Reading::Failed(err.clone()),
        };
    }

    fn clear_error(&mut self) -> bool {
        if matches!(self.reading, Reading::Failed(_)) {
            self.reading = Reading::Empty;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct TrackerShared {
    state: Mutex<TrackerState>,
    updates: watch::Sender<TrackerSnapshot>,
}

impl TrackerShared {
    /// Run `f` under the state lock and notify subscribers if the visible
    /// snapshot changed.
    fn update<R>(&self, f: impl FnOnce(&mut TrackerState) -> R) -> R {
        let mut state = self.state.lock();
        let result = f(&mut state);
        let next = state.snapshot();
        self.updates.send_if_modified(|current| {
            if *current != next {
                *current = next;
                true
            } else {
                false
            }
        });
        result
    }

    fn apply_watch_reading(&self, handle: u64, reading: SensorReading) {
        let reading = reading.map_err(TrackingError::from);
        self.update(|state| {
            if state.disposed || !state.watches.contains_key(&handle) {
                trace!(handle, "Discarding reading for released watch");
                return;
            }
            match &reading {
                Ok(position) => debug!(
                    handle,
                    latitude = position.latitude,
                    longitude = position.longitude,
                    accuracy_m = position.accuracy_meters,
                    "Watch position update"
                ),
                Err(err) => warn!(handle, kind = %err.kind(), error = %err, "Watch sensor error"),
            }
            state.apply(&reading);
        });
    }

    fn finish_request(&self, epoch: u64, outcome: Option<&Result<Position, TrackingError>>) {
        self.update(|state| {
            if state.disposed || state.epoch != epoch {
                trace!(epoch, "Discarding one-shot result after dispose");
                return;
            }
            state.in_flight = state.in_flight.saturating_sub(1);
            if let Some(outcome) = outcome {
                state.apply(outcome);
            }
        });
    }
}

/// Keeps `loading` honest if a `request_once` future is dropped before the
/// source answers.
struct InFlight<'a> {
    shared: &'a TrackerShared,
    epoch: u64,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, outcome: &Result<Position, TrackingError>) {
        self.settled = true;
        self.shared.finish_request(self.epoch, Some(outcome));
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.shared.finish_request(self.epoch, None);
        }
    }
}

/// Mediates one-shot and continuous position acquisition.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use storefinder::position::{PositionOptions, PositionTracker, TrackingErrorKind};
/// use storefinder::testing::ManualPositionSource;
/// use storefinder::position::SensorError;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = Arc::new(ManualPositionSource::new());
/// source.push_response(Err(SensorError::permission_denied("denied")));
///
/// let tracker = PositionTracker::new(source);
/// let err = tracker.request_once(PositionOptions::default()).await.unwrap_err();
/// assert_eq!(err.kind(), TrackingErrorKind::PermissionDenied);
/// assert!(tracker.position().is_none());
/// # }
/// ```
pub struct PositionTracker {
    source: Arc<dyn PositionSource>,
    shared: Arc<TrackerShared>,
}

impl std::fmt::Debug for PositionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionTracker")
            .field("state", &*self.shared.state.lock())
            .finish_non_exhaustive()
    }
}

impl PositionTracker {
    /// Create a tracker over the given host capability.
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        let (updates, _) = watch::channel(TrackerSnapshot::default());
        Self {
            source,
            shared: Arc::new(TrackerShared {
                state: Mutex::new(TrackerState::default()),
                updates,
            }),
        }
    }

    /// Acquire a single fix.
    ///
    /// The outcome is both returned and recorded in tracker state. Fails
    /// immediately with [`TrackingError::Unsupported`] when the host has no
    /// sensor, without contacting it. Timeouts are the source's job.
    /// A disposed tracker fails without contacting the source.
    pub async fn request_once(&self, options: PositionOptions) -> Result<Position, TrackingError> {
        if self.is_disposed() {
            debug!("One-shot position request on disposed tracker");
            return Err(TrackingError::PositionUnavailable(
                "position tracker disposed".to_string(),
            ));
        }
        if !self.source.is_available() {
            let err = TrackingError::unsupported();
            warn!(error = %err, "One-shot position request on unsupported host");
            self.shared.update(|state| {
                if !state.disposed {
                    state.reading = Reading::Failed(err.clone());
                }
            });
            return Err(err);
        }

        let epoch = self.shared.update(|state| {
            if !state.disposed {
                state.in_flight += 1;
                state.clear_error();
            }
            state.epoch
        });
        let guard = InFlight {
            shared: &self.shared,
            epoch,
            settled: false,
        };

        debug!(
            high_accuracy = options.high_accuracy,
            timeout_ms = options.timeout.as_millis() as u64,
            maximum_age_ms = options.maximum_age.as_millis() as u64,
            "Requesting one-shot position"
        );
        let outcome = self
            .source
            .request_once(&options)
            .await
            .map_err(TrackingError::from);

        match &outcome {
            Ok(position) => debug!(
                latitude = position.latitude,
                longitude = position.longitude,
                accuracy_m = position.accuracy_meters,
                "One-shot position acquired"
            ),
            Err(err) => warn!(kind = %err.kind(), error = %err, "One-shot position failed"),
        }
        guard.settle(&outcome);
        outcome
    }

    /// Start a continuous watch.
    ///
    /// Returns immediately; readings arrive through the source's callback and
    /// overwrite the tracker state as they come. On a host without a sensor
    /// the tracker records `Unsupported` and the returned handle is inert.
    pub fn start_watching(&self, options: PositionOptions) -> WatchHandle {
        let available = self.source.is_available();
        let id = NEXT_WATCH_HANDLE.fetch_add(1, Ordering::Relaxed);
        let registered = self.shared.update(|state| {
            if state.disposed {
                return false;
            }
            if !available {
                state.reading = Reading::Failed(TrackingError::unsupported());
                return false;
            }
            state.watches.insert(id, None);
            state.clear_error();
            true
        });

        if !registered {
            warn!(handle = id, available, "Watch not started");
            return WatchHandle { id };
        }

        let weak: Weak<TrackerShared> = Arc::downgrade(&self.shared);
        let callback: PositionCallback = Box::new(move |reading| match weak.upgrade() {
            Some(shared) => shared.apply_watch_reading(id, reading),
            None => trace!(handle = id, "Discarding reading for dropped tracker"),
        });
        let source_id = self.source.watch(&options, callback);

        let still_active = {
            let mut state = self.shared.state.lock();
            match state.watches.get_mut(&id) {
                Some(slot) => {
                    *slot = Some(source_id);
                    true
                }
                None => false,
            }
        };
        if !still_active {
            debug!(
                handle = id,
                source_watch = source_id.0,
                "Watch released while registering, cancelling source watch"
            );
            self.source.cancel_watch(source_id);
            return WatchHandle { id };
        }

        info!(handle = id, source_watch = source_id.0, "Started position watch");
        WatchHandle { id }
    }

    /// Release a watch.
    ///
    /// Idempotent: unknown or already released handles are ignored. Once this
    /// returns, no reading from the subscription can change tracker state.
    pub fn stop_watching(&self, handle: &WatchHandle) {
        let removed = self.shared.state.lock().watches.remove(&handle.id);
        match removed {
            Some(Some(source_id)) => {
                self.source.cancel_watch(source_id);
                info!(handle = handle.id, "Stopped position watch");
            }
            // start_watching cancels the source side when it sees the slot gone
            Some(None) => debug!(handle = handle.id, "Watch released during registration"),
            None => debug!(handle = handle.id, "Watch already released"),
        }
    }

    /// Whether a handle still refers to a live watch.
    pub fn is_watching(&self, handle: &WatchHandle) -> bool {
        self.shared.state.lock().watches.contains_key(&handle.id)
    }

    /// Number of live watches.
    pub fn active_watches(&self) -> usize {
        self.shared.state.lock().watches.len()
    }

    /// Latest fix, if the last outcome was a success.
    pub fn position(&self) -> Option<Position> {
        self.shared.state.lock().reading.position().copied()
    }

    /// Latest error, if the last outcome was a failure.
    pub fn error(&self) -> Option<TrackingError> {
        self.shared.state.lock().reading.error().cloned()
    }

    /// True while a one-shot request is outstanding.
    pub fn is_loading(&self) -> bool {
        self.shared.state.lock().in_flight > 0
    }

    /// Point-in-time copy of the whole state.
    pub fn snapshot(&self) -> TrackerSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// Receiver notified whenever the snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Drop a stale error without issuing a new request.
    ///
    /// Returns `true` if an error was cleared.
    pub fn clear_error(&self) -> bool {
        self.shared.update(|state| state.clear_error())
    }

    /// Release every watch and ignore any result still in flight.
    ///
    /// Terminal: afterwards the state is frozen. Also runs on drop.
    pub fn dispose(&self) {
        let released = self.shared.update(|state| {
            if state.disposed {
                return Vec::new();
            }
            state.disposed = true;
            state.epoch += 1;
            state.in_flight = 0;
            state.watches.drain().filter_map(|(_, id)| id).collect()
        });

        if !released.is_empty() {
            info!(watches = released.len(), "Disposing position tracker");
        }
        for source_id in released {
            self.source.cancel_watch(source_id);
        }
    }

    /// Whether [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().disposed
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{BoxFuture, SensorError, TrackingErrorKind};
    use crate::testing::ManualPositionSource;

    /// Source that disposes its tracker from inside `watch`.
    struct DisposingSource {
        inner: ManualPositionSource,
        tracker: Mutex<Weak<PositionTracker>>,
    }

    impl PositionSource for DisposingSource {
        fn is_available(&self) -> bool {
            self.inner.is_available()
        }

        fn request_once(&self, options: &PositionOptions) -> BoxFuture<'_, SensorReading> {
            self.inner.request_once(options)
        }

        fn watch(&self, options: &PositionOptions, callback: PositionCallback) -> SourceWatchId {
            let id = self.inner.watch(options, callback);
            let tracker = self.tracker.lock().upgrade();
            if let Some(tracker) = tracker {
                tracker.dispose();
            }
            id
        }

        fn cancel_watch(&self, id: SourceWatchId) {
            self.inner.cancel_watch(id);
        }
    }

    fn seoul() -> Position {
        Position::new(37.5665, 126.9780, 12.0, 1_700_000_000_000)
    }

    fn busan() -> Position {
        Position::new(35.1796, 129.0756, 20.0, 1_700_000_060_000)
    }

    fn tracker_with_source() -> (Arc<ManualPositionSource>, PositionTracker) {
        let source = Arc::new(ManualPositionSource::new());
        let tracker = PositionTracker::new(source.clone());
        (source, tracker)
    }

    #[tokio::test]
    async fn test_request_once_success() {
        let (source, tracker) = tracker_with_source();
        source.push_response(Ok(seoul()));

        let position = tracker
            .request_once(PositionOptions::default())
            .await
            .unwrap();

        assert_eq!(position, seoul());
        assert_eq!(tracker.position(), Some(seoul()));
        assert!(tracker.error().is_none());
        assert!(!tracker.is_loading());
    }

    #[tokio::test]
    async fn test_request_once_permission_denied_leaves_position_unset() {
        let (source, tracker) = tracker_with_source();
        source.push_response(Err(SensorError::permission_denied("user denied")));

        let err = tracker
            .request_once(PositionOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), TrackingErrorKind::PermissionDenied);
        assert_eq!(tracker.error(), Some(err));
        assert!(tracker.position().is_none());
        assert!(!tracker.is_loading());
    }

    #[tokio::test]
    async fn test_failure_replaces_position_and_success_replaces_error() {
        let (source, tracker) = tracker_with_source();
        source.push_response(Ok(seoul()));
        source.push_response(Err(SensorError::timeout("slow")));
        source.push_response(Ok(busan()));

        tracker.request_once(PositionOptions::default()).await.unwrap();
        let _ = tracker.request_once(PositionOptions::default()).await;
        assert!(tracker.position().is_none());
        assert_eq!(tracker.error().unwrap().kind(), TrackingErrorKind::Timeout);

        tracker.request_once(PositionOptions::default()).await.unwrap();
        assert_eq!(tracker.position(), Some(busan()));
        assert!(tracker.error().is_none());
    }

    #[tokio::test]
    async fn test_unsupported_host_never_calls_source() {
        let source = Arc::new(ManualPositionSource::unavailable());
        let tracker = PositionTracker::new(source.clone());
        let mut updates = tracker.subscribe();

        let err = tracker
            .request_once(PositionOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), TrackingErrorKind::Unsupported);
        assert_eq!(source.request_count(), 0);
        assert!(!tracker.is_loading());
        assert!(updates.has_changed().unwrap());
        assert!(!updates.borrow_and_update().loading);
    }

    #[tokio::test]
    async fn test_loading_while_request_pending() {
        let (source, tracker) = tracker_with_source();
        source.push_response(Err(SensorError::position_unavailable("indoors")));
        let _ = tracker.request_once(PositionOptions::default()).await;
        assert!(tracker.error().is_some());

        let (outcome, ()) = tokio::join!(tracker.request_once(PositionOptions::default()), async {
            tokio::task::yield_now().await;
            assert!(tracker.is_loading());
            // a new attempt clears the stale error
            assert!(tracker.error().is_none());
            assert!(source.resolve_next(Ok(seoul())));
        });

        assert_eq!(outcome.unwrap(), seoul());
        assert!(!tracker.is_loading());
    }

    #[tokio::test]
    async fn test_dropped_request_resets_loading() {
        let (source, tracker) = tracker_with_source();
        {
            let request = tracker.request_once(PositionOptions::default());
            let _ = tokio::time::timeout(std::time::Duration::from_millis(10), request).await;
        }
        assert_eq!(source.pending_requests(), 0);
        assert!(!tracker.is_loading());
    }

    #[tokio::test]
    async fn test_dispose_discards_pending_result() {
        let (source, tracker) = tracker_with_source();

        let (outcome, ()) = tokio::join!(tracker.request_once(PositionOptions::default()), async {
            tokio::task::yield_now().await;
            tracker.dispose();
            assert!(source.resolve_next(Ok(seoul())));
        });

        assert!(outcome.is_ok());
        assert!(tracker.position().is_none());
        assert!(!tracker.is_loading());
        assert!(tracker.is_disposed());
    }

    #[test]
    fn test_watch_updates_in_emission_order() {
        let (source, tracker) = tracker_with_source();
        let handle = tracker.start_watching(PositionOptions::default());
        let id = source.active_watch_ids()[0];

        assert!(source.emit(id, Ok(seoul())));
        assert_eq!(tracker.position(), Some(seoul()));
        assert!(source.emit(id, Ok(busan())));
        assert_eq!(tracker.position(), Some(busan()));

        tracker.stop_watching(&handle);
    }

    #[test]
    fn test_watch_error_does_not_end_watch() {
        let (source, tracker) = tracker_with_source();
        let handle = tracker.start_watching(PositionOptions::default());
        let id = source.active_watch_ids()[0];

        source.emit(id, Err(SensorError::new(99, "glitch")));
        assert_eq!(tracker.error().unwrap().kind(), TrackingErrorKind::Unknown);
        assert!(tracker.is_watching(&handle));

        source.emit(id, Ok(seoul()));
        assert_eq!(tracker.position(), Some(seoul()));
        assert!(tracker.error().is_none());

        tracker.stop_watching(&handle);
    }

    #[test]
    fn test_stop_before_first_callback_means_no_mutation() {
        let (source, tracker) = tracker_with_source();
        let updates = tracker.subscribe();
        let before = tracker.snapshot();

        let handle = tracker.start_watching(PositionOptions::default());
        let id = source.watch_ids()[0];
        tracker.stop_watching(&handle);

        assert!(source.is_cancelled(id));
        // the double still holds the callback and delivers it late
        assert!(source.emit_late(id, Ok(seoul())));
        assert!(source.emit_late(id, Err(SensorError::timeout("late"))));

        assert_eq!(tracker.snapshot(), before);
        assert!(!updates.has_changed().unwrap());
    }

    #[test]
    fn test_double_release_is_noop_and_isolated() {
        let (source, tracker) = tracker_with_source();
        let first = tracker.start_watching(PositionOptions::default());
        let second = tracker.start_watching(PositionOptions::default());
        let ids = source.active_watch_ids();
        assert_eq!(ids.len(), 2);

        tracker.stop_watching(&first);
        tracker.stop_watching(&first);
        assert_eq!(tracker.active_watches(), 1);
        assert!(tracker.is_watching(&second));
        assert_eq!(source.cancel_count(), 1);

        source.emit(ids[1], Ok(busan()));
        assert_eq!(tracker.position(), Some(busan()));

        tracker.stop_watching(&second);
        assert_eq!(tracker.active_watches(), 0);
    }

    #[test]
    fn test_handle_from_other_tracker_is_ignored() {
        let (source_a, tracker_a) = tracker_with_source();
        let (source_b, tracker_b) = tracker_with_source();
        let handle_a = tracker_a.start_watching(PositionOptions::default());
        let handle_b = tracker_b.start_watching(PositionOptions::default());
        assert_ne!(handle_a, handle_b);

        assert!(!tracker_b.is_watching(&handle_a));
        tracker_b.stop_watching(&handle_a);

        assert!(tracker_b.is_watching(&handle_b));
        assert_eq!(tracker_b.active_watches(), 1);
        assert_eq!(source_b.cancel_count(), 0);
        source_b.emit(source_b.active_watch_ids()[0], Ok(seoul()));
        assert_eq!(tracker_b.position(), Some(seoul()));

        assert!(tracker_a.is_watching(&handle_a));
        assert_eq!(source_a.cancel_count(), 0);

        tracker_a.stop_watching(&handle_a);
        tracker_b.stop_watching(&handle_b);
    }

    #[test]
    fn test_dispose_during_registration_cancels_source_watch() {
        let source = Arc::new(DisposingSource {
            inner: ManualPositionSource::new(),
            tracker: Mutex::new(Weak::new()),
        });
        let tracker = Arc::new(PositionTracker::new(source.clone()));
        *source.tracker.lock() = Arc::downgrade(&tracker);

        let handle = tracker.start_watching(PositionOptions::default());

        assert!(tracker.is_disposed());
        assert!(!tracker.is_watching(&handle));
        assert_eq!(source.inner.watch_ids().len(), 1);
        assert!(source.inner.active_watch_ids().is_empty());
        assert_eq!(source.inner.cancel_count(), 1);
    }

    #[tokio::test]
    async fn test_request_after_dispose_skips_source() {
        let (source, tracker) = tracker_with_source();
        source.push_response(Ok(seoul()));
        tracker.dispose();

        let err = tracker
            .request_once(PositionOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), TrackingErrorKind::PositionUnavailable);
        assert_eq!(source.request_count(), 0);
        assert!(tracker.position().is_none());
        assert!(!tracker.is_loading());
    }

    #[test]
    fn test_unsupported_watch_returns_inert_handle() {
        let source = Arc::new(ManualPositionSource::unavailable());
        let tracker = PositionTracker::new(source.clone());

        let handle = tracker.start_watching(PositionOptions::default());

        assert!(!tracker.is_watching(&handle));
        assert!(source.watch_ids().is_empty());
        assert_eq!(
            tracker.error().unwrap().kind(),
            TrackingErrorKind::Unsupported
        );
        tracker.stop_watching(&handle);
    }

    #[test]
    fn test_clear_error() {
        let (source, tracker) = tracker_with_source();
        let handle = tracker.start_watching(PositionOptions::default());
        let id = source.active_watch_ids()[0];

        source.emit(id, Err(SensorError::permission_denied("no")));
        assert!(tracker.clear_error());
        assert!(tracker.error().is_none());
        assert!(!tracker.clear_error());

        tracker.stop_watching(&handle);
    }

    #[test]
    fn test_start_watching_clears_stale_error() {
        let (source, tracker) = tracker_with_source();
        let first = tracker.start_watching(PositionOptions::default());
        source.emit(source.active_watch_ids()[0], Err(SensorError::timeout("t")));
        assert!(tracker.error().is_some());

        let second = tracker.start_watching(PositionOptions::default());
        assert!(tracker.error().is_none());

        tracker.stop_watching(&first);
        tracker.stop_watching(&second);
    }

    #[test]
    fn test_drop_releases_source_watches() {
        let source = Arc::new(ManualPositionSource::new());
        {
            let tracker = PositionTracker::new(source.clone());
            let _first = tracker.start_watching(PositionOptions::default());
            let _second = tracker.start_watching(PositionOptions::default());
            assert_eq!(source.active_watch_ids().len(), 2);
        }
        assert!(source.active_watch_ids().is_empty());

        // late readings after drop go nowhere
        for id in source.watch_ids() {
            assert!(source.emit_late(id, Ok(seoul())));
        }
    }

    #[test]
    fn test_subscribe_sees_watch_updates() {
        let (source, tracker) = tracker_with_source();
        let mut updates = tracker.subscribe();
        let handle = tracker.start_watching(PositionOptions::default());

        source.emit(source.active_watch_ids()[0], Ok(seoul()));

        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().position(), Some(&seoul()));

        tracker.stop_watching(&handle);
    }
}
