//! Host location capability.
//!
//! The tracker never talks to hardware directly. Everything it needs from the
//! host is behind [`PositionSource`], which is injected at construction. This
//! keeps the tracker testable with a scripted double (see
//! [`crate::testing::ManualPositionSource`]) and lets the same tracker run on
//! top of any host feed.
//!
//! # Implementors
//!
//! - [`FeedPositionSource`] - fed by an external reading stream (GPS daemon,
//!   platform bridge, replayed track)
//! - [`UnsupportedSource`] - a host without any location capability
//! - [`crate::testing::ManualPositionSource`] - testing double

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use super::error::SensorError;
use super::model::Position;
use super::options::PositionOptions;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a single sensor read.
pub type SensorReading = Result<Position, SensorError>;

/// Callback invoked by a source for every reading of a continuous watch.
pub type PositionCallback = Box<dyn FnMut(SensorReading) + Send + 'static>;

/// Source-side identifier of a continuous watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceWatchId(pub u64);

/// Location capability provided by the host.
///
/// # Dyn Compatibility
///
/// `request_once` returns a [`BoxFuture`] so the trait can be used as
/// `Arc<dyn PositionSource>`.
pub trait PositionSource: Send + Sync {
    /// Whether the host has a location sensor at all.
    ///
    /// Checked before every acquisition. When this returns `false` the tracker
    /// fails with `Unsupported` and never calls the other methods.
    fn is_available(&self) -> bool;

    /// Read a single fix.
    ///
    /// The source owns timeout handling: it must fail with code 3 once
    /// `options.timeout` elapses.
    fn request_once(&self, options: &PositionOptions) -> BoxFuture<'_, SensorReading>;

    /// Start a continuous watch.
    ///
    /// `callback` is invoked for every subsequent reading, in emission order,
    /// until [`cancel_watch`](Self::cancel_watch) is called. Implementations
    /// must not invoke the callback from inside this call.
    fn watch(&self, options: &PositionOptions, callback: PositionCallback) -> SourceWatchId;

    /// Stop a continuous watch. Unknown ids are ignored.
    fn cancel_watch(&self, id: SourceWatchId);
}

/// Source for hosts without location capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSource;

impl PositionSource for UnsupportedSource {
    fn is_available(&self) -> bool {
        false
    }

    fn request_once(&self, _options: &PositionOptions) -> BoxFuture<'_, SensorReading> {
        Box::pin(async {
            Err(SensorError::position_unavailable(
                "no location sensor on this host",
            ))
        })
    }

    fn watch(&self, _options: &PositionOptions, _callback: PositionCallback) -> SourceWatchId {
        SourceWatchId(0)
    }

    fn cancel_watch(&self, _id: SourceWatchId) {}
}

/// Default capacity of the one-shot reading broadcast.
const FEED_CHANNEL_CAPACITY: usize = 16;

/// Location source driven by an external stream of readings.
///
/// The owner pushes readings with [`publish`](Self::publish). Continuous
/// watches receive every reading; one-shot requests return the last fix when
/// it is younger than `maximum_age`, otherwise wait for the next reading for
/// at most `timeout`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use storefinder::position::{FeedPositionSource, Position, PositionTracker};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let feed = Arc::new(FeedPositionSource::new());
/// feed.publish(Ok(Position::now(37.5665, 126.9780, 15.0)));
///
/// let tracker = PositionTracker::new(feed.clone());
/// let position = tracker.request_once(Default::default()).await.unwrap();
/// assert_eq!(position.latitude, 37.5665);
/// # }
/// ```
pub struct FeedPositionSource {
    last_fix: Mutex<Option<Position>>,
    watchers: DashMap<SourceWatchId, Arc<Mutex<PositionCallback>>>,
    readings: broadcast::Sender<SensorReading>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for FeedPositionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedPositionSource")
            .field("last_fix", &*self.last_fix.lock())
            .field("watchers", &self.watchers.len())
            .finish_non_exhaustive()
    }
}

impl Default for FeedPositionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedPositionSource {
    /// Create an empty feed.
    pub fn new() -> Self {
        let (readings, _) = broadcast::channel(FEED_CHANNEL_CAPACITY);
        Self {
            last_fix: Mutex::new(None),
            watchers: DashMap::new(),
            readings,
            next_id: AtomicU64::new(1),
        }
    }

    /// Push a reading to all watchers and pending one-shot requests.
    pub fn publish(&self, reading: SensorReading) {
        if let Ok(position) = &reading {
            *self.last_fix.lock() = Some(*position);
        }

        // No receivers just means no one-shot request is pending.
        let _ = self.readings.send(reading.clone());

        let mut callbacks: Vec<_> = self
            .watchers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        callbacks.sort_by_key(|(id, _)| *id);

        trace!(watchers = callbacks.len(), ok = reading.is_ok(), "Publishing reading");
        for (_, callback) in callbacks {
            let mut callback = callback.lock();
            (*callback)(reading.clone());
        }
    }

    /// Last successful fix, regardless of age.
    pub fn last_fix(&self) -> Option<Position> {
        *self.last_fix.lock()
    }

    /// Number of active watches.
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// A zero `maximum_age` never serves the cache.
    fn cached_fix(&self, maximum_age: std::time::Duration) -> Option<Position> {
        if maximum_age.is_zero() {
            return None;
        }
        let fix = (*self.last_fix.lock())?;
        let now = chrono::Utc::now().timestamp_millis();
        (u128::from(fix.age_ms(now)) < maximum_age.as_millis()).then_some(fix)
    }
}

async fn next_reading(rx: &mut broadcast::Receiver<SensorReading>) -> SensorReading {
    loop {
        match rx.recv().await {
            Ok(reading) => return reading,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "One-shot request lagged behind the feed");
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err(SensorError::position_unavailable("position feed closed"));
            }
        }
    }
}

impl PositionSource for FeedPositionSource {
    fn is_available(&self) -> bool {
        true
    }

    fn request_once(&self, options: &PositionOptions) -> BoxFuture<'_, SensorReading> {
        let cached = self.cached_fix(options.maximum_age);
        // Subscribe before returning so a reading published right after the
        // call is not missed.
        let mut rx = self.readings.subscribe();
        let timeout = options.timeout;

        Box::pin(async move {
            if let Some(position) = cached {
                return Ok(position);
            }
            match tokio::time::timeout(timeout, next_reading(&mut rx)).await {
                Ok(reading) => reading,
                Err(_) => Err(SensorError::timeout(format!(
                    "no position within {}ms",
                    timeout.as_millis()
                ))),
            }
        })
    }

    fn watch(&self, _options: &PositionOptions, callback: PositionCallback) -> SourceWatchId {
        let id = SourceWatchId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.watchers.insert(id, Arc::new(Mutex::new(callback)));
        id
    }

    fn cancel_watch(&self, id: SourceWatchId) {
        self.watchers.remove(&id);
    }
}
