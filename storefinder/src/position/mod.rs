//! Location acquisition.
//!
//! [`PositionTracker`] wraps a host [`PositionSource`] and turns its
//! one-shot reads and continuous watches into a single observable state:
//! the latest [`Position`] or the latest [`TrackingError`], plus a loading
//! flag. Distance math ([`distance_meters`]) is independent of any tracker.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────────┐  request_once / watch   ┌──────────────────────┐
//!  │  PositionTracker │ ──────────────────────► │ PositionSource (dyn) │
//!  │                  │ ◄────────────────────── │  Feed / Unsupported  │
//!  │  Reading + flag  │   SensorReading         │  ManualPositionSource│
//!  └────────┬─────────┘                         └──────────────────────┘
//!           │ TrackerSnapshot (watch channel)
//!           ▼
//!   store list / search UI
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use storefinder::position::{Position, PositionOptions, PositionTracker};
//! use storefinder::testing::ManualPositionSource;
//!
//! let source = Arc::new(ManualPositionSource::new());
//! let tracker = PositionTracker::new(source.clone());
//!
//! let handle = tracker.start_watching(PositionOptions::default());
//! source.emit_all(Ok(Position::new(37.5665, 126.9780, 10.0, 0)));
//! assert!(tracker.position().is_some());
//!
//! tracker.stop_watching(&handle);
//! ```

mod distance;
mod error;
mod model;
mod options;
mod source;
mod tracker;

pub use distance::{distance_meters, EARTH_RADIUS_METERS};
pub use error::{
    SensorError, TrackingError, TrackingErrorKind, SENSOR_PERMISSION_DENIED,
    SENSOR_POSITION_UNAVAILABLE, SENSOR_TIMEOUT,
};
pub use model::{Position, Reading, TrackerSnapshot};
pub use options::{PositionOptions, DEFAULT_HIGH_ACCURACY, DEFAULT_MAXIMUM_AGE, DEFAULT_TIMEOUT};
pub use source::{
    BoxFuture, FeedPositionSource, PositionCallback, PositionSource, SensorReading,
    SourceWatchId, UnsupportedSource,
};
pub use tracker::{PositionTracker, WatchHandle};
