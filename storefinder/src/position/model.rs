//! Position snapshots and tracker state.

use serde::{Deserialize, Serialize};

use super::distance::distance_meters;
use super::error::TrackingError;

/// A single fix from the location sensor.
///
/// Snapshots are replaced wholesale on every successful read, never patched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Horizontal accuracy radius in meters.
    pub accuracy_meters: f64,
    /// When the fix was captured, milliseconds since the Unix epoch.
    pub captured_at_epoch_ms: i64,
}

impl Position {
    /// Create a position with an explicit capture time.
    pub fn new(
        latitude: f64,
        longitude: f64,
        accuracy_meters: f64,
        captured_at_epoch_ms: i64,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            captured_at_epoch_ms,
        }
    }

    /// Create a position captured now.
    pub fn now(latitude: f64, longitude: f64, accuracy_meters: f64) -> Self {
        Self::new(
            latitude,
            longitude,
            accuracy_meters,
            chrono::Utc::now().timestamp_millis(),
        )
    }

    /// Age of this fix relative to `now_epoch_ms`, clamped at zero.
    pub fn age_ms(&self, now_epoch_ms: i64) -> u64 {
        now_epoch_ms.saturating_sub(self.captured_at_epoch_ms).max(0) as u64
    }

    /// Great-circle distance to another fix, in whole meters.
    pub fn distance_to(&self, other: &Position) -> f64 {
        distance_meters(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// What the tracker currently knows.
///
/// A fix and an error are mutually exclusive: a successful read replaces any
/// error and a failure replaces any fix.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Reading {
    /// Nothing acquired yet (or the last error was cleared).
    #[default]
    Empty,
    /// Latest successful fix.
    Fixed(Position),
    /// Latest failure.
    Failed(TrackingError),
}

impl Reading {
    /// The fix, if any.
    pub fn position(&self) -> Option<&Position> {
        match self {
            Reading::Fixed(position) => Some(position),
            _ => None,
        }
    }

    /// The error, if any.
    pub fn error(&self) -> Option<&TrackingError> {
        match self {
            Reading::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Point-in-time copy of tracker state handed to presentation code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerSnapshot {
    /// Fix or error.
    pub reading: Reading,
    /// True while at least one one-shot request is outstanding.
    pub loading: bool,
}

impl TrackerSnapshot {
    /// The fix, if any.
    pub fn position(&self) -> Option<&Position> {
        self.reading.position()
    }

    /// The error, if any.
    pub fn error(&self) -> Option<&TrackingError> {
        self.reading.error()
    }
}
