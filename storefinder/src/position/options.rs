//! Options passed to the location sensor for each acquisition.

use std::time::Duration;

/// Default for [`PositionOptions::high_accuracy`].
pub const DEFAULT_HIGH_ACCURACY: bool = true;

/// Default sensor timeout (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default maximum age of a cached fix the sensor may return (5 minutes).
pub const DEFAULT_MAXIMUM_AGE: Duration = Duration::from_millis(300_000);

/// Per-request sensor options.
///
/// The tracker never enforces `timeout` itself; it is handed to the
/// [`PositionSource`](super::PositionSource), which owns timeout behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Prefer a precise fix over a fast one.
    pub high_accuracy: bool,
    /// How long the sensor may take before failing with a timeout.
    pub timeout: Duration,
    /// Oldest cached fix the sensor may return instead of a fresh one.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: DEFAULT_HIGH_ACCURACY,
            timeout: DEFAULT_TIMEOUT,
            maximum_age: DEFAULT_MAXIMUM_AGE,
        }
    }
}

impl PositionOptions {
    /// Set accuracy preference.
    pub fn with_high_accuracy(mut self, high_accuracy: bool) -> Self {
        self.high_accuracy = high_accuracy;
        self
    }

    /// Set the sensor timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum cached fix age.
    pub fn with_maximum_age(mut self, maximum_age: Duration) -> Self {
        self.maximum_age = maximum_age;
        self
    }
}
