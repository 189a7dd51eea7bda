//! Position error types.
//!
//! Hosts report sensor failures as a numeric code plus a message
//! ([`SensorError`]). The tracker normalizes those into [`TrackingError`], the
//! only error type presentation code ever sees.

use std::fmt;

use thiserror::Error;

/// Host error code: the user or platform refused location access.
pub const SENSOR_PERMISSION_DENIED: u16 = 1;

/// Host error code: no fix could be obtained.
pub const SENSOR_POSITION_UNAVAILABLE: u16 = 2;

/// Host error code: the sensor's own timeout elapsed.
pub const SENSOR_TIMEOUT: u16 = 3;

/// Raw failure reported by a [`PositionSource`](super::PositionSource).
///
/// Codes follow the host geolocation convention (1, 2, 3). Anything else is
/// treated as unknown by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorError {
    /// Host error code.
    pub code: u16,
    /// Host supplied description.
    pub message: String,
}

impl SensorError {
    /// Create a sensor error with an arbitrary code.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Permission was refused.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(SENSOR_PERMISSION_DENIED, message)
    }

    /// No fix available.
    pub fn position_unavailable(message: impl Into<String>) -> Self {
        Self::new(SENSOR_POSITION_UNAVAILABLE, message)
    }

    /// The sensor timed out.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SENSOR_TIMEOUT, message)
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sensor error {}: {}", self.code, self.message)
    }
}

/// Discriminant of [`TrackingError`], handy for matching and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingErrorKind {
    /// Location access was refused.
    PermissionDenied,
    /// The sensor could not produce a fix.
    PositionUnavailable,
    /// The sensor gave up waiting for a fix.
    Timeout,
    /// The host has no location capability at all.
    Unsupported,
    /// Any other sensor failure.
    Unknown,
}

impl TrackingErrorKind {
    /// Short identifier for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingErrorKind::PermissionDenied => "permission_denied",
            TrackingErrorKind::PositionUnavailable => "position_unavailable",
            TrackingErrorKind::Timeout => "timeout",
            TrackingErrorKind::Unsupported => "unsupported",
            TrackingErrorKind::Unknown => "unknown",
        }
    }

    /// Default user-facing message. Each kind reads differently so the store
    /// list can tell a refused permission apart from a slow sensor.
    pub fn user_message(&self) -> &'static str {
        match self {
            TrackingErrorKind::PermissionDenied => {
                "Location access was denied. Allow location access to see nearby stores."
            }
            TrackingErrorKind::PositionUnavailable => {
                "Your location could not be determined right now."
            }
            TrackingErrorKind::Timeout => "Finding your location took too long. Please try again.",
            TrackingErrorKind::Unsupported => "This device does not support location services.",
            TrackingErrorKind::Unknown => "An unexpected error occurred while locating you.",
        }
    }
}

impl fmt::Display for TrackingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized location failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackingError {
    /// Location access was refused.
    #[error("Location permission denied: {0}")]
    PermissionDenied(String),

    /// The sensor could not produce a fix.
    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),

    /// The sensor's timeout elapsed.
    #[error("Location request timed out: {0}")]
    Timeout(String),

    /// The host has no location capability.
    #[error("Location services unsupported: {0}")]
    Unsupported(String),

    /// Unrecognized sensor failure.
    #[error("Unknown location error: {0}")]
    Unknown(String),
}

impl TrackingError {
    /// Error used when the host lacks a location sensor.
    pub fn unsupported() -> Self {
        TrackingError::Unsupported("geolocation is not available on this host".to_string())
    }

    /// The variant of this error.
    pub fn kind(&self) -> TrackingErrorKind {
        match self {
            TrackingError::PermissionDenied(_) => TrackingErrorKind::PermissionDenied,
            TrackingError::PositionUnavailable(_) => TrackingErrorKind::PositionUnavailable,
            TrackingError::Timeout(_) => TrackingErrorKind::Timeout,
            TrackingError::Unsupported(_) => TrackingErrorKind::Unsupported,
            TrackingError::Unknown(_) => TrackingErrorKind::Unknown,
        }
    }

    /// The message carried by the error.
    pub fn message(&self) -> &str {
        match self {
            TrackingError::PermissionDenied(msg)
            | TrackingError::PositionUnavailable(msg)
            | TrackingError::Timeout(msg)
            | TrackingError::Unsupported(msg)
            | TrackingError::Unknown(msg) => msg,
        }
    }
}

impl From<SensorError> for TrackingError {
    fn from(err: SensorError) -> Self {
        match err.code {
            SENSOR_PERMISSION_DENIED => TrackingError::PermissionDenied(err.message),
            SENSOR_POSITION_UNAVAILABLE => TrackingError::PositionUnavailable(err.message),
            SENSOR_TIMEOUT => TrackingError::Timeout(err.message),
            _ => TrackingError::Unknown(err.message),
        }
    }
}
