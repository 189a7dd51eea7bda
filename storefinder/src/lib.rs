//! Storefinder - location and search plumbing for a store locator
//!
//! This library provides the non-visual core of a "find a nearby store"
//! screen: acquiring the customer's position, debouncing search input, and
//! ordering stores by great-circle distance.
//!
//! - [`position`] - position tracking over an injected location sensor
//! - [`stabilizer`] - quiet-period debouncing over an injected scheduler
//! - [`ranking`] - nearest-first store lists
//! - [`config`] / [`logging`] - INI configuration and `tracing` setup
//! - [`testing`] - deterministic sensor and scheduler doubles

pub mod config;
pub mod logging;
pub mod position;
pub mod ranking;
pub mod stabilizer;
pub mod testing;

pub use config::{ConfigError, StorefinderConfig};
pub use position::{Position, PositionOptions, PositionTracker, TrackingError};
pub use stabilizer::ValueStabilizer;
