//! Deterministic doubles for the host capabilities.
//!
//! Useful for unit tests of anything built on [`PositionTracker`](crate::position::PositionTracker)
//! or [`ValueStabilizer`](crate::stabilizer::ValueStabilizer) where real
//! sensors and wall-clock timers would make results flaky.

mod scheduler;
mod source;

pub use scheduler::ManualScheduler;
pub use source::ManualPositionSource;
