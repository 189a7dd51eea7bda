//! Debounced values.
//!
//! [`ValueStabilizer`] holds back a changing value until it has been quiet
//! for a while, so expensive work such as store search only runs on settled
//! input. Timing comes from an injected [`Scheduler`].

mod scheduler;
mod value;

pub use scheduler::{Scheduler, TimerId, TimerTask, TokioScheduler};
pub use value::{ValueStabilizer, DEFAULT_QUIET_PERIOD};
