//! Backoff schedules.
//!
//! A schedule is a fixed list of ten delays computed up front from a
//! strategy tag and a start value. The retry executor indexes it by retry
//! number, so the generator stays a pure function with no state.

mod intervals;
mod strategy;

pub use intervals::{
    generate, Backoff, BackoffIntervals, BackoffSetup, DEFAULT_BACKOFF_START, INTERVAL_COUNT,
};
pub use strategy::BackoffStrategy;
