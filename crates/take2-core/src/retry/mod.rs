//! Retry policy and executor.
//!
//! This module encapsulates failure classification, the validated retry
//! policy (with per-call overrides layered over a call-site or global
//! default) and the blocking retry loop, so that callers only provide the
//! operation and, optionally, how its errors map onto failure kinds.

mod classify;
mod error;
pub mod global;
mod hooks;
mod overrides;
mod policy;
mod run;
mod sleep;

pub use classify::{classify_http_status, classify_io_error, Classify, FailureKind, RetriableSet};
pub use error::PolicyError;
pub use hooks::{RetryAttempt, RetryCondition, RetryHook};
pub use overrides::{BackoffOverride, PolicyOverrides, OVERRIDE_KEYS};
pub use policy::{GiveUp, RetryDecision, RetryPolicy, DEFAULT_RETRIES};
pub use run::{run_with_retry, Retrier};
pub use sleep::{FnSleeper, Sleeper, ThreadSleeper};
