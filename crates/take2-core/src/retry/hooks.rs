//! Callbacks run between attempts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::classify::FailureKind;

/// Describes the retry that is about to happen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryAttempt<'a> {
    /// 1-based retry number (the first retry is 1, i.e. the second attempt).
    pub attempt: u32,
    pub max_retries: u32,
    /// How long the executor will sleep before the next attempt.
    pub delay: Duration,
    /// Classification of the failure that triggered this retry.
    pub failure: &'a FailureKind,
}

type HookFn = dyn Fn(&RetryAttempt<'_>) + Send + Sync;
type ConditionFn = dyn Fn(&RetryAttempt<'_>) -> bool + Send + Sync;

/// Side-effect hook invoked once per retry. Never called on success or after
/// the final failed attempt.
///
/// A panicking hook unwinds straight through the executor and abandons the
/// retry loop.
#[derive(Clone)]
pub struct RetryHook(Arc<HookFn>);

impl RetryHook {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RetryAttempt<'_>) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn call(&self, attempt: &RetryAttempt<'_>) {
        (self.0)(attempt)
    }
}

impl Default for RetryHook {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for RetryHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryHook(..)")
    }
}

/// Hook invoked once per retry, right after [`RetryHook`].
///
/// Its return value is recorded in the retry log line but does not decide
/// whether the retry happens. The default returns `false`.
#[derive(Clone)]
pub struct RetryCondition(Arc<ConditionFn>);

impl RetryCondition {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RetryAttempt<'_>) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, attempt: &RetryAttempt<'_>) -> bool {
        (self.0)(attempt)
    }
}

impl Default for RetryCondition {
    fn default() -> Self {
        Self::new(|_| false)
    }
}

impl fmt::Debug for RetryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryCondition(..)")
    }
}
