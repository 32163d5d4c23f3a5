//! Partial policies layered over a base policy for a single call.

use crate::backoff::{Backoff, BackoffIntervals};

use super::classify::RetriableSet;
use super::error::PolicyError;
use super::hooks::{RetryAttempt, RetryCondition, RetryHook};
use super::policy::{check_retries, check_time_to_sleep, RetryPolicy};

/// Keys accepted by [`PolicyOverrides::set`].
pub const OVERRIDE_KEYS: [&str; 7] = [
    "retries",
    "retriable",
    "retry_proc",
    "retry_condition_proc",
    "time_to_sleep",
    "backoff_intervals",
    "backoff_setup",
];

fn hook_from_text(field: &'static str) -> PolicyError {
    PolicyError::invalid(field, "hooks can only be set in code, not from text")
}

/// How an override layer changes the backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffOverride {
    Intervals(BackoffIntervals),
    /// Drop the schedule so `time_to_sleep` applies.
    Disabled,
}

/// A partial policy: only the fields that are `Some` replace the base.
///
/// Doubles as the builder for [`RetryPolicy`]:
///
/// ```
/// use take2_core::retry::{FailureKind, PolicyOverrides};
///
/// let policy = PolicyOverrides::new()
///     .retries(1)
///     .retriable(FailureKind::ConnectionReset)
///     .time_to_sleep(0.0)
///     .build()
///     .unwrap();
/// assert_eq!(policy.max_attempts(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PolicyOverrides {
    pub(crate) retries: Option<u32>,
    pub(crate) retriable: Option<RetriableSet>,
    pub(crate) retry_proc: Option<RetryHook>,
    pub(crate) retry_condition_proc: Option<RetryCondition>,
    pub(crate) time_to_sleep: Option<f64>,
    pub(crate) backoff: Option<BackoffOverride>,
}

impl PolicyOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Accepts a single [`FailureKind`](super::FailureKind) or a whole set.
    pub fn retriable(mut self, retriable: impl Into<RetriableSet>) -> Self {
        self.retriable = Some(retriable.into());
        self
    }

    pub fn retry_proc<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetryAttempt<'_>) + Send + Sync + 'static,
    {
        self.retry_proc = Some(RetryHook::new(f));
        self
    }

    pub fn retry_hook(mut self, hook: RetryHook) -> Self {
        self.retry_proc = Some(hook);
        self
    }

    pub fn retry_condition_proc<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetryAttempt<'_>) -> bool + Send + Sync + 'static,
    {
        self.retry_condition_proc = Some(RetryCondition::new(f));
        self
    }

    pub fn retry_condition(mut self, condition: RetryCondition) -> Self {
        self.retry_condition_proc = Some(condition);
        self
    }

    pub fn time_to_sleep(mut self, secs: f64) -> Self {
        self.time_to_sleep = Some(secs);
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(BackoffOverride::Intervals(backoff.intervals()));
        self
    }

    pub fn backoff_intervals(mut self, intervals: BackoffIntervals) -> Self {
        self.backoff = Some(BackoffOverride::Intervals(intervals));
        self
    }

    pub fn without_backoff(mut self) -> Self {
        self.backoff = Some(BackoffOverride::Disabled);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.retries.is_none()
            && self.retriable.is_none()
            && self.retry_proc.is_none()
            && self.retry_condition_proc.is_none()
            && self.time_to_sleep.is_none()
            && self.backoff.is_none()
    }

    /// Set one field from its textual form.
    ///
    /// Unknown keys fail with [`PolicyError::InvalidOverrideKey`]. Hooks are
    /// recognised but have no textual form, so they fail with
    /// [`PolicyError::InvalidPolicy`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<&mut Self, PolicyError> {
        let value = value.trim();
        match key {
            "retries" => {
                let n: i64 = value.parse().map_err(|_| {
                    PolicyError::invalid("retries", format!("must be a positive integer, got `{value}`"))
                })?;
                if n <= 0 {
                    return Err(PolicyError::invalid(
                        "retries",
                        format!("must be a positive integer, got {n}"),
                    ));
                }
                let n = u32::try_from(n)
                    .map_err(|_| PolicyError::invalid("retries", format!("{n} is too large")))?;
                self.retries = Some(check_retries(n)?);
            }
            "retriable" => self.retriable = Some(value.parse()?),
            "time_to_sleep" => {
                let secs: f64 = value.parse().map_err(|_| {
                    PolicyError::invalid("time_to_sleep", format!("not a number: `{value}`"))
                })?;
                self.time_to_sleep = Some(check_time_to_sleep(secs)?);
            }
            "backoff_intervals" => {
                self.backoff = Some(match value {
                    "none" | "off" | "false" => BackoffOverride::Disabled,
                    list => BackoffOverride::Intervals(list.parse()?),
                });
            }
            "backoff_setup" => {
                let backoff: Backoff = value.parse().map_err(|e| match e {
                    PolicyError::InvalidBackoffStrategy(_) => {
                        PolicyError::invalid("backoff_setup", e.to_string())
                    }
                    other => other,
                })?;
                self.backoff = Some(BackoffOverride::Intervals(backoff.intervals()));
            }
            "retry_proc" => return Err(hook_from_text("retry_proc")),
            "retry_condition_proc" => return Err(hook_from_text("retry_condition_proc")),
            other => return Err(PolicyError::InvalidOverrideKey(other.to_string())),
        }
        Ok(self)
    }

    /// Build overrides from `(key, value)` pairs; the first bad pair fails the whole set.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut overrides = Self::new();
        for (key, value) in pairs {
            overrides.set(key.as_ref(), value.as_ref())?;
        }
        Ok(overrides)
    }

    /// Apply these fields over [`RetryPolicy::default`].
    pub fn build(&self) -> Result<RetryPolicy, PolicyError> {
        RetryPolicy::from_overrides(self)
    }
}
