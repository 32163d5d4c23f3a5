use std::fmt;
use std::time::Duration;

use crate::backoff::BackoffIntervals;

use super::classify::{FailureKind, RetriableSet};
use super::error::PolicyError;
use super::hooks::{RetryCondition, RetryHook};
use super::overrides::{BackoffOverride, PolicyOverrides};

/// Retries allowed by the default policy (4 attempts in total).
pub const DEFAULT_RETRIES: u32 = 3;

/// Why the executor stopped without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUp {
    /// The failure kind is not in the retriable set.
    NonRetriable,
    /// Every allowed retry has been used.
    Exhausted,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop and hand the failure back to the caller.
    GiveUp(GiveUp),
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// A validated, immutable retry policy.
///
/// Fields are private so the invariants hold for every value: `retries >= 1`,
/// a non-empty retriable set, a finite non-negative `time_to_sleep`, and an
/// optional ten-entry backoff schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    retries: u32,
    retriable: RetriableSet,
    retry_proc: RetryHook,
    retry_condition_proc: RetryCondition,
    time_to_sleep: f64,
    backoff_intervals: Option<BackoffIntervals>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            retriable: RetriableSet::default(),
            retry_proc: RetryHook::noop(),
            retry_condition_proc: RetryCondition::default(),
            time_to_sleep: 0.0,
            backoff_intervals: Some(BackoffIntervals::default()),
        }
    }
}

pub(crate) fn check_retries(retries: u32) -> Result<u32, PolicyError> {
    if retries == 0 {
        return Err(PolicyError::invalid(
            "retries",
            "must be a positive integer, got 0",
        ));
    }
    Ok(retries)
}

pub(crate) fn check_time_to_sleep(secs: f64) -> Result<f64, PolicyError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(PolicyError::invalid(
            "time_to_sleep",
            format!("must be a finite number of seconds >= 0, got {secs}"),
        ));
    }
    Ok(secs)
}

impl RetryPolicy {
    /// Build a policy from the given fields on top of [`RetryPolicy::default`].
    pub fn from_overrides(overrides: &PolicyOverrides) -> Result<Self, PolicyError> {
        RetryPolicy::default().merge(overrides)
    }

    /// Shallow-overwrite every field present in `overrides` and validate.
    ///
    /// `self` is left untouched. `time_to_sleep` only applies when the merged
    /// policy has no backoff schedule; use [`PolicyOverrides::without_backoff`]
    /// to drop an inherited one.
    pub fn merge(&self, overrides: &PolicyOverrides) -> Result<Self, PolicyError> {
        let mut merged = self.clone();
        if let Some(retries) = overrides.retries {
            merged.retries = check_retries(retries)?;
        }
        if let Some(retriable) = &overrides.retriable {
            merged.retriable = retriable.clone();
        }
        if let Some(hook) = &overrides.retry_proc {
            merged.retry_proc = hook.clone();
        }
        if let Some(condition) = &overrides.retry_condition_proc {
            merged.retry_condition_proc = condition.clone();
        }
        if let Some(secs) = overrides.time_to_sleep {
            merged.time_to_sleep = check_time_to_sleep(secs)?;
        }
        match overrides.backoff {
            Some(BackoffOverride::Intervals(intervals)) => {
                merged.backoff_intervals = Some(intervals)
            }
            Some(BackoffOverride::Disabled) => merged.backoff_intervals = None,
            None => {}
        }
        Ok(merged)
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Total attempts allowed: `retries + 1`.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    pub fn retriable(&self) -> &RetriableSet {
        &self.retriable
    }

    pub fn retry_proc(&self) -> &RetryHook {
        &self.retry_proc
    }

    pub fn retry_condition_proc(&self) -> &RetryCondition {
        &self.retry_condition_proc
    }

    pub fn time_to_sleep(&self) -> f64 {
        self.time_to_sleep
    }

    pub fn backoff_intervals(&self) -> Option<&BackoffIntervals> {
        self.backoff_intervals.as_ref()
    }

    pub fn is_retriable(&self, kind: &FailureKind) -> bool {
        self.retriable.contains(kind)
    }

    /// Wait before retry `attempt + 1` (`attempt` counts failures so far,
    /// starting at 0).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match &self.backoff_intervals {
            Some(intervals) => intervals.delay_for(attempt),
            None => Duration::try_from_secs_f64(self.time_to_sleep).unwrap_or(Duration::MAX),
        }
    }

    /// Decide what to do after failed attempt `attempt` (0-based).
    pub fn decide(&self, attempt: u32, kind: &FailureKind) -> RetryDecision {
        if !self.is_retriable(kind) {
            return RetryDecision::GiveUp(GiveUp::NonRetriable);
        }
        if attempt >= self.retries {
            return RetryDecision::GiveUp(GiveUp::Exhausted);
        }
        RetryDecision::RetryAfter(self.delay_for(attempt))
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "retries           = {}", self.retries)?;
        writeln!(f, "retriable         = [{}]", self.retriable)?;
        writeln!(f, "time_to_sleep     = {}", self.time_to_sleep)?;
        match &self.backoff_intervals {
            Some(intervals) => write!(f, "backoff_intervals = [{intervals}]"),
            None => write!(f, "backoff_intervals = none"),
        }
    }
}
