//! Retry loop: run a closure until success or the policy says stop.

use std::sync::Arc;

use super::classify::{Classify, FailureKind};
use super::error::PolicyError;
use super::global;
use super::hooks::RetryAttempt;
use super::overrides::PolicyOverrides;
use super::policy::{GiveUp, RetryDecision, RetryPolicy};
use super::sleep::{Sleeper, ThreadSleeper};

/// Runs `op` until it succeeds or `policy` says to stop.
///
/// On a retriable failure with retries left, runs the retry hook and the
/// retry condition, sleeps for the scheduled delay, then tries again. The
/// error returned is always the one the last attempt produced.
pub fn run_with_retry<T, E, F, C, S>(
    policy: &RetryPolicy,
    sleeper: &S,
    classify: C,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    C: Fn(&E) -> FailureKind,
    S: Sleeper + ?Sized,
{
    let mut attempt = 0u32;
    loop {
        match op() {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(attempts = attempt + 1, "operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) => {
                let kind = classify(&e);
                match policy.decide(attempt, &kind) {
                    RetryDecision::GiveUp(GiveUp::NonRetriable) => {
                        tracing::debug!(
                            attempt = attempt + 1,
                            failure = %kind,
                            "non-retriable failure, not retrying"
                        );
                        return Err(e);
                    }
                    RetryDecision::GiveUp(GiveUp::Exhausted) => {
                        tracing::error!(
                            attempts = attempt + 1,
                            max_retries = policy.retries(),
                            failure = %kind,
                            "operation failed after all retry attempts"
                        );
                        return Err(e);
                    }
                    RetryDecision::RetryAfter(delay) => {
                        let info = RetryAttempt {
                            attempt: attempt + 1,
                            max_retries: policy.retries(),
                            delay,
                            failure: &kind,
                        };
                        policy.retry_proc().call(&info);
                        let condition = policy.retry_condition_proc().call(&info);
                        tracing::debug!(attempt = info.attempt, condition, "retry condition evaluated");
                        tracing::warn!(
                            attempt = info.attempt,
                            max_retries = info.max_retries,
                            delay_secs = delay.as_secs_f64(),
                            failure = %kind,
                            "operation failed, retrying after delay"
                        );
                        sleeper.sleep(delay);
                        attempt += 1;
                    }
                }
            }
        }
    }
}

/// A retry policy bundled with the sleeper that waits between attempts.
///
/// Cheap to clone; the policy is shared behind an `Arc`. Per-call overrides
/// produce a new `Retrier` and never touch the original.
#[derive(Debug, Clone)]
pub struct Retrier<S = ThreadSleeper> {
    policy: Arc<RetryPolicy>,
    sleeper: S,
}

impl Retrier<ThreadSleeper> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::from_shared(Arc::new(policy))
    }

    pub fn from_shared(policy: Arc<RetryPolicy>) -> Self {
        Self {
            policy,
            sleeper: ThreadSleeper,
        }
    }

    /// Uses the process-wide default policy (see [`global`]).
    pub fn from_global() -> Self {
        Self::from_shared(global::default_policy())
    }
}

impl Default for Retrier<ThreadSleeper> {
    fn default() -> Self {
        Self::from_global()
    }
}

impl<S: Sleeper> Retrier<S> {
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> Retrier<T> {
        Retrier {
            policy: self.policy,
            sleeper,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Resolve per-call overrides on top of this retrier's policy.
    ///
    /// Fails before anything runs when an override is invalid.
    pub fn with_overrides(&self, overrides: &PolicyOverrides) -> Result<Retrier<S>, PolicyError>
    where
        S: Clone,
    {
        let policy = if overrides.is_empty() {
            Arc::clone(&self.policy)
        } else {
            Arc::new(self.policy.merge(overrides)?)
        };
        Ok(Retrier {
            policy,
            sleeper: self.sleeper.clone(),
        })
    }

    pub fn call<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: Classify,
    {
        run_with_retry(&self.policy, &self.sleeper, E::failure_kind, op)
    }

    /// Like [`Retrier::call`] for error types that do not implement [`Classify`].
    pub fn call_classified<T, E, F, C>(&self, classify: C, op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        C: Fn(&E) -> FailureKind,
    {
        run_with_retry(&self.policy, &self.sleeper, classify, op)
    }

    /// Resolve `overrides`, then run `op`.
    ///
    /// The outer `Result` carries configuration errors (nothing ran); the
    /// inner one is the operation's own outcome, untouched.
    pub fn call_with_retry<T, E, F>(
        &self,
        overrides: &PolicyOverrides,
        op: F,
    ) -> Result<Result<T, E>, PolicyError>
    where
        F: FnMut() -> Result<T, E>,
        E: Classify,
        S: Clone,
    {
        let resolved = self.with_overrides(overrides)?;
        Ok(resolved.call(op))
    }
}
