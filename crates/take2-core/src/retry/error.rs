//! Configuration errors raised while building or resolving a retry policy.
//!
//! These never come out of the retry loop itself: the wrapped operation's own
//! error is handed back untouched.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A policy field violates its invariant (e.g. `retries = 0`).
    #[error("invalid retry policy: `{field}` {reason}")]
    InvalidPolicy { field: &'static str, reason: String },

    /// A per-invocation override named a key the policy does not have.
    #[error("unrecognized override key `{0}`")]
    InvalidOverrideKey(String),

    /// Unknown backoff strategy tag.
    #[error("unknown backoff strategy `{0}` (expected constant, linear, fibonacci or exponential)")]
    InvalidBackoffStrategy(String),

    /// The process-wide default was already read or set.
    #[error("global retry policy is already configured")]
    GlobalAlreadyConfigured,
}

impl PolicyError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        PolicyError::InvalidPolicy {
            field,
            reason: reason.into(),
        }
    }
}
