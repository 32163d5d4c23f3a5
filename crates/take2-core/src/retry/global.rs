//! Process-wide default retry policy.
//!
//! The default is fixed the first time it is read. An embedding application
//! that wants different defaults calls [`configure`] once at startup, before
//! any retry runs; later attempts to change it fail instead of mutating a
//! policy other callers may be holding.

use std::sync::{Arc, OnceLock};

use super::error::PolicyError;
use super::policy::RetryPolicy;

static DEFAULT_POLICY: OnceLock<Arc<RetryPolicy>> = OnceLock::new();

/// The process-wide default, initialised to [`RetryPolicy::default`] on first use.
pub fn default_policy() -> Arc<RetryPolicy> {
    Arc::clone(DEFAULT_POLICY.get_or_init(|| Arc::new(RetryPolicy::default())))
}

/// Install `policy` as the process-wide default.
pub fn configure(policy: RetryPolicy) -> Result<(), PolicyError> {
    DEFAULT_POLICY
        .set(Arc::new(policy))
        .map_err(|_| PolicyError::GlobalAlreadyConfigured)?;
    tracing::debug!("global retry policy configured");
    Ok(())
}

/// Whether the default has been read or configured yet.
pub fn is_initialized() -> bool {
    DEFAULT_POLICY.get().is_some()
}
