//! Backoff strategy tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::retry::PolicyError;

/// Named rule for turning a start value into a delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Every delay equals the start value.
    #[default]
    Constant,
    /// Grows by `start` each step: start, 2*start, 3*start, ...
    Linear,
    /// Seeded with `start` and `start + 2`, then each delay is the sum of the previous two.
    Fibonacci,
    /// Doubles each step: start, 2*start, 4*start, ...
    Exponential,
}

impl BackoffStrategy {
    pub const ALL: [BackoffStrategy; 4] = [
        BackoffStrategy::Constant,
        BackoffStrategy::Linear,
        BackoffStrategy::Fibonacci,
        BackoffStrategy::Exponential,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BackoffStrategy::Constant => "constant",
            BackoffStrategy::Linear => "linear",
            BackoffStrategy::Fibonacci => "fibonacci",
            BackoffStrategy::Exponential => "exponential",
        }
    }
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackoffStrategy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        BackoffStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == tag)
            .ok_or_else(|| PolicyError::InvalidBackoffStrategy(s.to_string()))
    }
}

impl TryFrom<String> for BackoffStrategy {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
