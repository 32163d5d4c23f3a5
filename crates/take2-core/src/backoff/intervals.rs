//! Fixed-length delay schedules.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::strategy::BackoffStrategy;
use crate::retry::PolicyError;

/// Number of precomputed delays in every schedule.
pub const INTERVAL_COUNT: usize = 10;

/// Start value used by the default (constant) schedule, in seconds.
pub const DEFAULT_BACKOFF_START: f64 = 3.0;

/// Compute the schedule for `strategy` seeded at `start`.
///
/// Always returns [`INTERVAL_COUNT`] values; index 0 is the wait before the
/// first retry.
pub fn generate(strategy: BackoffStrategy, start: f64) -> [f64; INTERVAL_COUNT] {
    let mut out = [0.0; INTERVAL_COUNT];
    match strategy {
        BackoffStrategy::Constant => out.fill(start),
        BackoffStrategy::Linear => {
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = start * (i as f64 + 1.0);
            }
        }
        BackoffStrategy::Fibonacci => {
            out[0] = start;
            out[1] = start + 2.0;
            for i in 2..INTERVAL_COUNT {
                out[i] = out[i - 1] + out[i - 2];
            }
        }
        BackoffStrategy::Exponential => {
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = start * 2f64.powi(i as i32);
            }
        }
    }
    out
}

fn check_seconds(field: &'static str, value: f64) -> Result<f64, PolicyError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PolicyError::invalid(
            field,
            format!("must be a finite number of seconds >= 0, got {value}"),
        ));
    }
    Ok(value)
}

/// A validated `(strategy, start)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BackoffSetup", into = "BackoffSetup")]
pub struct Backoff {
    strategy: BackoffStrategy,
    start: f64,
}

/// Wire form of [`Backoff`] (`{ type = "fibonacci", start = 3 }`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackoffSetup {
    #[serde(rename = "type")]
    pub strategy: BackoffStrategy,
    pub start: f64,
}

impl Backoff {
    /// Fails when `start` or any generated delay is negative or not finite.
    pub fn new(strategy: BackoffStrategy, start: f64) -> Result<Self, PolicyError> {
        let start = check_seconds("backoff_setup", start)?;
        if let Some(bad) = generate(strategy, start).into_iter().find(|v| !v.is_finite()) {
            return Err(PolicyError::invalid(
                "backoff_setup",
                format!("{strategy} schedule from start {start} overflows to {bad}"),
            ));
        }
        Ok(Self { strategy, start })
    }

    pub fn strategy(&self) -> BackoffStrategy {
        self.strategy
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn intervals(&self) -> BackoffIntervals {
        BackoffIntervals(generate(self.strategy, self.start))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            strategy: BackoffStrategy::Constant,
            start: DEFAULT_BACKOFF_START,
        }
    }
}

impl TryFrom<BackoffSetup> for Backoff {
    type Error = PolicyError;

    fn try_from(setup: BackoffSetup) -> Result<Self, Self::Error> {
        Backoff::new(setup.strategy, setup.start)
    }
}

impl From<Backoff> for BackoffSetup {
    fn from(b: Backoff) -> Self {
        BackoffSetup {
            strategy: b.strategy,
            start: b.start,
        }
    }
}

/// Parses `TYPE:START` (e.g. `fibonacci:3`); a bare `TYPE` uses the default start.
impl FromStr for Backoff {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, start) = match s.split_once(':') {
            Some((tag, start)) => {
                let start = start.trim().parse::<f64>().map_err(|_| {
                    PolicyError::invalid("backoff_setup", format!("invalid start value `{start}`"))
                })?;
                (tag, start)
            }
            None => (s, DEFAULT_BACKOFF_START),
        };
        Backoff::new(tag.parse()?, start)
    }
}

/// Exactly [`INTERVAL_COUNT`] finite, non-negative delays in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffIntervals([f64; INTERVAL_COUNT]);

impl BackoffIntervals {
    pub fn new(values: [f64; INTERVAL_COUNT]) -> Result<Self, PolicyError> {
        for v in values {
            check_seconds("backoff_intervals", v)?;
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    /// Wait before retry number `attempt + 1`. Indexes past the end reuse the
    /// last entry.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let idx = (attempt as usize).min(INTERVAL_COUNT - 1);
        Duration::try_from_secs_f64(self.0[idx]).unwrap_or(Duration::MAX)
    }
}

impl Default for BackoffIntervals {
    fn default() -> Self {
        Backoff::default().intervals()
    }
}

impl From<Backoff> for BackoffIntervals {
    fn from(b: Backoff) -> Self {
        b.intervals()
    }
}

impl TryFrom<&[f64]> for BackoffIntervals {
    type Error = PolicyError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let values: [f64; INTERVAL_COUNT] = values.try_into().map_err(|_| {
            PolicyError::invalid(
                "backoff_intervals",
                format!("needs exactly {INTERVAL_COUNT} values, got {}", values.len()),
            )
        })?;
        BackoffIntervals::new(values)
    }
}

/// Parses a comma-separated list of ten delays.
impl FromStr for BackoffIntervals {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim().parse::<f64>().map_err(|_| {
                    PolicyError::invalid("backoff_intervals", format!("invalid delay `{}`", part.trim()))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        BackoffIntervals::try_from(values.as_slice())
    }
}

impl fmt::Display for BackoffIntervals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}
