use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::backoff::Backoff;
use crate::retry::{FailureKind, PolicyError, PolicyOverrides, RetriableSet, RetryPolicy};

/// Default retry policy parameters (the `[policy]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Retries after the first attempt. Must be at least 1.
    pub retries: i64,
    /// Failure kinds that are retried (e.g. "io", "connection_reset", "exit:75").
    pub retriable: Vec<FailureKind>,
    /// Static delay in seconds, used when `backoff = false`.
    pub time_to_sleep: f64,
    /// Backoff strategy and start; `None` uses the built-in constant(3) schedule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_setup: Option<Backoff>,
    /// Set to false to ignore the backoff schedule and sleep `time_to_sleep`.
    pub backoff: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retriable: RetriableSet::default().iter().cloned().collect(),
            time_to_sleep: 0.0,
            backoff_setup: None,
            backoff: true,
        }
    }
}

impl PolicyConfig {
    /// Validate into a [`RetryPolicy`].
    pub fn to_policy(&self) -> Result<RetryPolicy, PolicyError> {
        if self.retries <= 0 {
            return Err(PolicyError::InvalidPolicy {
                field: "retries",
                reason: format!("must be a positive integer, got {}", self.retries),
            });
        }
        let retries = u32::try_from(self.retries).map_err(|_| PolicyError::InvalidPolicy {
            field: "retries",
            reason: format!("{} is too large", self.retries),
        })?;
        let overrides = PolicyOverrides::new()
            .retries(retries)
            .retriable(RetriableSet::new(self.retriable.iter().cloned())?)
            .time_to_sleep(self.time_to_sleep);
        let overrides = match (self.backoff, self.backoff_setup) {
            (false, _) => overrides.without_backoff(),
            (true, Some(setup)) => overrides.backoff(setup),
            (true, None) => overrides.backoff(Backoff::default()),
        };
        overrides.build()
    }
}

/// Global configuration loaded from `~/.config/take2/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Take2Config {
    /// Call-site policy used by `take2 run` before command-line overrides.
    #[serde(default)]
    pub policy: PolicyConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("take2")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Read configuration from `path`.
pub fn load_from_path(path: &Path) -> Result<Take2Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: Take2Config =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<Take2Config> {
    let path = config_path()?;
    load_or_init_at(&path)
}

pub fn load_or_init_at(path: &Path) -> Result<Take2Config> {
    if !path.exists() {
        let default_cfg = Take2Config::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffStrategy;

    #[test]
    fn default_config_matches_default_policy() {
        let cfg = Take2Config::default();
        let policy = cfg.policy.to_policy().unwrap();
        let default = RetryPolicy::default();
        assert_eq!(policy.retries(), default.retries());
        assert_eq!(policy.retriable(), default.retriable());
        assert_eq!(policy.time_to_sleep(), default.time_to_sleep());
        assert_eq!(policy.backoff_intervals(), default.backoff_intervals());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = Take2Config::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Take2Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            [policy]
            retries = 2
            retriable = ["retriable_remote", "exit:75"]
            time_to_sleep = 0.5
            backoff_setup = { type = "fibonacci", start = 3.0 }
        "#;
        let cfg: Take2Config = toml::from_str(toml).unwrap();
        let setup = cfg.policy.backoff_setup.unwrap();
        assert_eq!(setup.strategy(), BackoffStrategy::Fibonacci);

        let policy = cfg.policy.to_policy().unwrap();
        assert_eq!(policy.retries(), 2);
        assert!(policy.is_retriable(&FailureKind::custom("exit:75")));
        assert!(!policy.is_retriable(&FailureKind::Io));
        assert_eq!(policy.backoff_intervals().unwrap().as_slice()[2], 8.0);
    }

    #[test]
    fn missing_section_uses_defaults() {
        let cfg: Take2Config = toml::from_str("").unwrap();
        assert_eq!(cfg, Take2Config::default());
        let cfg: Take2Config = toml::from_str("[policy]\nretries = 5\n").unwrap();
        assert_eq!(cfg.policy.retries, 5);
        assert!(cfg.policy.backoff);
    }

    #[test]
    fn backoff_false_uses_static_sleep() {
        let toml = r#"
            [policy]
            time_to_sleep = 1.5
            backoff = false
        "#;
        let cfg: Take2Config = toml::from_str(toml).unwrap();
        let policy = cfg.policy.to_policy().unwrap();
        assert!(policy.backoff_intervals().is_none());
        assert_eq!(policy.delay_for(0), std::time::Duration::from_millis(1500));
    }

    #[test]
    fn invalid_values_are_policy_errors() {
        for (toml, field) in [
            ("[policy]\nretries = 0\n", "retries"),
            ("[policy]\nretries = -1\n", "retries"),
            ("[policy]\ntime_to_sleep = -1.0\n", "time_to_sleep"),
            ("[policy]\nretriable = []\n", "retriable"),
        ] {
            let cfg: Take2Config = toml::from_str(toml).unwrap();
            match cfg.policy.to_policy() {
                Err(PolicyError::InvalidPolicy { field: f, .. }) => assert_eq!(f, field, "{toml}"),
                other => panic!("expected InvalidPolicy for {toml}, got {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_backoff_type_fails_to_parse() {
        let toml = r#"
            [policy]
            backoff_setup = { type = "log", start = 1.0 }
        "#;
        assert!(toml::from_str::<Take2Config>(toml).is_err());
    }
}
