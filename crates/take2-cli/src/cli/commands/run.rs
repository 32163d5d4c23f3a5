//! `take2 run` – run a program under the retry executor.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::io;
use std::process::{Command, ExitStatus};
use take2_core::backoff::Backoff;
use take2_core::config::Take2Config;
use take2_core::retry::{
    classify_io_error, Classify, FailureKind, PolicyOverrides, RetriableSet, Retrier,
};

/// Per-invocation flags of `take2 run`.
#[derive(Debug, Clone, Default)]
pub struct RunFlags {
    pub retries: Option<u32>,
    pub sleep: Option<f64>,
    pub backoff: Option<Backoff>,
    pub no_backoff: bool,
    pub retriable: Vec<FailureKind>,
    pub set: Vec<String>,
}

impl RunFlags {
    /// `--set KEY=VALUE` pairs first, then the typed flags on top.
    ///
    /// `--sleep` without `--backoff` drops the configured schedule so the
    /// static delay is the one used.
    pub fn to_overrides(&self) -> Result<PolicyOverrides> {
        let mut overrides = PolicyOverrides::new();
        for pair in &self.set {
            let Some((key, value)) = pair.split_once('=') else {
                bail!("--set expects KEY=VALUE, got `{pair}`");
            };
            overrides.set(key.trim(), value)?;
        }
        if let Some(n) = self.retries {
            overrides = overrides.retries(n);
        }
        if !self.retriable.is_empty() {
            overrides = overrides.retriable(RetriableSet::new(self.retriable.iter().cloned())?);
        }
        if let Some(secs) = self.sleep {
            overrides = overrides.time_to_sleep(secs);
        }
        if let Some(backoff) = self.backoff {
            overrides = overrides.backoff(backoff);
        }
        if self.no_backoff || (self.sleep.is_some() && self.backoff.is_none()) {
            overrides = overrides.without_backoff();
        }
        Ok(overrides)
    }
}

/// Why one attempt at running the child failed.
#[derive(Debug)]
pub enum CommandFailure {
    Spawn(io::Error),
    Exit(i32),
    Signal(i32),
}

impl CommandFailure {
    fn from_status(status: ExitStatus) -> Option<Self> {
        if status.success() {
            return None;
        }
        if let Some(code) = status.code() {
            return Some(CommandFailure::Exit(code));
        }
        Some(CommandFailure::Signal(signal_of(status)))
    }

    /// Exit code take2 reports for this failure, shell style.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandFailure::Spawn(e) if e.kind() == io::ErrorKind::NotFound => 127,
            CommandFailure::Spawn(_) => 126,
            CommandFailure::Exit(code) => *code,
            CommandFailure::Signal(sig) => 128 + sig,
        }
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().unwrap_or(0)
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> i32 {
    0
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandFailure::Spawn(e) => write!(f, "failed to start: {e}"),
            CommandFailure::Exit(code) => write!(f, "exited with status {code}"),
            CommandFailure::Signal(sig) => write!(f, "killed by signal {sig}"),
        }
    }
}

impl Classify for CommandFailure {
    fn failure_kind(&self) -> FailureKind {
        match self {
            CommandFailure::Spawn(e) => classify_io_error(e),
            CommandFailure::Exit(code) => FailureKind::custom(format!("exit:{code}")),
            CommandFailure::Signal(_) => FailureKind::custom("signal"),
        }
    }
}

fn run_once(program: &str, args: &[String]) -> Result<(), CommandFailure> {
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(CommandFailure::Spawn)?;
    match CommandFailure::from_status(status) {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}

/// Run `command` with the config policy plus `flags`; returns the exit code to use.
pub fn run_command(cfg: &Take2Config, flags: &RunFlags, command: &[String]) -> Result<i32> {
    let Some((program, args)) = command.split_first() else {
        bail!("no program given");
    };
    let policy = cfg
        .policy
        .to_policy()
        .context("invalid [policy] section in config")?;
    let overrides = flags.to_overrides()?;
    let retrier = Retrier::new(policy).with_overrides(&overrides)?;
    tracing::debug!(program = %program, "running under policy:\n{}", retrier.policy());

    match retrier.call(|| run_once(program, args)) {
        Ok(()) => Ok(0),
        Err(failure) => {
            eprintln!("take2: `{program}` {failure}");
            Ok(failure.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use take2_core::backoff::BackoffStrategy;

    #[test]
    fn exit_codes_classify_as_custom_kinds() {
        assert_eq!(
            CommandFailure::Exit(75).failure_kind(),
            FailureKind::custom("exit:75")
        );
        assert_eq!(
            CommandFailure::Signal(9).failure_kind(),
            FailureKind::custom("signal")
        );
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(
            CommandFailure::Spawn(reset).failure_kind(),
            FailureKind::ConnectionReset
        );
    }

    #[test]
    fn exit_code_mirrors_child() {
        assert_eq!(CommandFailure::Exit(3).exit_code(), 3);
        assert_eq!(CommandFailure::Signal(15).exit_code(), 143);
        let missing = io::Error::new(io::ErrorKind::NotFound, "nope");
        assert_eq!(CommandFailure::Spawn(missing).exit_code(), 127);
    }

    #[test]
    fn flags_become_overrides() {
        let flags = RunFlags {
            retries: Some(5),
            retriable: vec![FailureKind::custom("exit:1")],
            backoff: Some(Backoff::new(BackoffStrategy::Linear, 2.0).unwrap()),
            ..RunFlags::default()
        };
        let policy = flags.to_overrides().unwrap().build().unwrap();
        assert_eq!(policy.retries(), 5);
        assert!(policy.is_retriable(&FailureKind::custom("exit:1")));
        assert!(!policy.is_retriable(&FailureKind::Io));
        assert_eq!(policy.backoff_intervals().unwrap().as_slice()[1], 4.0);
    }

    #[test]
    fn typed_flags_win_over_set_pairs() {
        let flags = RunFlags {
            retries: Some(2),
            set: vec!["retries=7".into(), "time_to_sleep=0.5".into()],
            ..RunFlags::default()
        };
        let policy = flags.to_overrides().unwrap().build().unwrap();
        assert_eq!(policy.retries(), 2);
        assert_eq!(policy.time_to_sleep(), 0.5);
        assert!(policy.backoff_intervals().is_some());
    }

    #[test]
    fn sleep_flag_replaces_schedule_unless_backoff_given() {
        let flags = RunFlags {
            sleep: Some(1.5),
            ..RunFlags::default()
        };
        let policy = flags.to_overrides().unwrap().build().unwrap();
        assert!(policy.backoff_intervals().is_none());
        assert_eq!(policy.delay_for(0), std::time::Duration::from_millis(1500));

        let flags = RunFlags {
            sleep: Some(1.5),
            backoff: Some(Backoff::new(BackoffStrategy::Constant, 2.0).unwrap()),
            ..RunFlags::default()
        };
        let policy = flags.to_overrides().unwrap().build().unwrap();
        assert_eq!(policy.delay_for(0), std::time::Duration::from_secs(2));
    }

    #[test]
    fn malformed_set_pair_is_rejected() {
        let flags = RunFlags {
            set: vec!["retries".into()],
            ..RunFlags::default()
        };
        assert!(flags.to_overrides().is_err());

        let flags = RunFlags {
            set: vec!["attempts=3".into()],
            ..RunFlags::default()
        };
        let err = flags.to_overrides().unwrap_err();
        assert!(err.to_string().contains("attempts"));
    }

    #[test]
    fn no_backoff_uses_static_sleep() {
        let flags = RunFlags {
            no_backoff: true,
            ..RunFlags::default()
        };
        let policy = flags.to_overrides().unwrap().build().unwrap();
        assert!(policy.backoff_intervals().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn failing_child_is_retried_and_its_code_returned() {
        let dir = tempfile::tempdir().unwrap();
        let runs = dir.path().join("runs");
        let mut cfg = Take2Config::default();
        cfg.policy.time_to_sleep = 0.0;
        cfg.policy.backoff = false;
        let flags = RunFlags {
            retries: Some(1),
            retriable: vec![FailureKind::custom("exit:3")],
            ..RunFlags::default()
        };
        let command: Vec<String> = vec![
            "sh".into(),
            "-c".into(),
            r#"echo x >> "$1"; exit 3"#.into(),
            "sh".into(),
            runs.to_string_lossy().into_owned(),
        ];

        assert_eq!(run_command(&cfg, &flags, &command).unwrap(), 3);
        let lines = std::fs::read_to_string(&runs).unwrap();
        assert_eq!(lines.lines().count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn non_retriable_exit_runs_child_once() {
        let dir = tempfile::tempdir().unwrap();
        let runs = dir.path().join("runs");
        let mut cfg = Take2Config::default();
        cfg.policy.backoff = false;
        let flags = RunFlags {
            retries: Some(3),
            retriable: vec![FailureKind::custom("exit:75")],
            ..RunFlags::default()
        };
        let command: Vec<String> = vec![
            "sh".into(),
            "-c".into(),
            r#"echo x >> "$1"; exit 4"#.into(),
            "sh".into(),
            runs.to_string_lossy().into_owned(),
        ];

        assert_eq!(run_command(&cfg, &flags, &command).unwrap(), 4);
        let lines = std::fs::read_to_string(&runs).unwrap();
        assert_eq!(lines.lines().count(), 1);

        let ok: Vec<String> = vec!["true".into()];
        assert_eq!(run_command(&cfg, &flags, &ok).unwrap(), 0);
    }
}
