//! CLI for the take2 retry engine.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use take2_core::backoff::{Backoff, BackoffStrategy};
use take2_core::config;
use take2_core::retry::FailureKind;

use commands::{run_command, run_completions, run_config, run_intervals, RunFlags};

/// Top-level CLI for take2.
#[derive(Debug, Parser)]
#[command(name = "take2")]
#[command(about = "take2: run a command again when it fails", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a program, retrying it according to the configured policy.
    Run {
        /// Retries after the first attempt (overrides config).
        #[arg(long, value_name = "N")]
        retries: Option<u32>,

        /// Static delay in seconds between attempts; replaces the configured backoff.
        #[arg(long, value_name = "SECS")]
        sleep: Option<f64>,

        /// Backoff schedule as TYPE[:START], e.g. fibonacci:1.
        #[arg(long, value_name = "TYPE:START", conflicts_with = "no_backoff")]
        backoff: Option<Backoff>,

        /// Ignore any backoff schedule and use the static delay.
        #[arg(long)]
        no_backoff: bool,

        /// Failure kind to retry (repeatable or comma-separated), e.g. exit:1,io.
        #[arg(long, value_name = "KIND", value_delimiter = ',')]
        retriable: Vec<FailureKind>,

        /// Raw policy override as KEY=VALUE (repeatable).
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Program and arguments to run.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Print the 10-step delay schedule for a backoff strategy.
    Intervals {
        /// constant, linear, fibonacci or exponential.
        strategy: BackoffStrategy,

        /// First delay in seconds.
        start: f64,
    },

    /// Show the config file location and the resolved default policy.
    Config,

    /// Generate shell completions on stdout.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

impl CliCommand {
    /// Parse arguments, dispatch, and return the process exit code.
    pub fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run {
                retries,
                sleep,
                backoff,
                no_backoff,
                retriable,
                set,
                command,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let flags = RunFlags {
                    retries,
                    sleep,
                    backoff,
                    no_backoff,
                    retriable,
                    set,
                };
                run_command(&cfg, &flags, &command)
            }
            CliCommand::Intervals { strategy, start } => {
                run_intervals(strategy, start)?;
                Ok(0)
            }
            CliCommand::Config => {
                let cfg = config::load_or_init()?;
                run_config(&config::config_path()?, &cfg)?;
                Ok(0)
            }
            CliCommand::Completions { shell } => {
                run_completions(shell);
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests;
