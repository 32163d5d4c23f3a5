//! CLI command handlers, one file per command.

mod completions;
mod config;
mod intervals;
mod run;

pub use completions::run_completions;
pub use config::run_config;
pub use intervals::run_intervals;
pub use run::{run_command, RunFlags};
