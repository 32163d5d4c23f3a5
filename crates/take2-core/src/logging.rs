//! Tracing setup: append to a log file under the XDG state dir, or write to stderr.

use anyhow::{anyhow, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,take2=debug,take2_core=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Per-event writer; stderr when the log file handle cannot be cloned.
enum LogSink {
    File(File),
    Stderr,
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogSink::File(f) => f.write(buf),
            LogSink::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogSink::File(f) => f.flush(),
            LogSink::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct LogFile(File);

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(LogSink::File)
            .unwrap_or(LogSink::Stderr)
    }
}

/// `~/.local/state/take2/take2.log`, creating the directory if needed.
pub fn log_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("take2")?;
    Ok(xdg_dirs.place_state_file("take2.log")?)
}

/// Install a subscriber that appends to [`log_path`].
///
/// Returns Err if the file cannot be opened or a subscriber is already set, so
/// the caller can fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let path = log_path()?;
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(LogFile(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))?;

    tracing::info!("take2 logging to {}", path.display());
    Ok(())
}

/// Log to stderr only. A second call is a no-op.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}
