//! Classify operation failures into retry policy failure kinds.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::PolicyError;

/// High-level classification of a failure for retry purposes.
///
/// Operations map their own error types into these kinds (see [`Classify`]);
/// a policy then retries only the kinds listed in its [`RetriableSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FailureKind {
    /// The remote end reported a server-side failure (5xx).
    RemoteServer,
    /// The remote end asked us to come back later (429, 503).
    RetriableRemote,
    /// The peer reset the connection.
    ConnectionReset,
    /// Generic I/O failure (broken pipe, unexpected EOF, ...).
    Io,
    /// An attempt timed out.
    Timeout,
    /// Anything the classifier did not recognise. Not retried by default.
    Other,
    /// Application-defined kind, e.g. `exit:75`.
    Custom(String),
}

impl FailureKind {
    pub fn as_str(&self) -> &str {
        match self {
            FailureKind::RemoteServer => "remote_server",
            FailureKind::RetriableRemote => "retriable_remote",
            FailureKind::ConnectionReset => "connection_reset",
            FailureKind::Io => "io",
            FailureKind::Timeout => "timeout",
            FailureKind::Other => "other",
            FailureKind::Custom(name) => name,
        }
    }

    /// An application-defined kind. Names of the built-in kinds (`io`,
    /// `timeout`, ...) resolve to the built-in variant, so a kind always
    /// round-trips through its name.
    pub fn custom(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::builtin(&name).unwrap_or(FailureKind::Custom(name))
    }

    fn builtin(name: &str) -> Option<Self> {
        Some(match name {
            "remote_server" => FailureKind::RemoteServer,
            "retriable_remote" => FailureKind::RetriableRemote,
            "connection_reset" => FailureKind::ConnectionReset,
            "io" => FailureKind::Io,
            "timeout" => FailureKind::Timeout,
            "other" => FailureKind::Other,
            _ => return None,
        })
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err(PolicyError::invalid("retriable", "failure kind must not be empty"));
        }
        Ok(FailureKind::custom(name))
    }
}

impl TryFrom<String> for FailureKind {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FailureKind> for String {
    fn from(kind: FailureKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Maps an error value to the [`FailureKind`] the executor matches against.
pub trait Classify {
    fn failure_kind(&self) -> FailureKind;
}

impl Classify for io::Error {
    fn failure_kind(&self) -> FailureKind {
        classify_io_error(self)
    }
}

impl Classify for FailureKind {
    fn failure_kind(&self) -> FailureKind {
        self.clone()
    }
}

/// Looks through the context chain for an `io::Error`; anything else is `Other`.
impl Classify for anyhow::Error {
    fn failure_kind(&self) -> FailureKind {
        self.chain()
            .find_map(|cause| cause.downcast_ref::<io::Error>())
            .map(classify_io_error)
            .unwrap_or(FailureKind::Other)
    }
}

impl<T: Classify + ?Sized> Classify for Box<T> {
    fn failure_kind(&self) -> FailureKind {
        (**self).failure_kind()
    }
}

/// Classify an I/O error for retry decisions.
///
/// Errors that will not change on a second try (missing file, bad input,
/// permissions) are `Other`.
pub fn classify_io_error(e: &io::Error) -> FailureKind {
    match e.kind() {
        io::ErrorKind::ConnectionReset => FailureKind::ConnectionReset,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FailureKind::Timeout,
        io::ErrorKind::NotFound
        | io::ErrorKind::PermissionDenied
        | io::ErrorKind::AlreadyExists
        | io::ErrorKind::InvalidInput
        | io::ErrorKind::InvalidData
        | io::ErrorKind::Unsupported => FailureKind::Other,
        _ => FailureKind::Io,
    }
}

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u16) -> FailureKind {
    match code {
        429 | 503 => FailureKind::RetriableRemote,
        408 | 504 => FailureKind::Timeout,
        500..=599 => FailureKind::RemoteServer,
        _ => FailureKind::Other,
    }
}

/// Non-empty set of failure kinds a policy retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetriableSet(BTreeSet<FailureKind>);

impl RetriableSet {
    pub fn new(kinds: impl IntoIterator<Item = FailureKind>) -> Result<Self, PolicyError> {
        let set: BTreeSet<_> = kinds.into_iter().collect();
        if set.is_empty() {
            return Err(PolicyError::invalid(
                "retriable",
                "must list at least one failure kind",
            ));
        }
        Ok(Self(set))
    }

    pub fn contains(&self, kind: &FailureKind) -> bool {
        self.0.contains(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FailureKind> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for RetriableSet {
    fn default() -> Self {
        Self(BTreeSet::from([
            FailureKind::RemoteServer,
            FailureKind::RetriableRemote,
            FailureKind::ConnectionReset,
            FailureKind::Io,
        ]))
    }
}

impl From<FailureKind> for RetriableSet {
    fn from(kind: FailureKind) -> Self {
        Self(BTreeSet::from([kind]))
    }
}

/// Parses a comma-separated list such as `io,timeout,exit:75`.
impl FromStr for RetriableSet {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kinds = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<FailureKind>, _>>()?;
        RetriableSet::new(kinds)
    }
}

impl fmt::Display for RetriableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{kind}")?;
        }
        Ok(())
    }
}
