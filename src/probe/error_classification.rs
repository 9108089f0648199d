//! Classification of database connection failures.
//!
//! Driver errors are first reduced to a [`ConnectFailure`] so the decision
//! can be made (and tested) without a live server, then mapped onto the
//! semantic `DatabaseError` variants that carry remediation hints.

use std::borrow::Cow;
use std::io;

use crate::error::DatabaseError;

/// SQLSTATE codes that mean the server rejected the credentials.
const AUTH_SQL_STATES: &[&str] = &["28P01", "28000"];

/// Message fragments that mean the credentials were rejected.
const AUTH_MARKERS: &[&str] = &["password authentication failed", "no password supplied"];

/// Message fragments that mean the server could not be reached.
const CONNECTIVITY_MARKERS: &[&str] = &[
    "network is unreachable",
    "connection refused",
    "could not translate host name",
    "name or service not known",
    "failed to lookup address",
    "no route to host",
    "timed out",
    "tls connection",
];

/// I/O error kinds that mean the server could not be reached.
const CONNECTIVITY_KINDS: &[io::ErrorKind] = &[
    io::ErrorKind::NetworkUnreachable,
    io::ErrorKind::HostUnreachable,
    io::ErrorKind::ConnectionRefused,
    io::ErrorKind::ConnectionReset,
    io::ErrorKind::TimedOut,
];

/// Driver-independent description of a failed connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectFailure {
    message: String,
    io_kind: Option<io::ErrorKind>,
    sql_state: Option<String>,
}

impl ConnectFailure {
    /// Describe a failure by its raw message alone.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            io_kind: None,
            sql_state: None,
        }
    }

    /// Attach the underlying I/O error kind.
    #[must_use]
    pub const fn with_io_kind(mut self, kind: io::ErrorKind) -> Self {
        self.io_kind = Some(kind);
        self
    }

    /// Attach the SQLSTATE reported by the server.
    #[must_use]
    pub fn with_sql_state(mut self, code: impl Into<String>) -> Self {
        self.sql_state = Some(code.into());
        self
    }

    /// The raw driver message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Reduce a driver error to its classification inputs.
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        let sql_state = match error {
            sqlx::Error::Database(db) => db.code().map(Cow::into_owned),
            _ => None,
        };
        let io_kind = match error {
            sqlx::Error::Io(io_error) => Some(io_error.kind()),
            sqlx::Error::PoolTimedOut => Some(io::ErrorKind::TimedOut),
            other => io_error_kind_in_chain(other),
        };
        Self {
            message: error.to_string(),
            io_kind,
            sql_state,
        }
    }

    fn is_auth(&self) -> bool {
        if self
            .sql_state
            .as_deref()
            .is_some_and(|code| AUTH_SQL_STATES.contains(&code))
        {
            return true;
        }
        let lowered = self.message.to_ascii_lowercase();
        AUTH_MARKERS.iter().any(|marker| lowered.contains(marker))
    }

    fn is_connectivity(&self) -> bool {
        if self
            .io_kind
            .is_some_and(|kind| CONNECTIVITY_KINDS.contains(&kind))
        {
            return true;
        }
        let lowered = self.message.to_ascii_lowercase();
        CONNECTIVITY_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
    }
}

/// Classify a failed connection attempt.
///
/// Credential rejection is checked first: a server that answers with an
/// authentication error was reachable, whatever the message says.
#[must_use]
pub fn classify(failure: ConnectFailure) -> DatabaseError {
    if failure.is_auth() {
        return DatabaseError::AuthenticationFailed {
            message: failure.message,
        };
    }
    if failure.is_connectivity() {
        return DatabaseError::Unreachable {
            message: failure.message,
        };
    }
    DatabaseError::Unknown {
        message: failure.message,
    }
}

/// Walk the error source chain looking for an `io::Error` kind.
fn io_error_kind_in_chain(error: &dyn std::error::Error) -> Option<io::ErrorKind> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = error.source();
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        current = err.source();
    }
    None
}
