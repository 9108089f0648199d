//! Database connectivity probing.
//!
//! The probe answers one question before migrations run: can the configured
//! database be reached with the configured credentials? Failures are
//! classified so the operator sees a hint aimed at the actual cause:
//! TLS and URI shape for unreachable hosts, user and password fields for
//! rejected credentials.

mod error_classification;
mod postgres;
mod uri;

pub use error_classification::{ConnectFailure, classify};
pub use postgres::PgProbe;
pub use uri::ConnectionConfig;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::{ConfigError, DatabaseError, DeployError};

/// Boxed future type returned by [`DatabaseProbe`] implementors.
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ConnectFailure>> + Send + 'a>>;

/// Behaviour required to verify that a database accepts connections.
///
/// Implementors acquire a connection, exercise it, and release it before the
/// future completes.
pub trait DatabaseProbe: Send + Sync {
    /// Connect to `uri`, verify the connection, and close it.
    fn probe(&self, uri: &str) -> ProbeFuture<'_>;
}

/// Result of a successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Redacted connection target.
    pub target: String,
    /// Non-fatal observations about the URI.
    pub warnings: Vec<String>,
}

/// Validates a connection URI and probes the database it names.
pub struct ConnectivityProber<'a> {
    probe: &'a dyn DatabaseProbe,
    timeout: Duration,
}

impl<'a> ConnectivityProber<'a> {
    /// Create a prober that gives up after `timeout`.
    #[must_use]
    pub const fn new(probe: &'a dyn DatabaseProbe, timeout: Duration) -> Self {
        Self { probe, timeout }
    }

    /// Validate `url` and probe the database.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvVarNotSet` when `url` is absent or blank and
    /// `ConfigError::InvalidValue` when it does not parse. Returns
    /// `DatabaseError::Timeout` when the probe exceeds its timeout, and the
    /// classified `DatabaseError` when the connection attempt fails.
    pub async fn check(&self, url: Option<&str>) -> Result<ProbeReport, DeployError> {
        let uri = url
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::EnvVarNotSet {
                name: String::from("DATABASE_URL"),
            })?;

        let config = ConnectionConfig::parse(uri)?;
        let target = config.to_string();
        let warnings: Vec<String> = config.ssl_mode_warning().into_iter().collect();
        for warning in &warnings {
            tracing::warn!(%target, "{warning}");
        }

        tracing::info!(%target, timeout_secs = self.timeout.as_secs(), "probing database");
        match tokio::time::timeout(self.timeout, self.probe.probe(uri)).await {
            Err(_) => Err(DatabaseError::Timeout {
                seconds: self.timeout.as_secs(),
            }
            .into()),
            Ok(Err(failure)) => {
                let error = classify(failure);
                tracing::error!(%target, error = %error, "database probe failed");
                Err(error.into())
            }
            Ok(Ok(())) => {
                tracing::info!(%target, "database reachable");
                Ok(ProbeReport { target, warnings })
            }
        }
    }
}
