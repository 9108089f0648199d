//! sqlx-backed database probe.

use std::str::FromStr;

use sqlx::Connection;
use sqlx::postgres::{PgConnectOptions, PgConnection};

use super::{ConnectFailure, DatabaseProbe, ProbeFuture};

/// Probes a Postgres server by opening one connection, pinging it and
/// closing it again.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgProbe;

impl PgProbe {
    /// Create a probe.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn connect_ping_close(uri: String) -> Result<(), ConnectFailure> {
        let options =
            PgConnectOptions::from_str(&uri).map_err(|e| ConnectFailure::from_sqlx(&e))?;
        let mut connection = PgConnection::connect_with(&options)
            .await
            .map_err(|e| ConnectFailure::from_sqlx(&e))?;

        // Close on every path, including a failed ping.
        let pinged = connection.ping().await;
        let closed = connection.close().await;

        pinged.map_err(|e| ConnectFailure::from_sqlx(&e))?;
        closed.map_err(|e| ConnectFailure::from_sqlx(&e))
    }
}

impl DatabaseProbe for PgProbe {
    fn probe(&self, uri: &str) -> ProbeFuture<'_> {
        Box::pin(Self::connect_ping_close(uri.to_owned()))
    }
}
