//! Structured logging initialisation.
//!
//! Status lines go to stdout; everything emitted through `tracing` goes to
//! stderr so the two streams can be captured separately by the platform.

use tracing_subscriber::EnvFilter;

/// Initialise structured logging with `tracing-subscriber`.
///
/// Uses the `RUST_LOG` environment variable if set, otherwise falls back to
/// `log_level`. Calling this more than once leaves the first subscriber in
/// place.
pub fn init(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
