//! Configuration system for deploybot.
//!
//! This module provides the configuration structures and CLI definitions.
//! Precedence: CLI flags override environment variables, which override the
//! configuration file, which overrides defaults. The hosting platform's own
//! variables (`DATABASE_URL`, `DEBUG`, `STORAGE_TYPE`, ...) are read through
//! the same table as the `DEPLOYBOT_*` ones.
//!
//! # Example Configuration
//!
//! ```toml
//! project_dir = "/opt/render/project/src"
//! log_level = "info"
//!
//! [runtime]
//! python = "python3"
//! venv_dir = ".venv"
//! requirements = "requirements.txt"
//! tool = "gunicorn"
//!
//! [django]
//! settings_module = "code2text.production_settings"
//!
//! [database]
//! probe_timeout_secs = 10
//! create_cache_table = true
//!
//! [report]
//! packages = ["django", "gunicorn", "psycopg2-binary"]
//! ```

mod cli;
mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use cli::{Cli, Commands};
pub use loader::{env_var_names, load_config};
pub use types::{
    AppConfig, DEFAULT_SUMMARY_PACKAGES, DatabaseConfig, DjangoConfig, PreflightConfig,
    ReportConfig, RuntimeConfig, ServiceConfig, StorageBackend, StorageConfig,
};
