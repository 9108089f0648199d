//! Configuration data types for deploybot.

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Packages reported in the post-build summary when none are configured.
pub const DEFAULT_SUMMARY_PACKAGES: &[&str] = &[
    "django",
    "gunicorn",
    "psycopg2-binary",
    "dj-database-url",
    "whitenoise",
    "django-storages",
    "boto3",
];

/// Object storage backend selected by `STORAGE_TYPE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Files stay on the local filesystem.
    #[default]
    Local,
    /// Amazon S3.
    S3,
    /// Supabase Storage through its S3-compatible API.
    Supabase,
}

impl StorageBackend {
    /// Accepted spellings, in the order they are documented.
    pub const NAMES: &'static [&'static str] = &["local", "s3", "supabase"];

    /// Returns whether this backend needs remote credentials.
    #[must_use]
    pub const fn is_remote(self) -> bool {
        !matches!(self, Self::Local)
    }
}

/// Python runtime and virtual environment configuration.
#[derive(Debug, Clone, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interpreter used to create the virtual environment.
    #[default = "python3"]
    pub python: String,

    /// Pinned interpreter version (`PYTHON_VERSION`), checked but not enforced.
    pub python_version: Option<String>,

    /// Virtual environment directory, relative to the project directory.
    #[default(_code = "Utf8PathBuf::from(\".venv\")")]
    pub venv_dir: Utf8PathBuf,

    /// Dependency manifest, relative to the project directory.
    #[default(_code = "Utf8PathBuf::from(\"requirements.txt\")")]
    pub requirements: Utf8PathBuf,

    /// Timeout applied to every external command.
    #[default = 900]
    pub command_timeout_secs: u64,

    /// Tool whose presence is verified after installation.
    #[default(_code = "Some(String::from(\"gunicorn\"))")]
    pub tool: Option<String>,
}

/// Django management configuration.
#[derive(Debug, Clone, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct DjangoConfig {
    /// Management script, relative to the project directory.
    #[default(_code = "Utf8PathBuf::from(\"manage.py\")")]
    pub manage_script: Utf8PathBuf,

    /// Settings module forwarded as `DJANGO_SETTINGS_MODULE`.
    pub settings_module: Option<String>,

    /// Debug flag forwarded as `DEBUG`.
    pub debug: bool,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URI (`DATABASE_URL`).
    pub url: Option<String>,

    /// Upper bound for the connectivity probe.
    #[default = 10]
    pub probe_timeout_secs: u64,

    /// Whether to run `createcachetable` after migrating.
    #[default = true]
    pub create_cache_table: bool,
}

/// Object storage pass-through configuration.
///
/// Values are forwarded to the application untouched; deploybot only checks
/// that a remote backend has its credentials.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// The selected backend.
    pub backend: StorageBackend,

    /// Bucket name.
    pub bucket: Option<String>,

    /// Access key identifier.
    pub access_key: Option<String>,

    /// Secret access key.
    pub secret_key: Option<String>,

    /// Endpoint URL for S3-compatible services.
    pub endpoint_url: Option<String>,

    /// Region for Amazon S3.
    pub region: Option<String>,
}

impl StorageConfig {
    /// Lists the settings a remote backend requires but does not have.
    ///
    /// The local backend never reports missing fields. Supabase additionally
    /// requires an endpoint URL.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        if !self.backend.is_remote() {
            return Vec::new();
        }
        let mut missing = Vec::new();
        if is_blank(self.bucket.as_deref()) {
            missing.push("storage.bucket");
        }
        if is_blank(self.access_key.as_deref()) {
            missing.push("storage.access_key");
        }
        if is_blank(self.secret_key.as_deref()) {
            missing.push("storage.secret_key");
        }
        if self.backend == StorageBackend::Supabase && is_blank(self.endpoint_url.as_deref()) {
            missing.push("storage.endpoint_url");
        }
        missing
    }

    /// Validates that a remote backend is fully configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` naming every missing field.
    pub fn validate(&self) -> crate::error::Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            return Ok(());
        }
        Err(crate::error::ConfigError::MissingRequired {
            field: missing.join(", "),
        }
        .into())
    }
}

/// Preflight check configuration.
#[derive(Debug, Clone, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct PreflightConfig {
    /// Environment variables that must be present at runtime.
    #[default(_code = "vec![String::from(\"SECRET_KEY\"), String::from(\"DATABASE_URL\")]")]
    pub required_env: Vec<String>,
}

/// Post-build summary configuration.
#[derive(Debug, Clone, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct ReportConfig {
    /// Package names included in the installed-package summary.
    #[default(_code = "DEFAULT_SUMMARY_PACKAGES.iter().map(|name| String::from(*name)).collect()")]
    pub packages: Vec<String>,
}

/// Service definition configuration.
#[derive(Debug, Clone, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service definition file, relative to the project directory.
    #[default(_code = "Utf8PathBuf::from(\"render.yaml\")")]
    pub manifest: Utf8PathBuf,
}

/// Root application configuration.
///
/// Built once at startup from defaults, a configuration file, the process
/// environment, and command-line arguments (lowest to highest precedence),
/// then passed by reference to every step.
///
/// Configuration files are discovered in this order:
/// 1. Path given with `--config`
/// 2. Path in `DEPLOYBOT_CONFIG_PATH`
/// 3. `.deploybot.toml` in the current or home directory
/// 4. `~/.config/deploybot/config.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "DEPLOYBOT",
    post_merge_hook,
    discovery(
        app_name = "deploybot",
        env_var = "DEPLOYBOT_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".deploybot.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// Root of the Django project.
    pub project_dir: Option<Utf8PathBuf>,

    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: Option<String>,

    /// Runtime configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub runtime: RuntimeConfig,

    /// Django configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub django: DjangoConfig,

    /// Database configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub database: DatabaseConfig,

    /// Storage configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub storage: StorageConfig,

    /// Preflight configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub preflight: PreflightConfig,

    /// Summary configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub report: ReportConfig,

    /// Service definition configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub service: ServiceConfig,
}

impl AppConfig {
    /// Returns the project directory, defaulting to the working directory.
    #[must_use]
    pub fn project_dir(&self) -> &Utf8Path {
        self.project_dir
            .as_deref()
            .unwrap_or_else(|| Utf8Path::new("."))
    }

    /// Returns the log filter, defaulting to `info`.
    #[must_use]
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Resolves a project-relative path against the project directory.
    ///
    /// Absolute paths are returned unchanged.
    #[must_use]
    pub fn project_path(&self, relative: &Utf8Path) -> Utf8PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.project_dir().join(relative)
        }
    }
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        // Platforms export unset variables as empty strings; treat those as absent.
        self.database.url = normalise_optional(self.database.url.take());
        self.runtime.python_version = normalise_optional(self.runtime.python_version.take());
        self.django.settings_module = normalise_optional(self.django.settings_module.take());
        Ok(())
    }
}

fn normalise_optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_owned())
        .filter(|trimmed| !trimmed.is_empty())
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|text| text.trim().is_empty())
}
