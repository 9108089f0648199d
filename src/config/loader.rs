//! Configuration loading with layered precedence.
//!
//! Precedence, lowest to highest: application defaults, configuration file,
//! environment variables, command-line arguments.
//!
//! Layers are composed with `MergeComposer` by hand rather than through the
//! derived `load()` because the hosting platform exports unprefixed variables
//! (`DATABASE_URL`, `DEBUG`, `STORAGE_TYPE`, ...) that the prefixed
//! environment layer would never see. Every recognised variable is listed in
//! [`ENV_VAR_SPECS`] with the JSON path it populates and its expected type.
//!
//! Typed variables fail fast: `DEBUG=maybe` or `STORAGE_TYPE=ftp` is an error
//! rather than a silent fallback to the default.

use camino::Utf8PathBuf;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};

use crate::config::{AppConfig, Cli, StorageBackend};
use crate::error::{ConfigError, Result};

// ============================================================================
// Environment Variable Specification Table
// ============================================================================

/// The type of value expected from an environment variable.
#[derive(Clone, Copy)]
enum EnvVarType {
    /// String value (always accepted).
    String,
    /// Boolean value (`true`/`false`).
    Bool,
    /// Django-style flag (`True`/`False`, `1`/`0`, `yes`/`no`, any case).
    Flag,
    /// Unsigned 64-bit integer.
    U64,
    /// One of a fixed set of lowercase names.
    Choice(&'static [&'static str]),
}

/// Specification for a single environment variable mapping.
struct EnvVarSpec {
    /// The environment variable name.
    env_var: &'static str,
    /// The JSON path segments (e.g., `["database", "url"]`).
    path: &'static [&'static str],
    /// The expected value type.
    var_type: EnvVarType,
}

const fn spec(
    env_var: &'static str,
    path: &'static [&'static str],
    var_type: EnvVarType,
) -> EnvVarSpec {
    EnvVarSpec {
        env_var,
        path,
        var_type,
    }
}

/// Table of all environment variables and their JSON paths.
const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    spec("DEPLOYBOT_PROJECT_DIR", &["project_dir"], EnvVarType::String),
    spec("DEPLOYBOT_LOG_LEVEL", &["log_level"], EnvVarType::String),
    // Database
    spec("DATABASE_URL", &["database", "url"], EnvVarType::String),
    spec(
        "DEPLOYBOT_PROBE_TIMEOUT_SECS",
        &["database", "probe_timeout_secs"],
        EnvVarType::U64,
    ),
    spec(
        "DEPLOYBOT_CREATE_CACHE_TABLE",
        &["database", "create_cache_table"],
        EnvVarType::Bool,
    ),
    // Runtime
    spec(
        "PYTHON_VERSION",
        &["runtime", "python_version"],
        EnvVarType::String,
    ),
    spec("DEPLOYBOT_PYTHON", &["runtime", "python"], EnvVarType::String),
    spec(
        "DEPLOYBOT_VENV_DIR",
        &["runtime", "venv_dir"],
        EnvVarType::String,
    ),
    spec(
        "DEPLOYBOT_REQUIREMENTS",
        &["runtime", "requirements"],
        EnvVarType::String,
    ),
    spec(
        "DEPLOYBOT_COMMAND_TIMEOUT_SECS",
        &["runtime", "command_timeout_secs"],
        EnvVarType::U64,
    ),
    spec("DEPLOYBOT_TOOL", &["runtime", "tool"], EnvVarType::String),
    // Django
    spec("DEBUG", &["django", "debug"], EnvVarType::Flag),
    spec(
        "DJANGO_SETTINGS_MODULE",
        &["django", "settings_module"],
        EnvVarType::String,
    ),
    spec(
        "DEPLOYBOT_MANAGE_SCRIPT",
        &["django", "manage_script"],
        EnvVarType::String,
    ),
    // Storage
    spec(
        "STORAGE_TYPE",
        &["storage", "backend"],
        EnvVarType::Choice(StorageBackend::NAMES),
    ),
    spec("SUPABASE_BUCKET", &["storage", "bucket"], EnvVarType::String),
    spec(
        "SUPABASE_ACCESS_KEY",
        &["storage", "access_key"],
        EnvVarType::String,
    ),
    spec(
        "SUPABASE_SECRET_KEY",
        &["storage", "secret_key"],
        EnvVarType::String,
    ),
    spec("SUPABASE_URL", &["storage", "endpoint_url"], EnvVarType::String),
    spec("S3_REGION", &["storage", "region"], EnvVarType::String),
];

/// Returns the list of environment variable names recognised by the config loader.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS.iter().map(|entry| entry.env_var).collect()
}

/// Load a configuration file and push it to the composer.
fn load_config_file(path: &Utf8PathBuf, composer: &mut MergeComposer) -> Result<()> {
    let current_dir = Utf8PathBuf::from(".");
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| current_dir.as_ref());
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    let value =
        toml::from_str::<serde_json::Value>(&content).map_err(|e| ConfigError::ParseError {
            message: format!("failed to parse {path}: {e}"),
        })?;

    composer.push_file(value, Some(path.clone()));
    Ok(())
}

/// Locate the configuration file, honouring `--config` before discovery.
fn discover_config_path(cli: &Cli) -> Option<Utf8PathBuf> {
    cli.config.clone().filter(|p| p.exists()).or_else(|| {
        let discovery = ConfigDiscovery::builder("deploybot")
            .env_var("DEPLOYBOT_CONFIG_PATH")
            .config_file_name("config.toml")
            .dotfile_name(".deploybot.toml")
            .build();
        discovery
            .candidates()
            .into_iter()
            .filter(|p| p.exists())
            .find_map(|p| Utf8PathBuf::try_from(p).ok())
    })
}

/// Load configuration with full layer precedence.
///
/// The environment is read through `env` so callers (and tests) control
/// exactly which variables are visible.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - `--config` names a file that exists but cannot be read or parsed
/// - a typed environment variable has an invalid value
/// - the merged layers do not form a valid configuration
pub fn load_config<E: mockable::Env>(cli: &Cli, env: &E) -> Result<AppConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(AppConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    if let Some(ref path) = discover_config_path(cli) {
        load_config_file(path, &mut composer)?;
    }

    let env_values = collect_env_vars(env)?;
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let cli_overrides = build_cli_overrides(cli);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    let config =
        AppConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;

    Ok(config)
}

/// Parse a Django-style boolean flag.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Convert one raw environment value according to its declared type.
fn parse_env_value(entry: &EnvVarSpec, raw_value: String) -> Result<Value> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: entry.env_var.to_owned(),
        reason,
    };

    let parsed = match entry.var_type {
        EnvVarType::String => Value::String(raw_value),
        EnvVarType::Bool => match raw_value.parse::<bool>() {
            Ok(b) => Value::Bool(b),
            Err(_) => {
                return Err(invalid(format!("expected bool (true/false), got '{raw_value}'")).into());
            }
        },
        EnvVarType::Flag => match parse_flag(&raw_value) {
            Some(b) => Value::Bool(b),
            None => {
                return Err(invalid(format!("expected True or False, got '{raw_value}'")).into());
            }
        },
        EnvVarType::U64 => match raw_value.trim().parse::<u64>() {
            Ok(n) => Value::Number(n.into()),
            Err(_) => {
                return Err(invalid(format!("expected unsigned integer, got '{raw_value}'")).into());
            }
        },
        EnvVarType::Choice(names) => {
            let lowered = raw_value.trim().to_ascii_lowercase();
            if !names.contains(&lowered.as_str()) {
                return Err(invalid(format!(
                    "expected one of {}, got '{raw_value}'",
                    names.join(", ")
                ))
                .into());
            }
            Value::String(lowered)
        }
    };
    Ok(parsed)
}

/// Collect recognised environment variables into a JSON value.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if a typed variable has an
/// unparseable value.
fn collect_env_vars<E: mockable::Env>(env: &E) -> Result<Value> {
    let mut root = Map::new();

    for entry in ENV_VAR_SPECS {
        let Some(raw_value) = env.string(entry.env_var) else {
            continue;
        };
        let json_value = parse_env_value(entry, raw_value)?;
        insert_at_path(&mut root, entry.path, json_value);
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

/// Insert a value at a nested path in a JSON map.
///
/// For a path like `["database", "url"]`, this creates the intermediate
/// `database` object if needed and inserts `url` within it.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(obj) = entry.as_object_mut() else {
            return;
        };
        current = obj;
    }

    current.insert(field.to_owned(), value);
}

/// Build a JSON value containing CLI overrides.
fn build_cli_overrides(cli: &Cli) -> Value {
    let mut overrides = Map::new();

    if let Some(ref dir) = cli.project_dir {
        overrides.insert(
            "project_dir".to_owned(),
            Value::String(dir.as_str().to_owned()),
        );
    }

    if let Some(ref level) = cli.log_level {
        overrides.insert("log_level".to_owned(), Value::String(level.clone()));
    }

    if overrides.is_empty() {
        Value::Null
    } else {
        Value::Object(overrides)
    }
}
