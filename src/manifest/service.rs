//! Service definition (`render.yaml`) parsing.
//!
//! The definition declares the services the platform runs and the
//! environment each one receives. Variables marked `sync: false` carry no
//! value in the file; the operator must set them in the platform dashboard,
//! so they are the ones worth checking before a release.

use camino::Utf8Path;
use serde::Deserialize;

use super::read_manifest;
use crate::error::ManifestError;

/// Parsed service definition file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceManifest {
    /// Declared services.
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,

    /// Declared managed databases.
    #[serde(default)]
    pub databases: Vec<DatabaseDefinition>,
}

/// One declared service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    /// Service type (`web`, `worker`, `cron`, ...).
    #[serde(rename = "type")]
    pub kind: String,

    /// Service name.
    pub name: String,

    /// Runtime, accepted under its older key `env` as well.
    #[serde(default, alias = "env")]
    pub runtime: Option<String>,

    /// Build command run by the platform.
    #[serde(default)]
    pub build_command: Option<String>,

    /// Start command run by the platform.
    #[serde(default)]
    pub start_command: Option<String>,

    /// Declared environment variables.
    #[serde(default)]
    pub env_vars: Vec<EnvVarDecl>,
}

impl ServiceDefinition {
    /// Returns whether this is a web service.
    #[must_use]
    pub fn is_web(&self) -> bool {
        self.kind.eq_ignore_ascii_case("web")
    }
}

/// One declared managed database.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseDefinition {
    /// Database resource name.
    pub name: String,

    /// Name of the database inside the server.
    #[serde(default)]
    pub database_name: Option<String>,

    /// Owning role.
    #[serde(default)]
    pub user: Option<String>,
}

/// Reference from an environment variable to a managed database property.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FromDatabase {
    /// Database resource name.
    pub name: String,
    /// Property exported (for example `connectionString`).
    pub property: String,
}

/// One declared environment variable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarDecl {
    /// Variable name.
    pub key: String,

    /// Literal value; YAML scalars of any type are accepted.
    #[serde(default)]
    pub value: Option<serde_yaml::Value>,

    /// `false` marks a value supplied out of band.
    #[serde(default)]
    pub sync: Option<bool>,

    /// Whether the platform generates the value.
    #[serde(default)]
    pub generate_value: Option<bool>,

    /// Managed database property this variable is bound to.
    #[serde(default)]
    pub from_database: Option<FromDatabase>,
}

/// Where a declared variable's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvVarSource {
    /// Written in the definition file.
    Literal(String),
    /// Generated by the platform.
    Generated,
    /// Bound to a managed database property.
    FromDatabase(FromDatabase),
    /// Supplied by the operator outside the file.
    OutOfBand,
}

impl EnvVarDecl {
    /// Resolves where this variable's value comes from.
    #[must_use]
    pub fn source(&self) -> EnvVarSource {
        if let Some(ref database) = self.from_database {
            return EnvVarSource::FromDatabase(database.clone());
        }
        if self.generate_value == Some(true) {
            return EnvVarSource::Generated;
        }
        match self.value.as_ref().and_then(scalar_to_string) {
            Some(literal) if self.sync != Some(false) => EnvVarSource::Literal(literal),
            _ => EnvVarSource::OutOfBand,
        }
    }
}

impl ServiceManifest {
    /// Parse a service definition from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::InvalidServiceDefinition` if the text is not
    /// valid YAML or does not have the expected shape.
    pub fn from_yaml(content: &str) -> Result<Self, ManifestError> {
        serde_yaml::from_str(content).map_err(|e| ManifestError::InvalidServiceDefinition {
            message: e.to_string(),
        })
    }

    /// Read and parse a service definition file.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::Unreadable` or
    /// `ManifestError::InvalidServiceDefinition`.
    pub fn load(path: &Utf8Path) -> Result<Self, ManifestError> {
        let content = read_manifest(path)?;
        Self::from_yaml(&content)
    }

    /// Returns the first web service.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::NoWebService` if none is declared.
    pub fn primary_web_service(&self) -> Result<&ServiceDefinition, ManifestError> {
        self.services
            .iter()
            .find(|service| service.is_web())
            .ok_or(ManifestError::NoWebService)
    }

    /// Returns every out-of-band variable name across all services,
    /// deduplicated in declaration order.
    #[must_use]
    pub fn out_of_band_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for decl in self.services.iter().flat_map(|s| s.env_vars.iter()) {
            if decl.source() == EnvVarSource::OutOfBand && !keys.contains(&decl.key.as_str()) {
                keys.push(decl.key.as_str());
            }
        }
        keys
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(text) => Some(text.clone()),
        serde_yaml::Value::Number(number) => Some(number.to_string()),
        serde_yaml::Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
