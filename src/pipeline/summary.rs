//! Installed-package listing.

use std::fmt;

use super::ReleaseContext;
use crate::error::{DependencyError, DeployError};
use crate::manifest::normalise_name;

/// A package reported by `pip list --format=freeze`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    /// Package name as reported.
    pub name: String,
    /// Installed version, or the direct reference for `name @ url` entries.
    pub version: String,
}

impl fmt::Display for InstalledPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

/// Parse `pip list --format=freeze` output.
///
/// Lines that are neither `name==version` nor `name @ reference` (editable
/// installs, warnings) are ignored.
#[must_use]
pub fn parse_freeze(output: &str) -> Vec<InstalledPackage> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('-') && !line.starts_with('#'))
        .filter_map(|line| {
            line.split_once("==")
                .or_else(|| line.split_once(" @ "))
                .map(|(name, version)| InstalledPackage {
                    name: name.trim().to_owned(),
                    version: version.trim().to_owned(),
                })
        })
        .collect()
}

/// Select the packages named in `wanted`, in `wanted` order.
///
/// Names are compared after PEP 503 normalisation; packages that are not
/// installed are left out.
#[must_use]
pub fn key_packages(installed: &[InstalledPackage], wanted: &[String]) -> Vec<InstalledPackage> {
    wanted
        .iter()
        .filter_map(|name| {
            let target = normalise_name(name);
            installed
                .iter()
                .find(|package| normalise_name(&package.name) == target)
                .cloned()
        })
        .collect()
}

/// List every package installed in the virtual environment.
pub(crate) async fn installed_packages(
    ctx: &ReleaseContext<'_>,
) -> Result<Vec<InstalledPackage>, DeployError> {
    let output = ctx.runner.run(ctx.toolchain().pip_freeze()).await?;
    if !output.success() {
        return Err(DependencyError::InstallFailed {
            message: format!("pip list failed: {}", output.failure_summary()),
        }
        .into());
    }
    Ok(parse_freeze(&output.stdout))
}
