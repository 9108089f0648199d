//! `requirements.txt` parsing.
//!
//! Only the subset needed to verify an installation is understood: package
//! names, extras, version specifiers, environment markers, direct references
//! (`name @ url`) and nested `-r` includes. Other installer options (`-c`,
//! `-e`, `--index-url`) are skipped because they do not declare a package by
//! name.

use std::collections::HashSet;
use std::fmt;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use super::read_manifest;
use crate::error::ManifestError;

/// One declared dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// The package name as written.
    pub name: String,
    /// Version specifier or direct reference, if any (e.g. `>=4.2,<5`).
    pub specifier: Option<String>,
    /// Environment marker, if any (e.g. `sys_platform == 'win32'`).
    pub marker: Option<String>,
}

impl Requirement {
    /// Returns the PEP 503 normalised package name.
    #[must_use]
    pub fn normalised_name(&self) -> String {
        normalise_name(&self.name)
    }

    /// Whether pip may skip this requirement depending on the target
    /// environment.
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        self.marker.is_some()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(ref specifier) = self.specifier {
            write!(f, "{specifier}")?;
        }
        if let Some(ref marker) = self.marker {
            write!(f, "; {marker}")?;
        }
        Ok(())
    }
}

/// Normalise a package name as PEP 503 does.
///
/// Lowercases the name and collapses every run of `-`, `_` and `.` into a
/// single `-`, so `Django_Storages` and `django.storages` compare equal.
#[must_use]
pub fn normalise_name(name: &str) -> String {
    let mut normalised = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.trim().chars() {
        if matches!(ch, '-' | '_' | '.') {
            pending_separator = true;
            continue;
        }
        if pending_separator && !normalised.is_empty() {
            normalised.push('-');
        }
        pending_separator = false;
        normalised.push(ch.to_ascii_lowercase());
    }
    normalised
}

/// Package lines and `-r` includes of one requirements file.
#[derive(Debug, Default)]
struct ParsedManifest {
    requirements: Vec<Requirement>,
    includes: Vec<String>,
}

impl ParsedManifest {
    fn push_line(&mut self, line_number: usize, line: &str) -> Result<(), ManifestError> {
        if line.is_empty() {
            return Ok(());
        }
        if line.starts_with('-') {
            if let Some(include) = include_target(line) {
                self.includes.push(include.to_owned());
            }
            return Ok(());
        }
        self.requirements.push(parse_line(line_number, line)?);
        Ok(())
    }
}

/// Parse the contents of a requirements file.
///
/// Blank lines, comments and option lines are skipped, `-r` includes among
/// them. Lines ending in `\` are joined with the following line.
///
/// # Errors
///
/// Returns `ManifestError::InvalidRequirement` for a line that does not start
/// with a valid package name.
pub fn parse_requirements(content: &str) -> Result<Vec<Requirement>, ManifestError> {
    parse_manifest(content).map(|parsed| parsed.requirements)
}

fn parse_manifest(content: &str) -> Result<ParsedManifest, ManifestError> {
    let mut parsed = ParsedManifest::default();
    let mut logical = String::new();
    let mut start_line = 0;

    for (index, raw) in content.lines().enumerate() {
        if logical.is_empty() {
            start_line = index + 1;
        }
        let without_comment = strip_comment(raw);
        if let Some(continued) = without_comment.trim_end().strip_suffix('\\') {
            logical.push_str(continued);
            logical.push(' ');
            continue;
        }
        logical.push_str(without_comment);
        parsed.push_line(start_line, logical.trim())?;
        logical.clear();
    }

    parsed.push_line(start_line, logical.trim())?;
    Ok(parsed)
}

/// Read and parse a requirements file, following `-r` includes relative to
/// the including file. Each file is read at most once.
///
/// # Errors
///
/// Returns `ManifestError::Unreadable` if the file or an included file cannot
/// be read and `ManifestError::InvalidRequirement` if a line is malformed.
pub fn read_requirements(path: &Utf8Path) -> Result<Vec<Requirement>, ManifestError> {
    let mut visited = HashSet::new();
    let mut requirements = Vec::new();
    collect_requirements(&normalise_path(path), &mut visited, &mut requirements)?;
    Ok(requirements)
}

fn collect_requirements(
    path: &Utf8Path,
    visited: &mut HashSet<Utf8PathBuf>,
    requirements: &mut Vec<Requirement>,
) -> Result<(), ManifestError> {
    if !visited.insert(path.to_path_buf()) {
        return Ok(());
    }
    let parsed = parse_manifest(&read_manifest(path)?)?;
    requirements.extend(parsed.requirements);

    let base = path.parent().unwrap_or_else(|| Utf8Path::new(""));
    for include in parsed.includes {
        tracing::debug!(from = %path, include = %include, "following nested requirements");
        collect_requirements(&normalise_path(&base.join(include)), visited, requirements)?;
    }
    Ok(())
}

/// The file named by a `-r`/`--requirement` option. Remote includes are
/// left to pip.
fn include_target(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix("--requirement")
        .or_else(|| line.strip_prefix("-r"))?;
    let target = rest.trim_start_matches('=').trim();
    (!target.is_empty() && !target.contains("://")).then_some(target)
}

/// Resolve `.` and `..` lexically so include cycles are detected.
fn normalise_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut normalised = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir
                if matches!(
                    normalised.components().next_back(),
                    Some(Utf8Component::Normal(_))
                ) =>
            {
                normalised.pop();
            }
            other => normalised.push(other.as_str()),
        }
    }
    normalised
}

/// Remove a trailing `#` comment. A `#` only starts a comment at the start of
/// a line or after whitespace, so URL fragments survive.
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    line.find(" #")
        .or_else(|| line.find("\t#"))
        .and_then(|pos| line.get(..pos))
        .unwrap_or(line)
}

fn parse_line(line_number: usize, line: &str) -> Result<Requirement, ManifestError> {
    let invalid = |reason: &str| ManifestError::InvalidRequirement {
        line: line_number,
        content: line.to_owned(),
        reason: reason.to_owned(),
    };

    // Per-requirement options such as `--hash` follow the declaration.
    let line_without_options = line.split(" --").next().unwrap_or(line);
    let (declaration, marker) = match line_without_options.split_once(';') {
        Some((declaration, marker)) => (declaration.trim(), Some(marker.trim())),
        None => (line_without_options.trim(), None),
    };
    let name_end = declaration
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.')))
        .unwrap_or(declaration.len());
    let (name, remainder) = declaration
        .split_at_checked(name_end)
        .unwrap_or((declaration, ""));

    if !name.starts_with(|ch: char| ch.is_ascii_alphanumeric()) {
        return Err(invalid("expected a package name"));
    }

    let mut rest = remainder.trim_start();
    if let Some(extras) = rest.strip_prefix('[') {
        let (_, after) = extras
            .split_once(']')
            .ok_or_else(|| invalid("unclosed extras"))?;
        rest = after.trim_start();
    }

    let specifier = rest.trim();
    Ok(Requirement {
        name: name.to_owned(),
        specifier: (!specifier.is_empty()).then(|| specifier.to_owned()),
        marker: marker
            .filter(|value| !value.is_empty())
            .map(str::to_owned),
    })
}
