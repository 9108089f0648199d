//! Dependency manifest and service definition parsing.
//!
//! Both files live in the project directory and are read through `cap-std`
//! so every path is resolved relative to an explicitly opened directory.

mod requirements;
mod service;

pub use requirements::{Requirement, normalise_name, parse_requirements, read_requirements};
pub use service::{
    DatabaseDefinition, EnvVarDecl, EnvVarSource, FromDatabase, ServiceDefinition,
    ServiceManifest,
};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;

use crate::error::ManifestError;

/// Read a manifest file to a string.
///
/// # Errors
///
/// Returns `ManifestError::Unreadable` if the parent directory cannot be
/// opened or the file cannot be read as UTF-8.
pub(crate) fn read_manifest(path: &Utf8Path) -> Result<String, ManifestError> {
    let unreadable = |message: String| ManifestError::Unreadable {
        path: path.as_std_path().to_path_buf(),
        message,
    };

    let current_dir = Utf8PathBuf::from(".");
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| current_dir.as_ref());
    let file_name = path
        .file_name()
        .ok_or_else(|| unreadable(String::from("path has no file name")))?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|e| unreadable(e.to_string()))?;
    dir.read_to_string(file_name)
        .map_err(|e| unreadable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn read_manifest_returns_file_contents() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        file.write_all(b"django==4.2\n")
            .expect("temp file should be writable");
        let path = Utf8Path::from_path(file.path()).expect("temp path should be UTF-8");

        let content = read_manifest(path).expect("manifest should be readable");
        assert_eq!(content, "django==4.2\n");
    }

    #[rstest]
    fn read_manifest_reports_missing_file_with_path() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("requirements.txt"))
            .expect("temp path should be UTF-8");

        let error = read_manifest(&path).expect_err("missing file should fail");
        match error {
            ManifestError::Unreadable { path: reported, .. } => {
                assert_eq!(reported, path.as_std_path());
            }
            other => panic!("Expected ManifestError::Unreadable, got: {other:?}"),
        }
    }
}
