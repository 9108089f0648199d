//! Command builders for the project's Python toolchain.

use std::time::Duration;

use camino::Utf8PathBuf;

use crate::config::AppConfig;
use crate::process::CommandSpec;

/// Builds [`CommandSpec`]s for the interpreter, the virtual environment and
/// `manage.py`, all rooted in the project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    project_dir: Utf8PathBuf,
    bootstrap_python: String,
    venv_dir: Utf8PathBuf,
    requirements: Utf8PathBuf,
    manage_script: Utf8PathBuf,
    django_env: Vec<(String, String)>,
    timeout: Duration,
}

impl Toolchain {
    /// Derive the toolchain from configuration.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let mut django_env = vec![(
            String::from("DEBUG"),
            String::from(if config.django.debug { "True" } else { "False" }),
        )];
        if let Some(ref module) = config.django.settings_module {
            django_env.push((String::from("DJANGO_SETTINGS_MODULE"), module.clone()));
        }

        Self {
            project_dir: config.project_dir().to_path_buf(),
            bootstrap_python: config.runtime.python.clone(),
            venv_dir: config.project_path(&config.runtime.venv_dir),
            requirements: config.project_path(&config.runtime.requirements),
            manage_script: config.django.manage_script.clone(),
            django_env,
            timeout: Duration::from_secs(config.runtime.command_timeout_secs),
        }
    }

    /// The virtual environment directory.
    #[must_use]
    pub const fn venv_dir(&self) -> &Utf8PathBuf {
        &self.venv_dir
    }

    /// The dependency manifest.
    #[must_use]
    pub const fn requirements(&self) -> &Utf8PathBuf {
        &self.requirements
    }

    /// An executable installed in the virtual environment.
    #[must_use]
    pub fn venv_bin(&self, name: &str) -> Utf8PathBuf {
        self.venv_dir.join("bin").join(name)
    }

    /// The virtual environment's interpreter.
    #[must_use]
    pub fn venv_python(&self) -> Utf8PathBuf {
        self.venv_bin("python")
    }

    /// Returns whether the virtual environment already has an interpreter.
    #[must_use]
    pub fn venv_exists(&self) -> bool {
        self.venv_python().exists()
    }

    /// `<python> -m venv <venv_dir>`.
    #[must_use]
    pub fn create_venv(&self) -> CommandSpec {
        self.base(self.bootstrap_python.as_str())
            .args(["-m", "venv"])
            .arg(self.venv_dir.as_str())
    }

    /// `<venv>/bin/python -m pip <args>`.
    #[must_use]
    pub fn pip<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base(self.venv_python().as_str())
            .args(["-m", "pip"])
            .args(args)
    }

    /// `<venv>/bin/python -m pip list --format=freeze`.
    #[must_use]
    pub fn pip_freeze(&self) -> CommandSpec {
        self.pip(["list", "--format=freeze"])
    }

    /// `<venv>/bin/<tool> <args>`.
    #[must_use]
    pub fn tool<I, S>(&self, name: &str, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base(self.venv_bin(name).as_str()).args(args)
    }

    /// `<venv>/bin/python manage.py <args>` with the Django environment.
    #[must_use]
    pub fn manage<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.django_env.iter().fold(
            self.base(self.venv_python().as_str())
                .arg(self.manage_script.as_str())
                .args(args),
            |spec, (key, value)| spec.env(key.as_str(), value.as_str()),
        )
    }

    fn base(&self, program: &str) -> CommandSpec {
        CommandSpec::new(program)
            .working_dir(self.project_dir.clone())
            .timeout(self.timeout)
    }
}
