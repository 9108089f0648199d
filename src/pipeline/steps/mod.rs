//! Concrete pipeline steps and the standard pipelines built from them.

mod assets;
mod connectivity;
mod install;
mod migrate;
mod preflight;
mod tool_check;

pub use assets::CollectStaticStep;
pub use connectivity::DatabaseStep;
pub use install::InstallStep;
pub use migrate::{CacheTableStep, MigrateStep, MigrationCheckStep};
pub use preflight::{RequiredEnvStep, ServiceEnvStep, StorageStep};
pub use tool_check::ToolCheckStep;

use super::{OnFailure, Orchestrator, Step};

/// The release build: install, tool check, static assets, database probe,
/// migration check, migrate, cache table.
#[must_use]
pub fn build_pipeline() -> Orchestrator {
    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(InstallStep),
        Box::new(ToolCheckStep),
        Box::new(CollectStaticStep),
        Box::new(DatabaseStep::new(OnFailure::Halt)),
        Box::new(MigrationCheckStep),
        Box::new(MigrateStep),
        Box::new(CacheTableStep),
    ];
    Orchestrator::new("Build", steps).with_package_summary()
}

/// The preflight check: every check runs and reports, none halts.
#[must_use]
pub fn preflight_pipeline() -> Orchestrator {
    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(RequiredEnvStep),
        Box::new(ServiceEnvStep),
        Box::new(StorageStep),
        Box::new(DatabaseStep::new(OnFailure::WarnAndContinue)),
    ];
    Orchestrator::new("Preflight", steps)
}
