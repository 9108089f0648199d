//! Schema migration steps.

use crate::error::{DeployError, MigrationError};
use crate::pipeline::{OnFailure, ReleaseContext, Step, StepFuture, StepSuccess};

/// Runs `makemigrations --check --dry-run` to catch model changes that were
/// never turned into migrations. Reports but never halts.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationCheckStep;

impl MigrationCheckStep {
    async fn check(ctx: &ReleaseContext<'_>) -> Result<StepSuccess, DeployError> {
        let spec = ctx
            .toolchain()
            .manage(["makemigrations", "--check", "--dry-run"]);
        let output = ctx.runner.run(spec).await?;
        if output.success() {
            return Ok(StepSuccess::Completed(String::from(
                "models match migrations",
            )));
        }
        Err(MigrationError::Inconsistent {
            message: output.failure_summary(),
        }
        .into())
    }
}

impl Step for MigrationCheckStep {
    fn name(&self) -> &'static str {
        "migration-check"
    }

    fn on_failure(&self) -> OnFailure {
        OnFailure::WarnAndContinue
    }

    fn run<'a>(&'a self, ctx: &'a ReleaseContext<'a>) -> StepFuture<'a> {
        Box::pin(Self::check(ctx))
    }
}

/// Applies pending migrations with `migrate --noinput`. Failure is fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrateStep;

impl MigrateStep {
    async fn apply(ctx: &ReleaseContext<'_>) -> Result<StepSuccess, DeployError> {
        let spec = ctx.toolchain().manage(["migrate", "--noinput"]);
        let output = ctx.runner.run(spec).await?;
        if !output.success() {
            return Err(MigrationError::ApplyFailed {
                message: output.failure_summary(),
            }
            .into());
        }

        let applied = output
            .stdout
            .lines()
            .filter(|line| line.trim_start().starts_with("Applying "))
            .count();
        let message = match applied {
            0 => String::from("no migrations to apply"),
            1 => String::from("applied 1 migration"),
            n => format!("applied {n} migrations"),
        };
        Ok(StepSuccess::Completed(message))
    }
}

impl Step for MigrateStep {
    fn name(&self) -> &'static str {
        "migrate"
    }

    fn on_failure(&self) -> OnFailure {
        OnFailure::Halt
    }

    fn run<'a>(&'a self, ctx: &'a ReleaseContext<'a>) -> StepFuture<'a> {
        Box::pin(Self::apply(ctx))
    }
}

/// Creates the database cache table with `createcachetable`.
///
/// The table usually exists already, so "already exists" counts as
/// skipped and any other failure only warns.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheTableStep;

impl CacheTableStep {
    async fn create(ctx: &ReleaseContext<'_>) -> Result<StepSuccess, DeployError> {
        if !ctx.config.database.create_cache_table {
            return Ok(StepSuccess::Skipped(String::from(
                "disabled by configuration",
            )));
        }

        let spec = ctx.toolchain().manage(["createcachetable"]);
        let output = ctx.runner.run(spec).await?;
        if output.mentions("already exists") {
            return Ok(StepSuccess::Skipped(String::from(
                "cache table already exists",
            )));
        }
        if !output.success() {
            return Err(MigrationError::CacheTableFailed {
                message: output.failure_summary(),
            }
            .into());
        }
        Ok(StepSuccess::Completed(String::from("cache table ready")))
    }
}

impl Step for CacheTableStep {
    fn name(&self) -> &'static str {
        "cache-table"
    }

    fn on_failure(&self) -> OnFailure {
        OnFailure::WarnAndContinue
    }

    fn run<'a>(&'a self, ctx: &'a ReleaseContext<'a>) -> StepFuture<'a> {
        Box::pin(Self::create(ctx))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::error::FailureKind;
    use crate::pipeline::test_support::{
        ProjectFixture, Responder, RuntimeFixture, TestResult, project, runtime,
    };
    use crate::process::CommandOutput;

    #[rstest]
    #[case("", "no migrations to apply")]
    #[case("  Applying users.0001_initial... OK\n", "applied 1 migration")]
    #[case(
        "Operations to perform:\n  Applying users.0001_initial... OK\n  Applying payments.0002_invoice... OK\n",
        "applied 2 migrations"
    )]
    fn migrate_counts_applied_migrations(
        runtime: RuntimeFixture,
        project: ProjectFixture,
        #[case] stdout: &str,
        #[case] expected: &str,
    ) -> TestResult {
        let rt = runtime?;
        let fixture = project?;
        let responder = Responder::all_succeed()
            .with(&["migrate", "--noinput"], CommandOutput::success_with(stdout));
        let harness = fixture.harness(responder);

        let success = rt.block_on(MigrateStep.run(&harness.context()))?;

        assert_eq!(success, StepSuccess::Completed(String::from(expected)));
        Ok(())
    }

    #[rstest]
    fn migrate_failure_is_fatal_migration_error(
        runtime: RuntimeFixture,
        project: ProjectFixture,
    ) -> TestResult {
        let rt = runtime?;
        let fixture = project?;
        let responder = Responder::all_succeed().with(
            &["migrate", "--noinput"],
            CommandOutput::failure_with(1, "django.db.utils.ProgrammingError: relation exists"),
        );
        let harness = fixture.harness(responder);

        let error = rt
            .block_on(MigrateStep.run(&harness.context()))
            .expect_err("migrate should fail");

        assert_eq!(error.kind(), FailureKind::Migration);
        assert_eq!(MigrateStep.on_failure(), OnFailure::Halt);
        Ok(())
    }

    #[rstest]
    #[case(CommandOutput::success_with(""), StepSuccess::Completed(String::from("cache table ready")))]
    #[case(
        CommandOutput::failure_with(1, "Cache table 'django_cache' already exists."),
        StepSuccess::Skipped(String::from("cache table already exists"))
    )]
    #[case(
        CommandOutput::success_with("Cache table 'django_cache' already exists.\n"),
        StepSuccess::Skipped(String::from("cache table already exists"))
    )]
    fn cache_table_tolerates_existing_table(
        runtime: RuntimeFixture,
        project: ProjectFixture,
        #[case] output: CommandOutput,
        #[case] expected: StepSuccess,
    ) -> TestResult {
        let rt = runtime?;
        let fixture = project?;
        let harness = fixture.harness(Responder::all_succeed().with(&["createcachetable"], output));

        let success = rt.block_on(CacheTableStep.run(&harness.context()))?;

        assert_eq!(success, expected);
        Ok(())
    }

    #[rstest]
    fn cache_table_failure_only_warns(
        runtime: RuntimeFixture,
        project: ProjectFixture,
    ) -> TestResult {
        let rt = runtime?;
        let fixture = project?;
        let responder = Responder::all_succeed().with(
            &["createcachetable"],
            CommandOutput::failure_with(1, "permission denied for schema public"),
        );
        let harness = fixture.harness(responder);

        let error = rt
            .block_on(CacheTableStep.run(&harness.context()))
            .expect_err("createcachetable should fail");

        assert_eq!(error.kind(), FailureKind::Migration);
        assert_eq!(CacheTableStep.on_failure(), OnFailure::WarnAndContinue);
        Ok(())
    }

    #[rstest]
    fn cache_table_can_be_disabled(
        runtime: RuntimeFixture,
        project: ProjectFixture,
    ) -> TestResult {
        let rt = runtime?;
        let fixture = project?;
        let harness = fixture
            .harness(Responder::all_succeed())
            .configure(|config| config.database.create_cache_table = false);

        let success = rt.block_on(CacheTableStep.run(&harness.context()))?;

        assert_eq!(
            success,
            StepSuccess::Skipped(String::from("disabled by configuration"))
        );
        assert!(harness.commands().is_empty());
        Ok(())
    }

    #[rstest]
    fn migration_check_reports_missing_migrations(
        runtime: RuntimeFixture,
        project: ProjectFixture,
    ) -> TestResult {
        let rt = runtime?;
        let fixture = project?;
        let responder = Responder::all_succeed().with(
            &["makemigrations", "--check"],
            CommandOutput {
                exit_code: 1,
                stdout: String::from("Migrations for 'users':\n  users/migrations/0003_profile.py\n"),
                stderr: String::new(),
            },
        );
        let harness = fixture.harness(responder);

        let error = rt
            .block_on(MigrationCheckStep.run(&harness.context()))
            .expect_err("check should report changes");

        assert!(error.to_string().contains("0003_profile.py"));
        assert_eq!(MigrationCheckStep.on_failure(), OnFailure::WarnAndContinue);
        Ok(())
    }
}
