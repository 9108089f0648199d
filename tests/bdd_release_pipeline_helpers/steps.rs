//! Given/when steps for release pipeline scenarios.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use camino::Utf8PathBuf;
use deploybot::api;
use deploybot::config::AppConfig;
use deploybot::pipeline::{ReleaseContext, StatusWriter};
use deploybot::probe::{ConnectFailure, DatabaseProbe, ProbeFuture};
use deploybot::process::{CommandFuture, CommandOutput, CommandRunner, CommandSpec};
use mockable::MockEnv;
use mockall::mock;
use rstest_bdd_macros::{given, when};

use super::StepResult;
use super::state::{CommandFailures, GOOD_URI, ProbeBehaviour, ReleaseState};

const REQUIREMENTS: &str = "Django==4.2.7\ngunicorn==21.2.0\npsycopg2-binary==2.9.9\n";
const FREEZE: &str = "Django==4.2.7\ngunicorn==21.2.0\npsycopg2-binary==2.9.9\nsqlparse==0.4.4\n";

mock! {
    #[derive(Debug)]
    Runner {}

    impl CommandRunner for Runner {
        fn run(&self, spec: CommandSpec) -> CommandFuture<'_>;
    }
}

mock! {
    #[derive(Debug)]
    Probe {}

    impl DatabaseProbe for Probe {
        fn probe(&self, uri: &str) -> ProbeFuture<'_>;
    }
}

#[given("a Django project whose dependencies install cleanly")]
fn given_clean_project(release_state: &ReleaseState) {
    // The fixture defaults describe a healthy project.
    let _ = release_state;
}

#[given("the database URL is empty")]
fn given_empty_database_url(release_state: &ReleaseState) {
    release_state.database_url.set(String::new());
}

#[given("the database is unreachable with error {message}")]
fn given_unreachable_database(release_state: &ReleaseState, message: String) {
    release_state.probe.set(ProbeBehaviour::Unreachable(message));
}

#[given("the database rejects the credentials")]
fn given_rejected_credentials(release_state: &ReleaseState) {
    release_state.probe.set(ProbeBehaviour::RejectsCredentials);
}

#[given("the cache table already exists")]
fn given_cache_table_exists(release_state: &ReleaseState) -> StepResult<()> {
    update_failures(release_state, |failures| {
        failures.cache_table = Some(String::from(
            "Cache table 'django_cache' already exists.",
        ));
    })
}

#[given("cache table creation fails")]
fn given_cache_table_fails(release_state: &ReleaseState) -> StepResult<()> {
    update_failures(release_state, |failures| {
        failures.cache_table = Some(String::from("permission denied for schema public"));
    })
}

#[given("migrations fail")]
fn given_migrations_fail(release_state: &ReleaseState) -> StepResult<()> {
    update_failures(release_state, |failures| failures.migrate = true)
}

#[given("dependency installation fails")]
fn given_install_fails(release_state: &ReleaseState) -> StepResult<()> {
    update_failures(release_state, |failures| failures.install = true)
}

#[when("the build runs")]
fn when_build_runs(release_state: &ReleaseState) -> StepResult<()> {
    let failures = release_state
        .failures
        .get()
        .ok_or_else(|| String::from("failures should be configured"))?;
    let behaviour = release_state
        .probe
        .get()
        .ok_or_else(|| String::from("probe behaviour should be configured"))?;
    let database_url = release_state.database_url.get().unwrap_or_default();

    let project = tempfile::tempdir().map_err(|e| format!("failed to create project: {e}"))?;
    let project_dir = Utf8PathBuf::from_path_buf(project.path().to_path_buf())
        .map_err(|p| format!("non UTF-8 project path: {}", p.display()))?;
    std::fs::write(project_dir.join("requirements.txt"), REQUIREMENTS)
        .map_err(|e| format!("failed to write requirements: {e}"))?;

    let mut config = AppConfig {
        project_dir: Some(project_dir),
        ..AppConfig::default()
    };
    config.database.url = Some(database_url.clone()).filter(|url| !url.is_empty());

    let log = Arc::new(Mutex::new(Vec::new()));
    let runner = runner_for(failures, Arc::clone(&log));
    let probe = probe_for(behaviour);
    let env = env_with(&[("SECRET_KEY", "s3cret"), ("DATABASE_URL", &database_url)]);

    let runtime =
        tokio::runtime::Runtime::new().map_err(|e| format!("failed to create runtime: {e}"))?;
    let ctx = ReleaseContext::new(&config, &runner, &probe, &env);
    let mut out = StatusWriter::new(Vec::new());
    let outcome = api::build(&ctx, runtime.handle(), &mut out);

    release_state.outcome.set(outcome);
    release_state
        .output
        .set(String::from_utf8_lossy(&out.into_inner()).into_owned());
    release_state.commands.set(
        log.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone(),
    );
    Ok(())
}

fn update_failures(
    release_state: &ReleaseState,
    update: impl FnOnce(&mut CommandFailures),
) -> StepResult<()> {
    let mut failures = release_state
        .failures
        .get()
        .ok_or_else(|| String::from("failures should be configured"))?;
    update(&mut failures);
    release_state.failures.set(failures);
    Ok(())
}

fn respond(spec: &CommandSpec, failures: &CommandFailures) -> CommandOutput {
    if spec.has_args(&["install", "-r"]) && failures.install {
        return CommandOutput::failure_with(
            1,
            "ERROR: Could not find a version that satisfies the requirement Django==4.2.7",
        );
    }
    if spec.has_args(&["migrate", "--noinput"]) && failures.migrate {
        return CommandOutput::failure_with(1, "django.db.utils.OperationalError: lock timeout");
    }
    if spec.has_args(&["createcachetable"])
        && let Some(ref stderr) = failures.cache_table
    {
        return CommandOutput::failure_with(1, stderr.as_str());
    }
    if spec.has_args(&["list", "--format=freeze"]) {
        return CommandOutput::success_with(FREEZE);
    }
    CommandOutput::success_with("")
}

fn runner_for(failures: CommandFailures, log: Arc<Mutex<Vec<String>>>) -> MockRunner {
    let mut runner = MockRunner::new();
    runner.expect_run().returning(move |spec| {
        log.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(spec.display());
        let output = respond(&spec, &failures);
        Box::pin(async move { Ok(output) })
    });
    runner
}

fn probe_for(behaviour: ProbeBehaviour) -> MockProbe {
    let mut probe = MockProbe::new();
    probe.expect_probe().returning(move |uri| {
        let result = match behaviour {
            ProbeBehaviour::Accepts if uri == GOOD_URI => Ok(()),
            ProbeBehaviour::Accepts => Err(ConnectFailure::new(format!("unexpected URI {uri}"))),
            ProbeBehaviour::Unreachable(ref message) => Err(ConnectFailure::new(message.clone())),
            ProbeBehaviour::RejectsCredentials => Err(ConnectFailure::new(
                "password authentication failed for user \"app\"",
            )
            .with_sql_state("28P01")),
        };
        Box::pin(async move { result })
    });
    probe
}

fn env_with(vars: &[(&str, &str)]) -> MockEnv {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect();
    let mut env = MockEnv::new();
    env.expect_string().returning(move |key| map.get(key).cloned());
    env
}
