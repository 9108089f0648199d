//! Assertion helpers for release pipeline behavioural tests.

use deploybot::api::CommandOutcome;
use rstest_bdd_macros::then;

use super::StepResult;
use super::state::ReleaseState;

fn outcome(release_state: &ReleaseState) -> StepResult<CommandOutcome> {
    release_state
        .outcome
        .get()
        .ok_or_else(|| String::from("the build should have run"))
}

fn commands(release_state: &ReleaseState) -> StepResult<Vec<String>> {
    release_state
        .commands
        .get()
        .ok_or_else(|| String::from("the build should have run"))
}

#[then("the build succeeds")]
fn build_succeeds(release_state: &ReleaseState) -> StepResult<()> {
    match outcome(release_state)? {
        CommandOutcome::Success => Ok(()),
        CommandOutcome::Failed { code } => Err(format!(
            "expected success, got exit code {code}:\n{}",
            release_state.output.get().unwrap_or_default()
        )),
    }
}

#[then("the build fails")]
fn build_fails(release_state: &ReleaseState) -> StepResult<()> {
    match outcome(release_state)? {
        CommandOutcome::Failed { code } if code != 0 => Ok(()),
        other => Err(format!("expected a non-zero exit code, got {other:?}")),
    }
}

#[then("the output mentions {text}")]
fn output_mentions(release_state: &ReleaseState, text: String) -> StepResult<()> {
    let output = release_state
        .output
        .get()
        .ok_or_else(|| String::from("the build should have run"))?;
    if output.contains(&text) {
        Ok(())
    } else {
        Err(format!("expected output to mention {text:?}, got:\n{output}"))
    }
}

#[then("migrations were not attempted")]
fn migrations_not_attempted(release_state: &ReleaseState) -> StepResult<()> {
    let ran: Vec<String> = commands(release_state)?
        .into_iter()
        .filter(|command| command.contains("migrat"))
        .collect();
    if ran.is_empty() {
        Ok(())
    } else {
        Err(format!("expected no migration commands, got {ran:?}"))
    }
}

#[then("the cache table step did not run")]
fn cache_table_not_run(release_state: &ReleaseState) -> StepResult<()> {
    if commands(release_state)?
        .iter()
        .any(|command| command.contains("createcachetable"))
    {
        Err(String::from("createcachetable should not have run"))
    } else {
        Ok(())
    }
}
