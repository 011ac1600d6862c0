// tests/process_executor.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::time::{Duration, Instant};

use tempfile::tempdir;

use ccnet::errors::ProcessError;
use ccnet::exec::{ProcessExecutor, ProcessInfo, TokioProcessExecutor};

type TestResult = Result<(), Box<dyn Error>>;

fn shell(script: &str) -> ProcessInfo {
    ProcessInfo::new("sh").arg("-c").arg(script)
}

#[tokio::test]
async fn captures_stdout_and_stderr() -> TestResult {
    init_tracing();
    let executor = TokioProcessExecutor::new();

    let result = with_timeout(executor.execute(shell("echo out; echo err >&2"))).await?;

    assert!(result.succeeded);
    assert_eq!(result.exit_code, Some(0));
    assert!(result.output.contains("out"));
    assert!(result.output.contains("err"));
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_is_a_failure() -> TestResult {
    let executor = TokioProcessExecutor::new();

    let result = with_timeout(executor.execute(shell("exit 3"))).await?;

    assert!(!result.succeeded);
    assert_eq!(result.exit_code, Some(3));
    assert!(!result.timed_out);
    Ok(())
}

#[tokio::test]
async fn extra_success_codes_are_honoured() -> TestResult {
    let executor = TokioProcessExecutor::new();
    let mut info = shell("exit 1");
    info.success_exit_codes = vec![0, 1];

    let result = with_timeout(executor.execute(info)).await?;
    assert!(result.succeeded);
    Ok(())
}

#[tokio::test]
async fn runs_in_working_directory() -> TestResult {
    let dir = tempdir()?;
    let executor = TokioProcessExecutor::new();

    let result = with_timeout(executor.execute(shell("pwd").in_dir(dir.path()))).await?;

    let reported = std::fs::canonicalize(result.output.trim())?;
    assert_eq!(reported, std::fs::canonicalize(dir.path())?);
    Ok(())
}

#[tokio::test]
async fn slow_process_is_killed_at_timeout() -> TestResult {
    init_tracing();
    let executor = TokioProcessExecutor::new();
    let info = shell("echo started; exec sleep 30").with_timeout(Duration::from_millis(200));

    let result = with_timeout(executor.execute(info)).await?;

    assert!(result.timed_out);
    assert!(!result.succeeded);
    assert_eq!(result.exit_code, None);
    Ok(())
}

#[tokio::test]
async fn timeout_kills_grandchildren_holding_the_pipes() -> TestResult {
    init_tracing();
    let executor = TokioProcessExecutor::new();
    // No `exec`: the shell forks `sleep`, which inherits stdout.
    let info = shell("echo started; sleep 3; echo done").with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let result = with_timeout(executor.execute(info)).await?;
    let elapsed = started.elapsed();

    assert!(result.timed_out);
    assert!(!result.succeeded);
    assert!(elapsed < Duration::from_millis(1500), "took {elapsed:?}");
    assert!(!result.output.contains("done"));
    Ok(())
}

#[tokio::test]
async fn missing_executable_is_a_spawn_error() {
    let executor = TokioProcessExecutor::new();
    let info = ProcessInfo::new("definitely-not-a-real-build-tool");

    let result = with_timeout(executor.execute(info)).await;
    assert!(matches!(result, Err(ProcessError::Spawn { .. })));
}

#[test]
fn command_line_joins_executable_and_arguments() {
    let info = ProcessInfo::new("msbuild").args(["/nologo", "App.sln"]);
    assert_eq!(info.command_line(), "msbuild /nologo App.sln");
}
