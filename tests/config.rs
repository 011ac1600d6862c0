// tests/config.rs

mod common;
use crate::common::{FakeClock, FakeConnector, FakeProcessExecutor, MockFileSystem, init_tracing};

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::{TempDir, tempdir};

use ccnet::config::duration::parse_duration;
use ccnet::config::loader::{LoadedConfig, build_server, load_and_validate, load_from_path};
use ccnet::config::parse_config;
use ccnet::errors::CcnetError;
use ccnet::task::Task;
use ccnet::trigger::{CombinationMode, Trigger};

type TestResult = Result<(), Box<dyn Error>>;

const FULL_CONFIG: &str = r#"
[server]
name = "build-1"
state_dir = "state"
poll_interval = "250ms"
remote_timeout = "5s"
tcp_listen = "127.0.0.1:21235"

[[project]]
name = "alpha"

[project.trigger]
type = "multiple"
operator = "and"

[[project.trigger.triggers]]
type = "interval"
period = "5m"
initial_period = "10s"

[[project.trigger.triggers]]
type = "schedule"
time = "23:30"
weekdays = ["Mon", "Friday"]

[[project.source_control]]
name = "main"
repository = "https://example.org/alpha.git"
branch = "main"

[[project.tasks]]
type = "comment"
text = "start"

[[project.tasks]]
type = "get_source"

[[project.tasks]]
type = "sequence"
name = "Build"
abort_on_failure = true
tasks = [
    { type = "msbuild", project_file = "Alpha.sln", targets = ["Build"], timeout = "10m" },
    { type = "nant", build_file = "default.build" },
]

[[project.tasks]]
type = "merge_files"
files = [{ path = "out/tests.xml", delete_source = true }]

[[project.tasks]]
type = "force_build"
project = "beta"

[[project]]
name = "beta"
working_directory = "/srv/beta"

[project.trigger]
type = "roll_up"
period = "10m"

[project.trigger.inner]
type = "interval"
period = "1m"

[[project.tasks]]
type = "null"
"#;

fn write_config(contents: &str) -> Result<(TempDir, PathBuf), Box<dyn Error>> {
    init_tracing();
    let dir = tempdir()?;
    let path = dir.path().join("ccnet.toml");
    fs::write(&path, contents)?;
    Ok((dir, path))
}

fn validation_message(err: CcnetError) -> Result<String, Box<dyn Error>> {
    match err {
        CcnetError::Validation(message) => Ok(message),
        other => Err(format!("expected a validation error, got {other}").into()),
    }
}

#[test]
fn full_config_loads() -> TestResult {
    let (dir, path) = write_config(FULL_CONFIG)?;
    let loaded = load_and_validate(&path)?;
    let cfg = &loaded.config;

    assert_eq!(cfg.server.name, "build-1");
    assert_eq!(cfg.server.poll_interval, Duration::from_millis(250));
    assert_eq!(cfg.server.remote_timeout, Duration::from_secs(5));
    assert_eq!(cfg.server.tcp_listen.as_deref(), Some("127.0.0.1:21235"));
    assert_eq!(cfg.server.http_listen, None);
    assert_eq!(loaded.state_dir(), dir.path().join("state"));
    assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);

    let alpha = &cfg.projects[0];
    match &alpha.trigger {
        Some(Trigger::Multiple(multiple)) => {
            assert_eq!(multiple.operator, CombinationMode::And);
            assert_eq!(multiple.triggers().len(), 2);
        }
        other => return Err(format!("unexpected trigger {other:?}").into()),
    }
    let kinds: Vec<&str> = alpha.tasks.iter().map(Task::kind).collect();
    assert_eq!(kinds, ["comment", "get_source", "sequence", "merge_files", "force_build"]);
    assert_eq!(alpha.tasks[2].children().len(), 2);

    let beta = &cfg.projects[1];
    assert!(matches!(beta.trigger, Some(Trigger::RollUp(_))));
    assert_eq!(beta.working_directory(), Path::new("/srv/beta"));
    assert_eq!(beta.artifact_directory(), Path::new("artifacts/beta"));
    Ok(())
}

#[test]
fn built_server_resolves_paths_against_config_dir() -> TestResult {
    let (dir, path) = write_config(FULL_CONFIG)?;
    let loaded = load_and_validate(&path)?;

    let server = build_server(
        &loaded,
        Arc::new(FakeClock::at_epoch()),
        Arc::new(MockFileSystem::new()),
        Arc::new(FakeProcessExecutor::new()),
        Arc::new(FakeConnector::new()),
    )?;

    assert_eq!(server.name(), "build-1");
    assert_eq!(server.project_names(), ["alpha", "beta"]);
    assert_eq!(server.services().poll_interval, Duration::from_millis(250));

    let alpha = server.project("alpha").ok_or("alpha missing")?;
    assert_eq!(alpha.working_directory(), dir.path().join("work/alpha"));
    assert_eq!(alpha.artifact_directory(), dir.path().join("artifacts/alpha"));
    assert!(alpha.root_task().find("build").is_some());

    let beta = server.project("beta").ok_or("beta missing")?;
    assert_eq!(beta.working_directory(), Path::new("/srv/beta"));
    assert_eq!(
        server.services().results.path_for("beta"),
        dir.path().join("state").join("Beta.state")
    );
    Ok(())
}

#[test]
fn defaults_apply_to_minimal_config() -> TestResult {
    let cfg = parse_config(
        r#"
        [server]
        name = "solo"
        "#,
    )?;

    assert_eq!(cfg.server.state_dir, PathBuf::from("state"));
    assert_eq!(cfg.server.poll_interval, Duration::from_millis(500));
    assert_eq!(cfg.server.remote_timeout, Duration::from_secs(30));
    assert!(cfg.projects.is_empty());
    Ok(())
}

#[test]
fn every_validation_error_is_reported_at_once() -> TestResult {
    let (_dir, path) = write_config(
        r#"
        [server]
        name = "bad:name"

        [[project]]
        name = "alpha"
        trigger = { type = "interval" }
        tasks = [{ type = "msbuild" }]

        [[project]]
        name = "alpha"
        trigger = { type = "schedule", time = "25:99" }
        source_control = [
            { name = "a", repository = "https://example.org/a.git" },
            { name = "b", repository = "" },
        ]
        tasks = [{ type = "get_source" }, { type = "apply_label", use = "c" }]

        [[project]]
        tasks = [{ type = "force_build", project = "far:away" }]
        "#,
    )?;

    let err = load_and_validate(&path).err().ok_or("validation should fail")?;
    let message = validation_message(err)?;

    for expected in [
        "must not contain ':'",
        "requires a period greater than zero",
        "msbuild task requires a project_file",
        "project 'alpha': duplicate project name",
        "invalid time '25:99'",
        "source control block 'b' has no repository",
        "2 configured and no `use` given",
        "source control block 'c' not found",
        "project #3 has no name",
        "no server_address is set",
    ] {
        assert!(message.contains(expected), "missing {expected:?} in:\n{message}");
    }
    Ok(())
}

#[test]
fn warnings_do_not_block_loading() -> TestResult {
    let (_dir, path) = write_config(
        r#"
        [server]
        name = "quiet"

        [[project]]
        name = "idle"
        trigger = { type = "multiple", triggers = [] }
        "#,
    )?;

    let loaded: LoadedConfig = load_and_validate(&path)?;
    assert_eq!(loaded.warnings.len(), 2);
    assert!(loaded.warnings.iter().any(|w| w.contains("no tasks configured")));
    assert!(loaded.warnings.iter().any(|w| w.contains("will never fire")));
    Ok(())
}

#[test]
fn malformed_files_fail_to_parse() -> TestResult {
    let (_dir, path) = write_config(
        r#"
        [server]
        name = "x"

        [[project]]
        name = "alpha"
        trigger = { type = "hourly" }
        "#,
    )?;
    assert!(load_from_path(&path).is_err());

    let (_dir, path) = write_config(
        r#"
        [server]
        name = "x"
        poll_interval = "5 minutes"
        "#,
    )?;
    assert!(load_and_validate(&path).is_err());

    assert!(load_from_path("/definitely/not/here/ccnet.toml").is_err());
    Ok(())
}

#[test]
fn durations_parse_with_units() {
    assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
    assert_eq!(parse_duration(" 30s "), Ok(Duration::from_secs(30)));
    assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
    assert_eq!(parse_duration("2H"), Ok(Duration::from_secs(7200)));
    assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
    assert_eq!(parse_duration("1s250ms"), Ok(Duration::from_millis(1250)));

    for bad in ["", "10", "m", "1d", "1.5s"] {
        assert!(parse_duration(bad).is_err(), "{bad:?} should not parse");
    }
}

#[test]
fn filter_conditional_and_parallel_parse() -> TestResult {
    let cfg = parse_config(
        r#"
        [server]
        name = "night"

        [[project]]
        name = "alpha"

        [project.trigger]
        type = "filter"
        name = "Quiet hours"
        start_time = "23:00"
        end_time = "07:00"
        weekdays = ["Sat", "Sunday"]

        [project.trigger.inner]
        type = "schedule"
        time = "02:00"
        build_condition = "force_build"

        [[project.tasks]]
        type = "parallel"
        tasks = [
            { type = "msbuild", project_file = "A.sln" },
            { type = "nant", build_file = "b.build" },
        ]

        [[project.tasks]]
        type = "conditional"
        conditions = [
            { type = "status", equals = "Success" },
            { type = "or", conditions = [
                { type = "file_exists", path = "deploy.flag" },
                { type = "build_condition", value = "force_build" },
            ] },
        ]
        tasks = [{ type = "comment", text = "deploy" }]
        else_tasks = [{ type = "null", name = "Skip" }]
        "#,
    )?;

    let alpha = &cfg.projects[0];
    let trigger = alpha.trigger.as_ref().ok_or("trigger missing")?;
    assert_eq!(trigger.kind(), "filter");
    assert_eq!(trigger.name(), "Quiet hours");
    assert_eq!(trigger.children().first().map(|t| t.kind()), Some("schedule"));

    let kinds: Vec<&str> = alpha.tasks.iter().map(Task::kind).collect();
    assert_eq!(kinds, ["parallel", "conditional"]);
    assert_eq!(alpha.tasks[0].children().len(), 2);
    assert_eq!(alpha.tasks[1].children().len(), 2);
    assert!(alpha.tasks[1].find("skip").is_some());
    Ok(())
}
