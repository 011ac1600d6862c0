// tests/tasks.rs

mod common;
use crate::common::{FakeConnector, FakeEndpoint, FakeProcessExecutor, MockFileSystem, init_tracing};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ccnet::exec::ProcessResult;
use ccnet::remote::RemoteResultCode;
use ccnet::task::source_control::resolve_block;
use ccnet::config::validate::ValidationLog;
use ccnet::task::{
    ApplyLabelTask, CommentTask, ConditionalTask, ExecutionContext, GetSourceTask, MergeFile,
    MergeFilesTask, MsBuildTask, NAntTask, NullTask, ParallelTask, SequenceTask,
    SourceControlBlock, SourceControlError, Task, TaskCondition, TaskEnvironment, run_task_tree,
};
use ccnet::types::{BuildCondition, IntegrationStatus};

type TestResult = Result<(), Box<dyn Error>>;

struct Harness {
    fs: MockFileSystem,
    executor: FakeProcessExecutor,
    local: Arc<FakeEndpoint>,
    connector: FakeConnector,
    blocks: Vec<SourceControlBlock>,
}

impl Harness {
    fn new() -> Self {
        init_tracing();
        Self {
            fs: MockFileSystem::new(),
            executor: FakeProcessExecutor::new(),
            local: FakeEndpoint::answering(RemoteResultCode::Success),
            connector: FakeConnector::new(),
            blocks: Vec::new(),
        }
    }

    fn context(&self) -> ExecutionContext {
        ExecutionContext::new(
            "alpha",
            "7",
            "/work/alpha",
            "/artifacts/alpha",
            Arc::new(self.fs.clone()),
        )
    }

    fn env(&self) -> TaskEnvironment<'_> {
        TaskEnvironment {
            server_name: "local",
            project_name: "alpha",
            source_control: &self.blocks,
            executor: &self.executor,
            local: self.local.as_ref(),
            connector: &self.connector,
        }
    }

    async fn run(&self, root: Task) -> ExecutionContext {
        self.run_in(root, self.context()).await
    }

    async fn run_in(&self, root: Task, mut context: ExecutionContext) -> ExecutionContext {
        run_task_tree(&root, &mut context, &self.env()).await;
        context
    }
}

fn comment(text: &str) -> Task {
    CommentTask::new(text).into()
}

fn sequence(tasks: Vec<Task>) -> Task {
    SequenceTask::new(tasks).into()
}

#[tokio::test]
async fn sequence_runs_children_in_order() {
    let harness = Harness::new();
    let context = harness.run(sequence(vec![comment("a"), comment("b")])).await;

    assert_eq!(context.build_log(), ["a", "b"]);
    assert_eq!(context.final_status(), IntegrationStatus::Success);
}

#[tokio::test]
async fn nested_sequences_run_depth_first() {
    let harness = Harness::new();
    let root = sequence(vec![
        comment("1"),
        sequence(vec![comment("2"), sequence(vec![comment("3")])]),
        comment("4"),
    ]);

    let context = harness.run(root).await;
    assert_eq!(context.build_log(), ["1", "2", "3", "4"]);
}

#[tokio::test]
async fn empty_sequence_logs_and_succeeds() {
    let harness = Harness::new();
    let context = harness.run(sequence(Vec::new())).await;

    assert!(context.log_contains("no tasks"));
    assert_eq!(context.final_status(), IntegrationStatus::Success);
}

#[tokio::test]
async fn null_task_does_nothing_but_log() {
    let harness = Harness::new();
    let context = harness.run(NullTask::default().into()).await;

    assert_eq!(context.build_log(), ["Doing nothing"]);
    assert!(harness.executor.calls().is_empty());
}

#[tokio::test]
async fn failed_child_does_not_stop_siblings() {
    let harness = Harness::new();
    harness.executor.push_result(ProcessResult::failure(1, "error CS1002"));

    let root = sequence(vec![MsBuildTask::new("App.sln").into(), comment("after")]);
    let context = harness.run(root).await;

    assert_eq!(context.status(), IntegrationStatus::Failure);
    assert!(context.log_contains("error CS1002"));
    assert!(context.log_contains("failed with exit code 1"));
    assert!(context.log_contains("after"));
}

#[tokio::test]
async fn aborting_sequence_stops_after_failure() {
    let harness = Harness::new();
    harness.executor.push_result(ProcessResult::failure(2, ""));

    let inner = SequenceTask::new(vec![NAntTask::new("default.build").into(), comment("skipped")]).aborting();
    let root = sequence(vec![inner.into(), comment("outer continues")]);
    let context = harness.run(root).await;

    assert_eq!(context.status(), IntegrationStatus::Failure);
    assert!(!context.log_contains("skipped"));
    assert!(context.log_contains("outer continues"));
}

#[tokio::test]
async fn task_error_becomes_exception_and_pipeline_continues() {
    // No source control blocks configured: get_source cannot pick one.
    let harness = Harness::new();
    let root = sequence(vec![GetSourceTask::default().into(), comment("still runs")]);

    let context = harness.run(root).await;

    assert_eq!(context.status(), IntegrationStatus::Exception);
    assert!(context.log_contains("failed with an error"));
    assert!(context.log_contains("still runs"));
}

#[test]
fn status_only_becomes_more_severe() {
    let harness = Harness::new();
    let mut context = harness.context();

    assert_eq!(context.status(), IntegrationStatus::Unknown);
    assert_eq!(context.final_status(), IntegrationStatus::Success);

    context.set_status(IntegrationStatus::Failure);
    context.set_status(IntegrationStatus::Success);
    assert_eq!(context.status(), IntegrationStatus::Failure);

    context.set_status(IntegrationStatus::Exception);
    context.set_status(IntegrationStatus::Failure);
    assert_eq!(context.final_status(), IntegrationStatus::Exception);
}

#[tokio::test]
async fn msbuild_builds_command_line_with_label() -> TestResult {
    let harness = Harness::new();
    let mut task = MsBuildTask::new("App.sln");
    task.targets = vec!["Build".into(), "Test".into()];
    task.properties.insert("Configuration".into(), "Release".into());
    task.timeout = Some(Duration::from_secs(600));

    assert_eq!(
        task.arguments("7"),
        ["/nologo", "/t:Build;Test", "/p:CCNetLabel=7;Configuration=Release", "App.sln"]
    );

    let context = harness.run(task.into()).await;
    let calls = harness.executor.calls();
    let call = calls.first().ok_or("msbuild was not executed")?;

    assert_eq!(call.executable, "msbuild");
    assert_eq!(call.working_directory.as_deref(), Some(Path::new("/work/alpha")));
    assert_eq!(call.timeout, Duration::from_secs(600));
    assert_eq!(context.status(), IntegrationStatus::Success);
    Ok(())
}

#[test]
fn nant_arguments_carry_label_and_targets() {
    let mut task = NAntTask::new("default.build");
    task.targets = vec!["clean".into(), "test".into()];

    assert_eq!(
        task.arguments("12"),
        ["-nologo", "-buildfile:default.build", "-D:label-to-apply=12", "clean", "test"]
    );
}

#[tokio::test]
async fn build_tool_timeout_is_a_failure() {
    let harness = Harness::new();
    harness.executor.push_result(ProcessResult::timed_out("partial output"));

    let context = harness.run(NAntTask::new("default.build").into()).await;

    assert_eq!(context.status(), IntegrationStatus::Failure);
    assert!(context.log_contains("timed out"));
    assert!(context.log_contains("partial output"));
}

#[tokio::test]
async fn build_tool_that_cannot_start_fails_the_task_only() {
    let harness = Harness::new();
    harness.executor.push_spawn_error();

    let root = sequence(vec![MsBuildTask::new("App.sln").into(), comment("next")]);
    let context = harness.run(root).await;

    assert_eq!(context.status(), IntegrationStatus::Failure);
    assert!(context.log_contains("unable to run"));
    assert!(context.log_contains("next"));
}

#[tokio::test]
async fn merge_files_imports_into_label_folder() {
    let harness = Harness::new();
    harness.fs.add_file("/work/alpha/out/tests.xml", "<results/>");
    harness.fs.add_file("/work/alpha/out/coverage.xml", "<coverage/>");

    let task = MergeFilesTask::new(vec![
        MergeFile::new("out/tests.xml").deleting_source(),
        MergeFile::new("out/coverage.xml"),
        MergeFile::new("out/missing.xml"),
    ]);
    let context = harness.run(task.into()).await;

    assert_eq!(
        harness.fs.contents("/artifacts/alpha/7/tests.xml"),
        Some(b"<results/>".to_vec())
    );
    assert!(harness.fs.contents("/artifacts/alpha/7/coverage.xml").is_some());
    assert!(harness.fs.contents("/work/alpha/out/tests.xml").is_none());
    assert!(harness.fs.contents("/work/alpha/out/coverage.xml").is_some());
    assert!(context.log_contains("not found"));
    assert_eq!(context.imported_files().len(), 2);
    assert_eq!(context.final_status(), IntegrationStatus::Success);
}

#[tokio::test]
async fn merge_files_honours_relative_target() {
    let harness = Harness::new();
    harness.fs.add_file("/work/alpha/report.html", "<html/>");

    let mut task = MergeFilesTask::new(vec![MergeFile::new("report.html")]);
    task.target = Some("reports".into());
    harness.run(task.into()).await;

    assert!(harness.fs.contents("/artifacts/alpha/7/reports/report.html").is_some());
}

#[test]
fn block_resolution_rules() {
    let one = vec![SourceControlBlock::new("main", "https://example.org/a.git")];
    let two = vec![
        SourceControlBlock::new("main", "https://example.org/a.git"),
        SourceControlBlock::new("docs", "https://example.org/d.git"),
    ];

    assert_eq!(resolve_block(&one, None).map(|b| b.name.as_str()), Ok("main"));
    assert_eq!(resolve_block(&two, Some("docs")).map(|b| b.name.as_str()), Ok("docs"));
    assert_eq!(resolve_block(&two, None), Err(SourceControlError::NotSupported(2)));
    assert_eq!(resolve_block(&[], None), Err(SourceControlError::NotSupported(0)));
    assert_eq!(
        resolve_block(&one, Some("other")),
        Err(SourceControlError::BlockNotFound("other".into()))
    );
}

#[tokio::test]
async fn get_source_clones_then_pulls() {
    let mut harness = Harness::new();
    harness.blocks = vec![SourceControlBlock::new("main", "https://example.org/a.git").on_branch("main")];

    harness.run(GetSourceTask::using("main").into()).await;
    harness.fs.add_file("/work/alpha/.git/HEAD", "ref: refs/heads/main");
    harness.run(GetSourceTask::using("main").into()).await;

    assert_eq!(
        harness.executor.command_lines(),
        [
            "git clone --branch main https://example.org/a.git /work/alpha",
            "git pull origin main",
        ]
    );
}

#[tokio::test]
async fn apply_label_skipped_after_failure() {
    let mut harness = Harness::new();
    harness.blocks = vec![SourceControlBlock::new("main", "https://example.org/a.git")];
    harness.executor.push_result(ProcessResult::failure(1, ""));

    let root = sequence(vec![
        MsBuildTask::new("App.sln").into(),
        ApplyLabelTask::default().into(),
    ]);
    let context = harness.run(root).await;

    assert!(context.log_contains("Not applying label 7"));
    assert_eq!(harness.executor.calls().len(), 1);
}

#[tokio::test]
async fn apply_label_tags_successful_build() {
    let mut harness = Harness::new();
    harness.blocks = vec![SourceControlBlock::new("main", "https://example.org/a.git")];

    harness.run(ApplyLabelTask::default().into()).await;

    assert_eq!(harness.executor.command_lines(), ["git tag 7"]);
}

#[test]
fn tasks_found_by_name_depth_first() {
    let mut named = CommentTask::new("x");
    named.name = Some("Announce".into());
    let root = sequence(vec![comment("a"), sequence(vec![named.into()])]);

    let found = root.find("announce").map(Task::kind);
    assert_eq!(found, Some("comment"));
    assert!(root.find("missing").is_none());
}

fn status_is(status: IntegrationStatus) -> TaskCondition {
    TaskCondition::Status { equals: status }
}

#[tokio::test]
async fn conditional_runs_main_branch_when_conditions_hold() {
    let harness = Harness::new();
    let conditional = ConditionalTask::new(
        vec![status_is(IntegrationStatus::Success)],
        vec![comment("deploy")],
    )
    .otherwise(vec![comment("clean up")]);

    let context = harness.run(sequence(vec![comment("build"), conditional.into()])).await;

    assert_eq!(
        context.build_log(),
        ["build", "Conditions passed - running tasks", "deploy"]
    );
}

#[tokio::test]
async fn conditional_sees_failure_of_earlier_tasks() {
    let harness = Harness::new();
    harness.executor.push_result(ProcessResult::failure(1, "boom"));
    let conditional = ConditionalTask::new(
        vec![status_is(IntegrationStatus::Success)],
        vec![comment("deploy")],
    )
    .otherwise(vec![comment("clean up"), comment("notify")]);

    let root = sequence(vec![MsBuildTask::new("App.sln").into(), conditional.into()]);
    let context = harness.run(root).await;

    assert!(context.log_contains("Conditions did not pass - running else tasks"));
    assert!(context.log_contains("clean up"));
    assert!(context.log_contains("notify"));
    assert!(!context.log_contains("deploy"));
    assert_eq!(context.status(), IntegrationStatus::Failure);
}

#[tokio::test]
async fn conditions_check_files_and_build_condition() {
    let harness = Harness::new();
    harness.fs.add_file("/work/alpha/ready.flag", "1");

    let all = |conditions: Vec<TaskCondition>| -> Task {
        ConditionalTask::new(conditions, vec![comment("yes")])
            .otherwise(vec![comment("no")])
            .into()
    };
    let flag = || TaskCondition::FileExists { path: "ready.flag".into() };
    let forced = || TaskCondition::Requested { value: BuildCondition::ForceBuild };

    let context = harness.run(all(vec![flag()])).await;
    assert!(context.log_contains("yes"));

    let context = harness.run(all(vec![flag(), forced()])).await;
    assert!(context.log_contains("no"), "all conditions must hold");

    let forced_run = harness.context().with_build_condition(BuildCondition::ForceBuild);
    let context = harness.run_in(all(vec![flag(), forced()]), forced_run).await;
    assert!(context.log_contains("yes"));

    let either = TaskCondition::Or {
        conditions: vec![TaskCondition::FileExists { path: "missing.flag".into() }, flag()],
    };
    let context = harness.run(all(vec![either])).await;
    assert!(context.log_contains("yes"));
}

#[tokio::test]
async fn parallel_merges_children_in_declaration_order() {
    let harness = Harness::new();
    harness.executor.push_result(ProcessResult::failure(1, "boom"));

    let root: Task = ParallelTask::new(vec![
        sequence(vec![comment("a1"), comment("a2")]),
        MsBuildTask::new("App.sln").into(),
        comment("c"),
    ])
    .into();
    let context = harness.run(sequence(vec![root, comment("after")])).await;

    let log = context.build_log();
    let line = |text: &str| log.iter().position(|l| l == text);
    let boom = log.iter().position(|l| l.contains("boom"));
    assert!(line("a1").is_some() && line("c").is_some());
    assert!(line("a1") < line("a2"));
    assert!(line("a2") < boom);
    assert!(boom < line("c"));
    assert!(context.log_contains("Parallel task completed: 2 successful, 1 failed"));
    assert_eq!(log.last().map(String::as_str), Some("after"));
    assert_eq!(context.status(), IntegrationStatus::Failure);
}

#[tokio::test]
async fn parallel_runs_every_child() {
    let harness = Harness::new();
    harness.executor.push_result(ProcessResult::success("one"));
    harness.executor.push_result(ProcessResult::success("two"));

    let builds = vec![MsBuildTask::new("A.sln").into(), NAntTask::new("b.build").into()];
    let context = harness.run(ParallelTask::new(builds).into()).await;
    assert_eq!(harness.executor.calls().len(), 2);
    assert_eq!(context.final_status(), IntegrationStatus::Success);
    assert!(context.log_contains("2 successful, 0 failed"));
}

#[test]
fn conditional_without_conditions_is_invalid() {
    let mut log = ValidationLog::new();
    let root = sequence(vec![ConditionalTask::new(Vec::new(), vec![comment("x")]).into()]);
    root.validate("project 'alpha'", "local", &[], &mut log);
    assert!(log.errors().iter().any(|e| e.contains("has no conditions")));

    let mut log = ValidationLog::new();
    let empty_or = TaskCondition::Or { conditions: Vec::new() };
    let root: Task = ConditionalTask::new(vec![empty_or], Vec::new()).into();
    root.validate("project 'alpha'", "local", &[], &mut log);
    assert!(log.has_errors());
}

#[test]
fn else_branch_tasks_are_found_by_name() {
    let mut named = NullTask::default();
    named.name = Some("Rollback".into());
    let conditional = ConditionalTask::new(
        vec![status_is(IntegrationStatus::Success)],
        vec![comment("deploy")],
    )
    .otherwise(vec![named.into()]);
    let root = sequence(vec![ParallelTask::new(vec![conditional.into()]).into()]);

    assert_eq!(root.find("rollback").map(Task::kind), Some("null"));
}
