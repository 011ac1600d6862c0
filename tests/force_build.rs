// tests/force_build.rs

mod common;
use crate::common::{FakeConnector, FakeEndpoint, FakeProcessExecutor, MockFileSystem, init_tracing};

use std::error::Error;
use std::sync::Arc;

use ccnet::config::validate::ValidationLog;
use ccnet::remote::{ForceBuildRequest, InvokeResult, RemoteResultCode};
use ccnet::task::{ExecutionContext, ForceBuildTask, Task, TaskEnvironment, run_task_tree};
use ccnet::types::IntegrationStatus;

type TestResult = Result<(), Box<dyn Error>>;

struct Harness {
    executor: FakeProcessExecutor,
    local: Arc<FakeEndpoint>,
    connector: FakeConnector,
}

impl Harness {
    fn new() -> Self {
        init_tracing();
        Self {
            executor: FakeProcessExecutor::new(),
            local: FakeEndpoint::answering(RemoteResultCode::Success),
            connector: FakeConnector::new(),
        }
    }

    async fn run(&self, task: ForceBuildTask) -> ExecutionContext {
        let env = TaskEnvironment {
            server_name: "local",
            project_name: "alpha",
            source_control: &[],
            executor: &self.executor,
            local: self.local.as_ref(),
            connector: &self.connector,
        };
        let mut context = ExecutionContext::new(
            "alpha",
            "3",
            "/work/alpha",
            "/artifacts/alpha",
            Arc::new(MockFileSystem::new()),
        );
        let root = Task::from(task);
        run_task_tree(&root, &mut context, &env).await;
        context
    }
}

#[tokio::test]
async fn local_target_goes_through_local_endpoint() -> TestResult {
    let harness = Harness::new();
    let context = harness.run(ForceBuildTask::new("other")).await;

    let invocations = harness.local.invocations();
    let (urn, arguments) = invocations.first().ok_or("local endpoint was not invoked")?;
    assert_eq!(urn, "urn:ccnet:local:other");
    assert_eq!(arguments.action, "ForceBuild");

    let data = arguments.data.as_deref().ok_or("force build carries no data")?;
    let request: ForceBuildRequest = serde_json::from_str(data)?;
    assert_eq!(request.source.as_deref(), Some("alpha"));

    assert!(context.log_contains("Force build requested for 'other'"));
    assert_eq!(context.final_status(), IntegrationStatus::Success);
    assert!(harness.connector.connects().is_empty());
    Ok(())
}

#[tokio::test]
async fn target_with_local_server_prefix_stays_local() {
    let harness = Harness::new();
    harness.run(ForceBuildTask::new("LOCAL:other")).await;

    assert_eq!(harness.local.invocations().len(), 1);
    assert!(harness.connector.connects().is_empty());
}

#[tokio::test]
async fn rejected_request_fails_the_task_with_correlation_id() {
    let harness = Harness::new();
    harness.local.push_result(InvokeResult {
        correlation_id: Some("abc-123".to_string()),
        ..InvokeResult::with_code(RemoteResultCode::FatalError)
    });

    let context = harness.run(ForceBuildTask::new("other")).await;

    assert_eq!(context.status(), IntegrationStatus::Failure);
    assert!(context.log_contains("FatalError"));
    assert!(context.log_contains("abc-123"));
}

#[tokio::test]
async fn remote_target_uses_configured_address() -> TestResult {
    let harness = Harness::new();
    let remote = FakeEndpoint::answering(RemoteResultCode::Success);
    harness.connector.register("tcp://build-2:21235", Arc::clone(&remote));

    let task = ForceBuildTask::new("build-2:downstream").at("tcp://build-2:21235");
    let context = harness.run(task).await;

    let invocations = remote.invocations();
    let (urn, _) = invocations.first().ok_or("remote endpoint was not invoked")?;
    assert_eq!(urn, "urn:ccnet:build-2:downstream");
    assert!(harness.local.invocations().is_empty());
    assert!(context.log_contains("Force build requested for 'downstream' on tcp://build-2:21235"));
    assert_eq!(context.final_status(), IntegrationStatus::Success);
    Ok(())
}

#[tokio::test]
async fn remote_target_without_address_fails() {
    let harness = Harness::new();
    let context = harness.run(ForceBuildTask::new("urn:ccnet:build-2:downstream")).await;

    assert_eq!(context.status(), IntegrationStatus::Failure);
    assert!(context.log_contains("no address configured for server 'build-2'"));
    assert!(harness.connector.connects().is_empty());
}

#[tokio::test]
async fn unreachable_remote_fails_the_task() {
    let harness = Harness::new();
    let task = ForceBuildTask::new("build-2:downstream").at("tcp://nowhere:1");

    let context = harness.run(task).await;

    assert_eq!(context.status(), IntegrationStatus::Failure);
    assert_eq!(harness.connector.connects(), ["tcp://nowhere:1"]);
    assert!(context.log_contains("failed"));
}

#[tokio::test]
async fn transport_error_mid_call_fails_the_task() {
    let harness = Harness::new();
    let remote = FakeEndpoint::answering(RemoteResultCode::Success);
    remote.push_transport_error("connection reset");
    harness.connector.register("http://build-2:8080", Arc::clone(&remote));

    let task = ForceBuildTask::new("build-2:downstream").at("http://build-2:8080");
    let context = harness.run(task).await;

    assert_eq!(context.status(), IntegrationStatus::Failure);
    assert_eq!(remote.invocations().len(), 1);
}

#[tokio::test]
async fn malformed_target_is_reported_not_raised() {
    let harness = Harness::new();
    let context = harness.run(ForceBuildTask::new("a:b:c")).await;

    assert_eq!(context.status(), IntegrationStatus::Failure);
    assert!(context.log_contains("Unable to force build"));
    assert!(harness.local.invocations().is_empty());
}

#[test]
fn validation_catches_missing_name_and_address() {
    let mut log = ValidationLog::new();
    let scope = "project 'alpha'";

    ForceBuildTask::new("  ").validate(scope, "local", &mut log);
    ForceBuildTask::new("build-2:downstream").validate(scope, "local", &mut log);
    ForceBuildTask::new("build-2:downstream")
        .at("tcp://build-2:21235")
        .validate(scope, "local", &mut log);
    ForceBuildTask::new("other").validate(scope, "local", &mut log);

    let errors = log.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("requires a project name"));
    assert!(errors[1].contains("no server_address is set"));
}
