#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ccnet::clock::FakeClock;
use ccnet::engine::{Project, Server, ServerServices};
use ccnet::fs::FileSystem;
use ccnet::fs::mock::MockFileSystem;
use ccnet::state::{IntegrationStateStore, RunStateStore};
use ccnet::task::{SourceControlBlock, Task};
use ccnet::trigger::Trigger;

use crate::fake_executor::FakeProcessExecutor;
use crate::fake_remote::FakeConnector;

/// Builder for `Project` to simplify test setup.
pub struct ProjectBuilder {
    name: String,
    working_directory: PathBuf,
    artifact_directory: PathBuf,
    trigger: Option<Trigger>,
    source_control: Vec<SourceControlBlock>,
    tasks: Vec<Task>,
}

impl ProjectBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            working_directory: PathBuf::from("/work").join(name),
            artifact_directory: PathBuf::from("/artifacts").join(name),
            trigger: None,
            source_control: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn trigger(mut self, trigger: impl Into<Trigger>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    pub fn task(mut self, task: impl Into<Task>) -> Self {
        self.tasks.push(task.into());
        self
    }

    pub fn source_control(mut self, block: SourceControlBlock) -> Self {
        self.source_control.push(block);
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }

    pub fn artifact_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_directory = dir.into();
        self
    }

    pub fn build(self) -> Project {
        Project::with_tasks(
            self.name,
            self.working_directory,
            self.artifact_directory,
            self.trigger,
            self.source_control,
            self.tasks,
        )
    }
}

/// A server wired to fakes, with handles to every fake for assertions.
pub struct TestServer {
    pub server: Arc<Server>,
    pub clock: FakeClock,
    pub fs: MockFileSystem,
    pub executor: FakeProcessExecutor,
    pub connector: FakeConnector,
    pub state_dir: PathBuf,
}

/// Builder for a `Server` running against a fake clock, an in-memory file
/// system, a scripted executor and a scripted connector.
pub struct ServerBuilder {
    name: String,
    projects: Vec<Project>,
    clock: FakeClock,
    fs: MockFileSystem,
    file_system: Option<Arc<dyn FileSystem>>,
    executor: FakeProcessExecutor,
    connector: FakeConnector,
    state_dir: PathBuf,
    poll_interval: Duration,
}

impl ServerBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            projects: Vec::new(),
            clock: FakeClock::at_epoch(),
            fs: MockFileSystem::new(),
            file_system: None,
            executor: FakeProcessExecutor::new(),
            connector: FakeConnector::new(),
            state_dir: PathBuf::from("/state"),
            poll_interval: Duration::from_millis(10),
        }
    }

    pub fn project(mut self, project: ProjectBuilder) -> Self {
        self.projects.push(project.build());
        self
    }

    pub fn clock(mut self, clock: FakeClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn mock_fs(mut self, fs: MockFileSystem) -> Self {
        self.fs = fs;
        self
    }

    /// Use a real file system (for example rooted in a temp dir) instead of
    /// the in-memory one.
    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn executor(mut self, executor: FakeProcessExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn connector(mut self, connector: FakeConnector) -> Self {
        self.connector = connector;
        self
    }

    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn build(self) -> TestServer {
        let fs: Arc<dyn FileSystem> = self
            .file_system
            .unwrap_or_else(|| Arc::new(self.fs.clone()));

        let services = ServerServices {
            clock: Arc::new(self.clock.clone()),
            results: IntegrationStateStore::new(&self.state_dir, Arc::clone(&fs)),
            run_state: Arc::new(RunStateStore::new(&self.state_dir, Arc::clone(&fs))),
            fs,
            executor: Arc::new(self.executor.clone()),
            connector: Arc::new(self.connector.clone()),
            poll_interval: self.poll_interval,
        };

        let server = Server::new(self.name, self.projects, services)
            .expect("Failed to build server from builder");

        TestServer {
            server,
            clock: self.clock,
            fs: self.fs,
            executor: self.executor,
            connector: self.connector,
            state_dir: self.state_dir,
        }
    }
}
