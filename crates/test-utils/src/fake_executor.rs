use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ccnet::errors::ProcessError;
use ccnet::exec::{ProcessExecutor, ProcessInfo, ProcessResult};
use ccnet::types::BoxFuture;

enum Scripted {
    Result(ProcessResult),
    SpawnError,
}

/// A fake executor that:
/// - records every `ProcessInfo` it is asked to run
/// - answers with scripted results in order, then with a plain success.
#[derive(Clone, Default)]
pub struct FakeProcessExecutor {
    calls: Arc<Mutex<Vec<ProcessInfo>>>,
    script: Arc<Mutex<VecDeque<Scripted>>>,
}

impl FakeProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, result: ProcessResult) -> &Self {
        self.script.lock().unwrap().push_back(Scripted::Result(result));
        self
    }

    /// The next call fails as if the executable could not be started.
    pub fn push_spawn_error(&self) -> &Self {
        self.script.lock().unwrap().push_back(Scripted::SpawnError);
        self
    }

    pub fn calls(&self) -> Vec<ProcessInfo> {
        self.calls.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ProcessInfo::command_line).collect()
    }
}

impl ProcessExecutor for FakeProcessExecutor {
    fn execute(&self, info: ProcessInfo) -> BoxFuture<'_, Result<ProcessResult, ProcessError>> {
        let executable = info.executable.clone();
        self.calls.lock().unwrap().push(info);
        let next = self.script.lock().unwrap().pop_front();

        Box::pin(async move {
            match next {
                Some(Scripted::Result(result)) => Ok(result),
                Some(Scripted::SpawnError) => Err(ProcessError::Spawn {
                    executable,
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted spawn failure"),
                }),
                None => Ok(ProcessResult::success("")),
            }
        })
    }
}
