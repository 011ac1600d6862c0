// src/exec/backend.rs

//! Pluggable process executor abstraction.
//!
//! Build-tool and source-control tasks talk to a [`ProcessExecutor`] instead
//! of spawning processes themselves. Production code uses
//! [`TokioProcessExecutor`](super::command::TokioProcessExecutor); tests
//! provide an implementation that records the command lines and returns
//! scripted results.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ProcessError;
use crate::types::BoxFuture;

/// Default time a process may run before it is killed.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(120);

/// Everything needed to launch one external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub executable: String,
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub timeout: Duration,
    /// Exit codes treated as success.
    pub success_exit_codes: Vec<i32>,
}

impl ProcessInfo {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            arguments: Vec::new(),
            working_directory: None,
            timeout: DEFAULT_PROCESS_TIMEOUT,
            success_exit_codes: vec![0],
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command line as it would be typed in a shell (for build logs).
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.as_str())
            .chain(self.arguments.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_success_code(&self, code: i32) -> bool {
        self.success_exit_codes.contains(&code)
    }
}

/// What a finished (or timed out) process reported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessResult {
    pub succeeded: bool,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Combined stdout and stderr.
    pub output: String,
}

impl ProcessResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            exit_code: Some(0),
            timed_out: false,
            output: output.into(),
        }
    }

    pub fn failure(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            exit_code: Some(exit_code),
            timed_out: false,
            output: output.into(),
        }
    }

    pub fn timed_out(output: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            exit_code: None,
            timed_out: true,
            output: output.into(),
        }
    }
}

/// Trait abstracting how external processes are run.
pub trait ProcessExecutor: Send + Sync {
    fn execute(&self, info: ProcessInfo) -> BoxFuture<'_, Result<ProcessResult, ProcessError>>;
}
