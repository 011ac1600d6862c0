// src/exec/command.rs

//! Real process executor built on `tokio::process`.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{ProcessExecutor, ProcessInfo, ProcessResult};
use crate::errors::ProcessError;
use crate::types::BoxFuture;

/// How long output pipes are drained after the process itself is gone.
/// Anything it forked that still holds them open is cut off after this.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Spawns each [`ProcessInfo`] as a child process, captures its output and
/// kills it, together with everything it started, once the timeout elapses.
///
/// On Unix every process runs as the leader of its own process group so a
/// timeout can take down forked workers as well.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessExecutor;

impl TokioProcessExecutor {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, info: ProcessInfo) -> Result<ProcessResult, ProcessError> {
        info!(
            executable = %info.executable,
            args = ?info.arguments,
            cwd = ?info.working_directory,
            timeout_ms = info.timeout.as_millis() as u64,
            "starting process"
        );

        let mut cmd = Command::new(&info.executable);
        cmd.args(&info.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &info.working_directory {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            executable: info.executable.clone(),
            source,
        })?;

        // Drain both pipes concurrently so the child never blocks on a full buffer.
        let stdout = tokio::spawn(drain(child.stdout.take()));
        let stderr = tokio::spawn(drain(child.stderr.take()));

        let waited = tokio::time::timeout(info.timeout, child.wait()).await;

        let status = match waited {
            Ok(status) => Some(status.map_err(|source| ProcessError::Wait {
                executable: info.executable.clone(),
                source,
            })?),
            Err(_) => {
                warn!(executable = %info.executable, "process timed out; killing");
                kill_tree(&mut child, &info.executable).await;
                None
            }
        };

        let mut output = collect(stdout, &info.executable).await;
        let err_output = collect(stderr, &info.executable).await;
        if !err_output.is_empty() {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&err_output);
        }

        let result = match status {
            None => ProcessResult::timed_out(output),
            Some(status) => {
                let code = status.code().unwrap_or(-1);
                ProcessResult {
                    succeeded: info.is_success_code(code),
                    exit_code: Some(code),
                    timed_out: false,
                    output,
                }
            }
        };

        debug!(
            executable = %info.executable,
            exit_code = ?result.exit_code,
            succeeded = result.succeeded,
            timed_out = result.timed_out,
            "process finished"
        );
        Ok(result)
    }
}

impl ProcessExecutor for TokioProcessExecutor {
    fn execute(&self, info: ProcessInfo) -> BoxFuture<'_, Result<ProcessResult, ProcessError>> {
        Box::pin(self.run(info))
    }
}

/// Kill the process group led by `child`, then the child itself.
async fn kill_tree(child: &mut Child, executable: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!(executable = %executable, error = %e, "failed to kill process group");
        }
    }
    if let Err(e) = child.kill().await {
        warn!(executable = %executable, error = %e, "failed to kill timed out process");
    }
}

async fn collect(handle: JoinHandle<String>, executable: &str) -> String {
    let abort = handle.abort_handle();
    match tokio::time::timeout(DRAIN_GRACE, handle).await {
        Ok(output) => output.unwrap_or_default(),
        Err(_) => {
            warn!(executable = %executable, "output still open after exit; abandoning it");
            abort.abort();
            String::new()
        }
    }
}

async fn drain<R>(pipe: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!(error = %e, "failed reading process output");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
