// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the [`ProcessExecutor`] seam and its value types.
//! - [`command`] runs processes for real with `tokio::process::Command`.

pub mod backend;
pub mod command;

pub use backend::{DEFAULT_PROCESS_TIMEOUT, ProcessExecutor, ProcessInfo, ProcessResult};
pub use command::TokioProcessExecutor;
