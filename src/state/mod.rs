// src/state/mod.rs

//! Persistence of project state across server restarts.
//!
//! - [`integration`]: last integration result, one file per project.
//! - [`run_state`]: which projects an operator stopped, one file per server.
//!
//! Both write through [`crate::fs::FileSystem::atomic_save`].

pub mod integration;
pub mod run_state;

pub use integration::{IntegrationResult, IntegrationStateStore, state_file_name};
pub use run_state::{RUN_STATE_FILE, RunStateStore};
