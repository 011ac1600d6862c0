// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the project registry entry ([`Project`]) with its trigger and lifecycle
//! - the [`Server`] owning projects, shared collaborators and state stores
//! - the per-project scheduling loop

pub mod project;
pub mod project_loop;
pub mod server;

pub use project::Project;
pub use project_loop::run_project_loop;
pub use server::{DEFAULT_POLL_INTERVAL, Integration, Located, Server, ServerServices};
