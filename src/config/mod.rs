// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and build a server from it (`loader.rs`).
//! - Collect every configuration problem before anything starts (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{LoadedConfig, build_server, load_and_validate, load_from_path, parse_config};
pub use model::{ConfigFile, ProjectConfig, ServerSection};
pub use validate::{ValidationLog, validate_config};
