// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::DataScope;

/// Command-line arguments for `ccnet`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ccnet",
    version,
    about = "Continuous-integration server: triggers, task pipelines and remote force builds.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, the `CCNET_LOG` filter directive or `info` is used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// The subcommand to run; `serve` with defaults when none was given.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Serve(ServeArgs::default()))
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run every startable project and the configured remote endpoints.
    Serve(ServeArgs),

    /// Check whether a server answers.
    Ping {
        /// `http://host:port` or `tcp://host:port`.
        address: String,
    },

    /// Invoke an action on a remote entity.
    Invoke {
        address: String,
        /// e.g. `urn:ccnet:build-1:alpha`
        urn: String,
        action: String,
        /// JSON input for the action.
        #[arg(long)]
        data: Option<String>,
    },

    /// List the actions available on a remote entity.
    Query {
        address: String,
        urn: String,
        /// Regular expression matched against action names.
        #[arg(long)]
        filter: Option<String>,
        #[arg(long, value_name = "SCOPE", default_value = "both", value_parser = parse_scope)]
        scope: DataScope,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "ccnet.toml")]
    pub config: String,

    /// Parse + validate and print the configuration, but start nothing.
    #[arg(long)]
    pub dry_run: bool,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            config: "ccnet.toml".to_string(),
            dry_run: false,
        }
    }
}

fn parse_scope(s: &str) -> Result<DataScope, String> {
    s.parse()
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
