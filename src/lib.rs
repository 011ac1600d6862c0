// src/lib.rs

pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod remote;
pub mod state;
pub mod task;
pub mod trigger;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cli::{CliArgs, Command, ServeArgs};
use crate::clock::SystemClock;
use crate::config::{LoadedConfig, build_server, load_and_validate};
use crate::exec::TokioProcessExecutor;
use crate::fs::RealFileSystem;
use crate::remote::{
    DEFAULT_REMOTE_TIMEOUT, DefaultConnector, InvokeArguments, QueryArguments, RemoteEndpoint,
    ServerConnection, serve_http, serve_tcp,
};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command() {
        Command::Serve(serve) => run_server(serve).await,
        Command::Ping { address } => {
            let connection = ServerConnection::open(&address, DEFAULT_REMOTE_TIMEOUT)?;
            if connection.ping().await {
                println!("{address} is alive");
                Ok(())
            } else {
                bail!("{address} did not answer");
            }
        }
        Command::Invoke {
            address,
            urn,
            action,
            data,
        } => {
            let connection = ServerConnection::open(&address, DEFAULT_REMOTE_TIMEOUT)?;
            let mut arguments = InvokeArguments::new(action);
            if let Some(data) = data {
                arguments = arguments.with_data(data);
            }
            let result = connection.invoke(&urn, arguments).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_success() {
                bail!("invoke failed: {}", result.result_code);
            }
            Ok(())
        }
        Command::Query {
            address,
            urn,
            filter,
            scope,
        } => {
            let connection = ServerConnection::open(&address, DEFAULT_REMOTE_TIMEOUT)?;
            let arguments = QueryArguments {
                filter_pattern: filter,
                data_scope: scope,
            };
            let result = connection.query(&urn, arguments).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

async fn run_server(args: ServeArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let loaded = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&loaded);
        return Ok(());
    }

    let server = build_server(
        &loaded,
        Arc::new(SystemClock),
        Arc::new(RealFileSystem),
        Arc::new(TokioProcessExecutor::new()),
        Arc::new(DefaultConnector::new(loaded.config.server.remote_timeout)),
    )?;

    let mut endpoints: Vec<JoinHandle<()>> = Vec::new();
    if let Some(addr) = &loaded.config.server.http_listen {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding http endpoint on {addr}"))?;
        let invoker = server.invoker();
        endpoints.push(tokio::spawn(async move {
            if let Err(err) = serve_http(listener, invoker).await {
                error!(error = %format!("{err:#}"), "http endpoint stopped");
            }
        }));
    }
    if let Some(addr) = &loaded.config.server.tcp_listen {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding socket endpoint on {addr}"))?;
        let invoker = server.invoker();
        endpoints.push(tokio::spawn(async move {
            if let Err(err) = serve_tcp(listener, invoker).await {
                error!(error = %format!("{err:#}"), "socket endpoint stopped");
            }
        }));
    }

    server.start_all()?;
    info!(server = %server.name(), projects = server.projects().len(), "ccnet server started");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("shutdown requested");

    for endpoint in endpoints {
        endpoint.abort();
    }
    server.shutdown().await;
    info!("ccnet server exiting");
    Ok(())
}

/// Simple dry-run output: print the server, its projects, triggers and tasks.
fn print_dry_run(loaded: &LoadedConfig) {
    let server = &loaded.config.server;
    println!("ccnet dry-run");
    println!("  server.name = {}", server.name);
    println!("  server.state_dir = {:?}", loaded.state_dir());
    println!("  server.poll_interval = {:?}", server.poll_interval);
    if let Some(addr) = &server.http_listen {
        println!("  server.http_listen = {addr}");
    }
    if let Some(addr) = &server.tcp_listen {
        println!("  server.tcp_listen = {addr}");
    }
    println!();

    println!("projects ({}):", loaded.config.projects.len());
    for project in &loaded.config.projects {
        println!("  - {}", project.name);
        println!(
            "      working_directory: {:?}",
            loaded.resolve(&project.working_directory())
        );
        println!(
            "      artifact_directory: {:?}",
            loaded.resolve(&project.artifact_directory())
        );
        match &project.trigger {
            Some(trigger) => println!("      trigger: {}", trigger.name()),
            None => println!("      trigger: (force only)"),
        }
        for block in &project.source_control {
            println!("      source_control: {} -> {}", block.name, block.repository);
        }
        for task in &project.tasks {
            println!("      task: {} ({})", task.display_name(), task.kind());
        }
    }
    for warning in &loaded.warnings {
        println!("warning: {warning}");
    }

    debug!("dry-run complete (no execution)");
}
