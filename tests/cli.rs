// tests/cli.rs

use clap::Parser;

use ccnet::cli::{CliArgs, Command, LogLevel};
use ccnet::types::DataScope;

#[test]
fn no_subcommand_means_serve_with_defaults() {
    let args = CliArgs::parse_from(["ccnet"]);
    match args.command() {
        Command::Serve(serve) => {
            assert_eq!(serve.config, "ccnet.toml");
            assert!(!serve.dry_run);
        }
        other => panic!("expected serve, got {other:?}"),
    }
}

#[test]
fn serve_accepts_config_and_dry_run() {
    let args = CliArgs::parse_from([
        "ccnet",
        "--log-level",
        "debug",
        "serve",
        "--config",
        "ci/ccnet.toml",
        "--dry-run",
    ]);
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    match args.command() {
        Command::Serve(serve) => {
            assert_eq!(serve.config, "ci/ccnet.toml");
            assert!(serve.dry_run);
        }
        other => panic!("expected serve, got {other:?}"),
    }
}

#[test]
fn invoke_takes_address_urn_action_and_data() {
    let args = CliArgs::parse_from([
        "ccnet",
        "invoke",
        "tcp://build-2:21235",
        "urn:ccnet:build-2:alpha",
        "ForceBuild",
        "--data",
        r#"{"source":"me"}"#,
    ]);
    match args.command() {
        Command::Invoke {
            address,
            urn,
            action,
            data,
        } => {
            assert_eq!(address, "tcp://build-2:21235");
            assert_eq!(urn, "urn:ccnet:build-2:alpha");
            assert_eq!(action, "ForceBuild");
            assert_eq!(data.as_deref(), Some(r#"{"source":"me"}"#));
        }
        other => panic!("expected invoke, got {other:?}"),
    }
}

#[test]
fn query_scope_parses_and_defaults() {
    let args = CliArgs::parse_from(["ccnet", "query", "http://h:1", "urn:ccnet:h"]);
    assert!(matches!(
        args.command(),
        Command::Query { scope: DataScope::Both, filter: None, .. }
    ));

    let args = CliArgs::parse_from([
        "ccnet",
        "query",
        "http://h:1",
        "urn:ccnet:h",
        "--scope",
        "input-only",
        "--filter",
        "^Force",
    ]);
    assert!(matches!(
        args.command(),
        Command::Query { scope: DataScope::InputOnly, .. }
    ));

    assert!(CliArgs::try_parse_from(["ccnet", "query", "a", "b", "--scope", "sideways"]).is_err());
}

#[test]
fn ping_requires_an_address() {
    assert!(CliArgs::try_parse_from(["ccnet", "ping"]).is_err());
    let args = CliArgs::parse_from(["ccnet", "ping", "http://h:8080"]);
    assert!(matches!(args.command(), Command::Ping { ref address } if address == "http://h:8080"));
}
