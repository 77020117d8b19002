// ABOUTME: Behavioral tests for configuration resolution through the CLI
// Verifies the --config file is used and overrides stack env first, flags last

use agentgrid::cli::Cli;
use agentgrid::config::{AppConfig, TransportMode, ENV_CWD, ENV_SERVER};
use agentgrid::models::GridLayout;
use clap::Parser;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_explicit_config_file_then_layout_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deck.toml");
    std::fs::write(
        &path,
        r#"
[ui]
default_layout = "6"
changes_panel_open = true

[changes]
capacity = 12
"#,
    )
    .unwrap();

    let cli = Cli::parse_from([
        "agentgrid",
        "--config",
        path.to_str().unwrap(),
        "--layout",
        "8",
    ]);
    let config = cli.resolve_config().unwrap();
    assert_eq!(config.ui.default_layout, GridLayout::Grid4x2);
    assert!(config.ui.changes_panel_open);
    assert_eq!(config.changes.capacity, 12);
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let cli = Cli::parse_from(["agentgrid", "--config", "/nonexistent/agentgrid.toml"]);
    assert!(cli.resolve_config().is_err());
}

#[test]
fn test_env_then_flags_override() {
    let mut config = AppConfig::default();
    config.apply_env(|key| match key {
        k if k == ENV_SERVER => Some("http://agents.local:3001".to_string()),
        k if k == ENV_CWD => Some("/from/env".to_string()),
        _ => None,
    });
    assert_eq!(config.transport.mode, TransportMode::Remote);
    assert_eq!(config.transport.server_url, "http://agents.local:3001");

    let cli = Cli::parse_from(["agentgrid", "--cwd", "/from/flag", "--layout", "2"]);
    cli.apply_overrides(&mut config);
    assert_eq!(
        config.workspace.working_directory,
        Some(PathBuf::from("/from/flag"))
    );
    assert_eq!(config.ui.default_layout, GridLayout::Pair);
    assert_eq!(config.transport.server_url, "http://agents.local:3001");
}
