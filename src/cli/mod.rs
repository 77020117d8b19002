// ABOUTME: CLI argument parsing and config resolution for agentgrid
//
// - No command or `tui`: launch the dashboard
// - `config`: print the resolved configuration

use crate::config::{AppConfig, TransportMode};
use crate::models::GridLayout;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Supervise several AI coding agents side by side
#[derive(Parser, Debug)]
#[command(name = "agentgrid")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Session server URL; switches to the remote transport
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Working directory for new slots
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Initial layout (1, 2, 3, 4, 2x2, 6 or 8)
    #[arg(long, global = true)]
    pub layout: Option<GridLayout>,

    /// Read configuration from this file instead of the search path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Output format for `config`
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Toml,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the dashboard (default if no command given)
    Tui,

    /// Print the resolved configuration
    Config {
        #[arg(long, default_value = "toml")]
        format: OutputFormat,
    },
}

impl Cli {
    /// Load configuration and apply environment then flag overrides
    pub fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = AppConfig::load_from(path)?;
                config.apply_env(|key| std::env::var(key).ok());
                config
            }
            None => AppConfig::load()?,
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(server) = &self.server {
            config.transport.server_url = server.clone();
            config.transport.mode = TransportMode::Remote;
        }
        if let Some(cwd) = &self.cwd {
            config.workspace.working_directory = Some(cwd.clone());
        }
        if let Some(layout) = self.layout {
            config.ui.default_layout = layout;
        }
    }
}

pub fn print_config(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Toml => config.to_toml()?,
        OutputFormat::Json => {
            serde_json::to_string_pretty(config).context("Failed to serialize config")?
        }
    };
    println!("{}", rendered);
    Ok(())
}
