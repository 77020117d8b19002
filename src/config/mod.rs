// ABOUTME: Configuration management for agentgrid
// Handles the config file search path, environment overrides and per-section defaults

use crate::models::{AgentKind, GridLayout, TerminalGeometry};
use crate::terminal::SettleDelays;
use crate::usage::ContextWindows;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const ENV_SERVER: &str = "AGENTGRID_SERVER";
pub const ENV_CWD: &str = "AGENTGRID_CWD";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub terminal: TerminalConfig,

    /// Commands the local transport spawns
    #[serde(default)]
    pub agents: AgentCommands,

    #[serde(default)]
    pub usage: UsageConfig,

    #[serde(default)]
    pub changes: ChangesConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Agents run in PTYs spawned by this process
    #[default]
    Local,
    /// Agents run behind the terminal server
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub mode: TransportMode,

    /// Base URL of the terminal server (remote mode)
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Timeout for diff and usage requests in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::default(),
            server_url: default_server_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl TransportConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Working directory new slots start in (defaults to the current directory)
    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    /// Root watched for file changes (defaults to the working directory)
    #[serde(default)]
    pub repo_root: Option<PathBuf>,
}

impl WorkspaceConfig {
    pub fn resolved_working_directory(&self) -> PathBuf {
        self.working_directory
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn resolved_repo_root(&self) -> PathBuf {
        self.repo_root
            .clone()
            .unwrap_or_else(|| self.resolved_working_directory())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Emulator scrollback in lines
    #[serde(default = "default_scrollback")]
    pub scrollback: usize,

    #[serde(default = "default_settle_short_ms")]
    pub settle_short_ms: u64,

    #[serde(default = "default_settle_long_ms")]
    pub settle_long_ms: u64,

    /// Geometry used before a slot's container has been measured
    #[serde(default = "default_cols")]
    pub default_cols: u16,

    #[serde(default = "default_rows")]
    pub default_rows: u16,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            scrollback: default_scrollback(),
            settle_short_ms: default_settle_short_ms(),
            settle_long_ms: default_settle_long_ms(),
            default_cols: default_cols(),
            default_rows: default_rows(),
        }
    }
}

impl TerminalConfig {
    pub fn settle_delays(&self) -> SettleDelays {
        SettleDelays {
            short: Duration::from_millis(self.settle_short_ms),
            long: Duration::from_millis(self.settle_long_ms),
        }
    }

    pub fn default_geometry(&self) -> TerminalGeometry {
        TerminalGeometry::new(self.default_cols, self.default_rows).unwrap_or_default()
    }
}

/// How to start one agent CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCommand {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Extra arguments added in yolo mode
    #[serde(default)]
    pub yolo_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCommands {
    /// Shell for slots without an agent (defaults to $SHELL)
    #[serde(default)]
    pub shell: Option<String>,

    #[serde(default = "default_claude_command")]
    pub claude: AgentCommand,

    #[serde(default = "default_codex_command")]
    pub codex: AgentCommand,
}

impl Default for AgentCommands {
    fn default() -> Self {
        Self {
            shell: None,
            claude: default_claude_command(),
            codex: default_codex_command(),
        }
    }
}

impl AgentCommands {
    /// Program and arguments for `agent`
    pub fn command_for(&self, agent: AgentKind, yolo: bool) -> (String, Vec<String>) {
        let command = match agent {
            AgentKind::Claude => &self.claude,
            AgentKind::Codex => &self.codex,
            AgentKind::None => {
                let shell = self
                    .shell
                    .clone()
                    .or_else(|| std::env::var("SHELL").ok())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "/bin/sh".to_string());
                return (shell, Vec::new());
            }
        };
        let mut args = command.args.clone();
        if yolo {
            args.extend(command.yolo_args.iter().cloned());
        }
        (command.program.clone(), args)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Poll the usage service (remote mode only)
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Resolution of the usage bar
    #[serde(default = "default_bar_cells")]
    pub bar_cells: usize,

    #[serde(default = "default_standard_window")]
    pub standard_window: u64,

    #[serde(default = "default_large_window")]
    pub large_window: u64,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            poll_interval_secs: default_poll_interval_secs(),
            bar_cells: default_bar_cells(),
            standard_window: default_standard_window(),
            large_window: default_large_window(),
        }
    }
}

impl UsageConfig {
    pub fn windows(&self) -> ContextWindows {
        ContextWindows {
            standard: self.standard_window,
            large: self.large_window,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangesConfig {
    /// Entries kept per slot
    #[serde(default = "default_changes_capacity")]
    pub capacity: usize,

    /// Path fragments the local watcher skips (`.git` is always skipped)
    #[serde(default = "default_ignore_fragments")]
    pub ignore: Vec<String>,
}

impl Default for ChangesConfig {
    fn default() -> Self {
        Self {
            capacity: default_changes_capacity(),
            ignore: default_ignore_fragments(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub default_layout: GridLayout,

    #[serde(default)]
    pub changes_panel_open: bool,

    /// Input poll interval in milliseconds
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_layout: GridLayout::default(),
            changes_panel_open: false,
            tick_rate_ms: default_tick_rate_ms(),
        }
    }
}

fn default_server_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_scrollback() -> usize {
    2000
}

fn default_settle_short_ms() -> u64 {
    50
}

fn default_settle_long_ms() -> u64 {
    300
}

fn default_cols() -> u16 {
    80
}

fn default_rows() -> u16 {
    24
}

fn default_claude_command() -> AgentCommand {
    AgentCommand {
        program: "claude".to_string(),
        args: Vec::new(),
        yolo_args: vec!["--dangerously-skip-permissions".to_string()],
    }
}

fn default_codex_command() -> AgentCommand {
    AgentCommand {
        program: "codex".to_string(),
        args: Vec::new(),
        yolo_args: vec!["--dangerously-bypass-approvals-and-sandbox".to_string()],
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_bar_cells() -> usize {
    100
}

fn default_standard_window() -> u64 {
    200_000
}

fn default_large_window() -> u64 {
    1_000_000
}

fn default_changes_capacity() -> usize {
    8
}

fn default_ignore_fragments() -> Vec<String> {
    vec!["node_modules/".to_string(), "target/".to_string()]
}

fn default_tick_rate_ms() -> u64 {
    50
}

impl AppConfig {
    /// Load the first config file found on the search path, then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::get_config_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load_from(&path)?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Configuration file paths in order of precedence
    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        // 1. Local project config
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(".agentgrid").join("config.toml"));
        }

        // 2. User config (~/.agentgrid/config/config.toml)
        if let Ok(config_dir) = Self::get_user_config_dir() {
            paths.push(config_dir.join("config.toml"));
        }

        // 3. System config
        paths.push(PathBuf::from("/etc/agentgrid/config.toml"));

        paths
    }

    fn get_user_config_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home_dir.join(".agentgrid").join("config"))
    }

    /// Apply `AGENTGRID_*` overrides. Setting a server switches to remote mode.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(server) = lookup(ENV_SERVER).filter(|s| !s.is_empty()) {
            self.transport.server_url = server;
            self.transport.mode = TransportMode::Remote;
        }
        if let Some(cwd) = lookup(ENV_CWD).filter(|s| !s.is_empty()) {
            self.workspace.working_directory = Some(PathBuf::from(cwd));
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
