//! Configuration for the `QuickTasks` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/quicktasks/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use quicktasks_proto::task::Priority;

use crate::timer::{DEFAULT_RECONCILE_EVERY_SECS, TimerSettings};
use crate::view::{DEFAULT_RECENT_LIMIT, GroupBy};
use crate::workspace::WorkspaceOptions;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    session: SessionFileConfig,
    sync: SyncFileConfig,
    timer: TimerFileConfig,
    view: ViewFileConfig,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    owner_id: Option<String>,
    display_name: Option<String>,
}

/// `[sync]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SyncFileConfig {
    feed_buffer: Option<usize>,
}

/// `[timer]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct TimerFileConfig {
    tick_interval_ms: Option<u64>,
    reconcile_every_secs: Option<u64>,
}

/// `[view]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ViewFileConfig {
    recent_limit: Option<usize>,
    due_soon_days: Option<i64>,
    max_task_title_len: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Session --
    /// Owner to sign in as.
    pub owner_id: String,
    /// Display name of the owner.
    pub display_name: Option<String>,

    // -- Sync --
    /// Capacity of the change feed channel.
    pub feed_buffer: usize,

    // -- Timer --
    /// Interval between timer ticks.
    pub tick_interval: Duration,
    /// Seconds between reconciliation writes.
    pub reconcile_every_secs: u64,

    // -- View --
    /// Entries in the activity feed.
    pub recent_limit: usize,
    /// Days ahead a due date counts as "due soon".
    pub due_soon_days: i64,
    /// Maximum task title length in characters.
    pub max_task_title_len: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            owner_id: "demo".to_string(),
            display_name: None,
            feed_buffer: 64,
            tick_interval: Duration::from_secs(1),
            reconcile_every_secs: DEFAULT_RECONCILE_EVERY_SECS,
            recent_limit: DEFAULT_RECENT_LIMIT,
            due_soon_days: 1,
            max_task_title_len: quicktasks_proto::task::MAX_TASK_TITLE_LENGTH,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Otherwise the default path is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a config file exists but cannot be read
    /// or parsed, or if an explicit `--config` file is missing.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            owner_id: cli
                .owner
                .clone()
                .or_else(|| file.session.owner_id.clone())
                .unwrap_or(defaults.owner_id),
            display_name: cli
                .display_name
                .clone()
                .or_else(|| file.session.display_name.clone()),
            feed_buffer: file
                .sync
                .feed_buffer
                .filter(|&n| n > 0)
                .unwrap_or(defaults.feed_buffer),
            tick_interval: file
                .timer
                .tick_interval_ms
                .filter(|&ms| ms > 0)
                .map_or(defaults.tick_interval, Duration::from_millis),
            reconcile_every_secs: file
                .timer
                .reconcile_every_secs
                .filter(|&s| s > 0)
                .unwrap_or(defaults.reconcile_every_secs),
            recent_limit: file.view.recent_limit.unwrap_or(defaults.recent_limit),
            due_soon_days: file.view.due_soon_days.unwrap_or(defaults.due_soon_days),
            max_task_title_len: file
                .view
                .max_task_title_len
                .unwrap_or(defaults.max_task_title_len),
        }
    }

    /// Workspace tunables from this configuration.
    #[must_use]
    pub const fn workspace_options(&self) -> WorkspaceOptions {
        WorkspaceOptions {
            recent_limit: self.recent_limit,
            due_soon_days: self.due_soon_days,
            max_task_title_len: self.max_task_title_len,
            timer: TimerSettings {
                tick: self.tick_interval,
                reconcile_every_secs: self.reconcile_every_secs,
            },
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Personal task tracker with a live-synced local mirror")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/quicktasks/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Owner id to sign in as.
    #[arg(long, env = "QUICKTASKS_OWNER")]
    pub owner: Option<String>,

    /// Display name for the signed-in owner.
    #[arg(long)]
    pub display_name: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "QUICKTASKS_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/quicktasks.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Only show tasks in this domain.
    #[arg(long)]
    pub domain: Option<String>,

    /// Only show tasks with this priority (Low, Mid, High).
    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<Priority>,

    /// Only show tasks carrying this tag name. Repeatable.
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Case-insensitive search over title and description.
    #[arg(long)]
    pub search: Option<String>,

    /// Board grouping: status, priority or domain.
    #[arg(long)]
    pub group_by: Option<GroupBy>,
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::ALL
        .into_iter()
        .find(|p| p.as_str().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| format!("unknown priority `{value}`, expected Low, Mid or High"))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("quicktasks").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
