//! Configuration system for the sheet service.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskdesk-sheet/config.toml`)
//! 4. Compiled defaults
//!
//! The service can also load a seed workbook — a TOML file with
//! `[[employees]]` and `[[tasks]]` tables standing in for the spreadsheet's
//! existing contents.

use std::path::{Path, PathBuf};

use taskdesk_proto::employee::{Employee, Role};
use taskdesk_proto::task::{SENTINEL_PRIORITY, TaskDraft, TaskStatus, split_responsible};

/// Errors that can occur when loading service configuration or seed data.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a configuration or seed file.
    #[error("failed to read {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse TOML content.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure for the service.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SheetConfigFile {
    server: ServerFileConfig,
}

/// `[server]` section of the service config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    seed: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the sheet service.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Taskdesk sheet service")]
pub struct SheetCliArgs {
    /// Address to bind the service to.
    #[arg(short, long, env = "SHEET_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/taskdesk-sheet/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to a seed workbook (TOML with employees and tasks).
    #[arg(long)]
    pub seed: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "SHEET_LOG")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved sheet service configuration.
#[derive(Debug, Clone)]
pub struct SheetConfig {
    /// Address to bind the server to (e.g., `0.0.0.0:9100`).
    pub bind_addr: String,
    /// Seed workbook path, if any.
    pub seed_path: Option<PathBuf>,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9100".to_string(),
            seed_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl SheetConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly given config file cannot be
    /// read or parsed.
    pub fn load(cli: &SheetCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `SheetConfig` from CLI args and a parsed config file.
    #[must_use]
    fn resolve(cli: &SheetCliArgs, file: &SheetConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            seed_path: cli.seed.clone().or_else(|| file.server.seed.clone()),
            log_level: cli.log_level.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Seed workbook
// ---------------------------------------------------------------------------

/// A seed workbook: the spreadsheet's initial contents.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct Workbook {
    /// Employee directory rows.
    pub employees: Vec<EmployeeRow>,
    /// Task rows.
    pub tasks: Vec<TaskRow>,
}

/// One `[[employees]]` table of the workbook.
#[derive(Debug, serde::Deserialize)]
pub struct EmployeeRow {
    /// Stable external chat identity.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Role (`owner`, `admin`, or `user`).
    pub role: Role,
    /// Optional phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

/// One `[[tasks]]` table of the workbook.
///
/// `responsible` uses the spreadsheet's comma-joined form. Priorities are
/// taken as written; workbook authors are expected to keep each status
/// group densely numbered from 1.
#[derive(Debug, serde::Deserialize)]
pub struct TaskRow {
    /// Task name; rows with a blank name are skipped on load.
    #[serde(default)]
    pub name: String,
    /// Project the task belongs to.
    #[serde(default)]
    pub project: String,
    /// Status (`in_progress`, `queued`, `on_hold`, `done`).
    pub status: TaskStatus,
    /// Comma-joined responsible names.
    #[serde(default)]
    pub responsible: String,
    /// Optional note.
    #[serde(default)]
    pub message: Option<String>,
    /// Priority; defaults to the terminal sentinel when omitted.
    #[serde(default = "default_priority")]
    pub priority: u32,
}

const fn default_priority() -> u32 {
    SENTINEL_PRIORITY
}

impl Workbook {
    /// Loads a workbook from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Converts the workbook into store seed data.
    #[must_use]
    pub fn into_seed(self) -> (Vec<Employee>, Vec<(TaskDraft, u32)>) {
        let employees = self
            .employees
            .into_iter()
            .map(|row| Employee {
                user_id: row.user_id,
                name: row.name,
                role: row.role,
                phone: row.phone,
            })
            .collect();
        let tasks = self
            .tasks
            .into_iter()
            .map(|row| {
                (
                    TaskDraft {
                        name: row.name,
                        message: row.message,
                        status: row.status,
                        project: row.project,
                        responsible: split_responsible(&row.responsible),
                    },
                    row.priority,
                )
            })
            .collect();
        (employees, tasks)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and a missing
/// file is treated as empty config.
fn load_config_file(
    explicit_path: Option<&std::path::Path>,
) -> Result<SheetConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(SheetConfigFile::default());
        };
        config_dir.join("taskdesk-sheet").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SheetConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
