//! Configuration file management for cellplan.
//!
//! Provides a TOML-based config file at `~/.config/cellplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use cellplan_core::{PlanStore, WriteMode};
use cellplan_sheets::{
    CellRef, CellTransport, FileTransport, RateLimiter, ResilientCell, RetryPolicy, RetrySettings,
    SheetsClient, SheetsConfig,
};

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub sheets: SheetsSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub rate_limit: RateLimitSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SheetsSection {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_cell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AuthSection {
    /// OAuth bearer token for the spreadsheet API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RateLimitSection {
    /// Client-side request budget. Unset or zero disables the limiter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_minute: Option<u32>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the cellplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/cellplan` or `~/.config/cellplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("cellplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("cellplan")
}

/// Return the path to the cellplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file at `path`.
pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Load the config file if there is one. A file that exists but does not
/// parse is an error.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    load_config_from(&path).map(Some)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The file may hold an access token.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given as global command-line flags.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub local: Option<PathBuf>,
    pub spreadsheet_id: Option<String>,
    pub plan_cell: Option<String>,
    pub no_retry: bool,
    pub check_version: bool,
}

/// Where the plan cell lives.
#[derive(Debug)]
pub enum Backend {
    /// A JSON file standing in for the spreadsheet.
    Local(PathBuf),
    Sheets(SheetsConfig),
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct CellplanConfig {
    pub backend: Backend,
    pub plan_cell: CellRef,
    pub retry: RetryPolicy,
    pub requests_per_minute: Option<u32>,
    pub write_mode: WriteMode,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(name: &str) -> bool {
    env_var(name).is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes"))
}

impl CellplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Local file: `--local` > `CELLPLAN_LOCAL`
    /// - Spreadsheet ID: `--spreadsheet-id` > `CELLPLAN_SPREADSHEET_ID` > `sheets.spreadsheet_id` > error
    /// - Plan cell: `--plan-cell` > `CELLPLAN_PLAN_CELL` > `sheets.plan_cell` > `_plan!A1`
    /// - API base: `CELLPLAN_API_BASE` > `sheets.api_base` > default
    /// - Access token: `CELLPLAN_ACCESS_TOKEN` > `auth.access_token`
    /// - Retry: `--no-retry` / `CELLPLAN_NO_RETRY` > `[retry]` > defaults
    /// - Rate limit: `CELLPLAN_REQUESTS_PER_MINUTE` > `rate_limit.requests_per_minute`
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let file = load_config()?.unwrap_or_default();

        let plan_cell_text = cli
            .plan_cell
            .clone()
            .or_else(|| env_var("CELLPLAN_PLAN_CELL"))
            .or_else(|| file.sheets.plan_cell.clone())
            .unwrap_or_else(|| SheetsConfig::DEFAULT_PLAN_CELL.to_owned());
        let plan_cell: CellRef = plan_cell_text
            .parse()
            .with_context(|| format!("invalid plan cell {plan_cell_text:?}"))?;

        let local = cli
            .local
            .clone()
            .or_else(|| env_var("CELLPLAN_LOCAL").map(PathBuf::from));

        let backend = match local {
            Some(path) => Backend::Local(path),
            None => {
                let spreadsheet_id = cli
                    .spreadsheet_id
                    .clone()
                    .or_else(|| env_var("CELLPLAN_SPREADSHEET_ID"))
                    .or_else(|| {
                        Some(file.sheets.spreadsheet_id.clone()).filter(|id| !id.trim().is_empty())
                    });
                let Some(spreadsheet_id) = spreadsheet_id else {
                    bail!(
                        "spreadsheet id not configured; pass --spreadsheet-id, set CELLPLAN_SPREADSHEET_ID, or run `cellplan init`"
                    );
                };

                let mut sheets = SheetsConfig::new(spreadsheet_id, plan_cell.clone());
                if let Some(api_base) =
                    env_var("CELLPLAN_API_BASE").or_else(|| file.sheets.api_base.clone())
                {
                    sheets = sheets.with_api_base(api_base);
                }
                if let Some(token) =
                    env_var("CELLPLAN_ACCESS_TOKEN").or_else(|| file.auth.access_token.clone())
                {
                    sheets = sheets.with_access_token(token);
                }
                Backend::Sheets(sheets)
            }
        };

        let retry = if cli.no_retry || env_flag("CELLPLAN_NO_RETRY") {
            RetryPolicy::disabled()
        } else {
            RetryPolicy::from(file.retry)
        };

        let requests_per_minute = match env_var("CELLPLAN_REQUESTS_PER_MINUTE") {
            Some(v) => Some(
                v.trim()
                    .parse::<u32>()
                    .with_context(|| format!("CELLPLAN_REQUESTS_PER_MINUTE is not a number: {v}"))?,
            ),
            None => file.rate_limit.requests_per_minute,
        }
        .filter(|n| *n > 0);

        let write_mode = if cli.check_version || env_flag("CELLPLAN_CHECK_VERSION") {
            WriteMode::CheckVersion
        } else {
            WriteMode::LastWriteWins
        };

        Ok(Self {
            backend,
            plan_cell,
            retry,
            requests_per_minute,
            write_mode,
        })
    }

    pub fn transport(&self) -> Result<Arc<dyn CellTransport>> {
        Ok(match &self.backend {
            Backend::Local(path) => Arc::new(FileTransport::new(path.clone())),
            Backend::Sheets(sheets) => {
                Arc::new(SheetsClient::new(sheets).context("failed to create spreadsheet client")?)
            }
        })
    }

    /// Build the plan store for the resolved cell.
    pub fn store(&self) -> Result<PlanStore> {
        let transport = self.transport()?;
        debug!(
            transport = transport.name(),
            cell = %self.plan_cell,
            retry = self.retry.enabled,
            rate_limit = ?self.requests_per_minute,
            "plan store ready"
        );
        let mut cell = ResilientCell::new(transport, self.plan_cell.clone(), self.retry);
        if let Some(rpm) = self.requests_per_minute {
            cell = cell.with_rate_limiter(Arc::new(RateLimiter::per_minute(rpm)));
        }
        Ok(PlanStore::new(cell).with_write_mode(self.write_mode))
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
