use std::time::Duration;

use crate::cell_ref::CellRef;
use crate::retry::RetryPolicy;

/// Remote spreadsheet configuration.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Spreadsheet document ID (the long token in the sheet URL).
    pub spreadsheet_id: String,
    /// Cell holding the markdown plan.
    pub plan_cell: CellRef,
    /// Base URL of the values API.
    pub api_base: String,
    /// OAuth bearer token. Acquiring it is the caller's job.
    pub access_token: Option<String>,
    /// Per-request timeout applied by the HTTP client.
    pub request_timeout: Duration,
}

impl SheetsConfig {
    pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";
    pub const DEFAULT_PLAN_CELL: &str = "_plan!A1";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Build a config for an explicit spreadsheet (useful for tests and CLI flags).
    pub fn new(spreadsheet_id: impl Into<String>, plan_cell: CellRef) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            plan_cell,
            api_base: Self::DEFAULT_API_BASE.to_owned(),
            access_token: None,
            request_timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

/// Retry settings as they appear in config files, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(s: RetrySettings) -> Self {
        RetryPolicy {
            enabled: s.enabled,
            max_attempts: s.max_attempts,
            initial_delay: Duration::from_millis(s.initial_delay_ms),
            max_backoff: Duration::from_millis(s.max_backoff_ms),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    RetryPolicy::DEFAULT_MAX_ATTEMPTS
}

fn default_initial_delay_ms() -> u64 {
    RetryPolicy::DEFAULT_INITIAL_DELAY.as_millis() as u64
}

fn default_max_backoff_ms() -> u64 {
    RetryPolicy::DEFAULT_MAX_BACKOFF.as_millis() as u64
}
