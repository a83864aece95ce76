// Local configuration for Folio clients.
//
// Global config: `~/.folio/config.toml`
// The bearer token comes from `FOLIO_TOKEN` and is never written to disk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use folio_common::types::WorkspaceId;
use url::Url;

use crate::sync::{SyncTiming, DEFAULT_DEBOUNCE_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SUPPRESSION_MS};

/// Environment variable holding the API bearer token.
pub const TOKEN_ENV: &str = "FOLIO_TOKEN";

const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

/// Root directory for Folio global state: `~/.folio/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".folio"))
}

/// Path to the global config file: `~/.folio/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

/// Bearer token from the environment, if set and non-empty.
pub fn token_from_env() -> Option<String> {
    std::env::var(TOKEN_ENV).ok().map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

// ── Global config ──────────────────────────────────────────────────

/// Global client configuration at `~/.folio/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Page server base URL (e.g. `https://pages.example.com`).
    pub server_url: Option<String>,
    /// Workspace the CLI operates on by default.
    pub workspace_id: Option<String>,
    /// Autosave and polling timers.
    pub sync: SyncConfig,
    /// HTTP client settings.
    pub http: HttpConfig,
}

impl GlobalConfig {
    /// Load from `~/.folio/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to `~/.folio/config.toml`.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = global_config_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory",
            ))
        })?;
        self.save_to(&path)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
            restrict_mode(parent, 0o700).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)?;
        restrict_mode(path, 0o600).map_err(ConfigError::Io)
    }

    /// Parsed server URL. Errors if unset or malformed.
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        let raw = self.server_url.as_deref().ok_or(ConfigError::Missing("server_url"))?;
        Url::parse(raw).map_err(|e| ConfigError::Invalid(format!("server_url `{raw}`: {e}")))
    }

    pub fn workspace_id(&self) -> Result<WorkspaceId, ConfigError> {
        self.workspace_id
            .as_deref()
            .map(WorkspaceId::from)
            .ok_or(ConfigError::Missing("workspace_id"))
    }
}

/// Sync reconciler timers, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period after the last edit before autosave (100–10000).
    pub debounce_ms: u64,
    /// Poll results are withheld this long after a local edit (500–60000).
    pub suppression_window_ms: u64,
    /// Poll cadence while the document is visible (1000–300000).
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            suppression_window_ms: DEFAULT_SUPPRESSION_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl SyncConfig {
    pub fn timing(&self) -> SyncTiming {
        SyncTiming::with_millis(self.debounce_ms, self.suppression_window_ms, self.poll_interval_ms)
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Tokens are read from `FOLIO_TOKEN`, not from config files.
    pub timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_ms: DEFAULT_HTTP_TIMEOUT_MS }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

fn restrict_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if !path.exists() {
            return Ok(());
        }
        let current = std::fs::metadata(path)?.permissions().mode() & 0o777;
        if current != mode {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
        }
    }

    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }

    Ok(())
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    Missing(&'static str),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
            Self::Missing(key) => write!(f, "config key `{key}` is not set"),
            Self::Invalid(detail) => write!(f, "invalid config value: {detail}"),
        }
    }
}

impl std::error::Error for ConfigError {}
