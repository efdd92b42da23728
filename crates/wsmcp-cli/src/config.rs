//! JSON config file.
//!
//! ```json
//! {
//!   "server_url": "ws://localhost:3000",
//!   "client_info": { "name": "wsmcp", "version": "0.1.0" },
//!   "log_level": "info"
//! }
//! ```
//!
//! Loading layers, lowest first: built-in defaults, the file (optional), then
//! `WSMCP_*` environment variables. Nested keys use a double underscore, e.g.
//! `WSMCP_CLIENT_INFO__NAME`.

use std::fs;
use std::path::Path;

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wsmcp_protocol::ClientInfo;

use crate::error::{CliError, CliResult};

fn environment() -> Environment {
    Environment::with_prefix("WSMCP")
        .prefix_separator("_")
        .separator("__")
}

/// Levels accepted in `log_level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Effective CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket URL of the MCP server
    pub server_url: String,
    /// Identity sent in `initialize`
    pub client_info: ClientInfo,
    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:3000".to_owned(),
            client_info: ClientInfo::new("wsmcp", env!("CARGO_PKG_VERSION")),
            log_level: "info".to_owned(),
        }
    }
}

impl Config {
    /// Load from `path` (if it exists) and the process environment.
    pub fn load(path: &Path) -> CliResult<Self> {
        Self::load_from(path, environment())
    }

    pub(crate) fn load_from(path: &Path, environment: Environment) -> CliResult<Self> {
        debug!(path = %path.display(), exists = path.exists(), "loading config");
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(File::from(path).format(FileFormat::Json).required(false))
            .add_source(environment)
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> CliResult<()> {
        let url = url::Url::parse(&self.server_url)
            .map_err(|e| CliError::InvalidConfig(format!("server_url '{}': {e}", self.server_url)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(CliError::InvalidConfig(format!(
                "server_url '{}' must use ws:// or wss://",
                self.server_url
            )));
        }
        if self.client_info.name.trim().is_empty() {
            return Err(CliError::InvalidConfig("client_info.name is empty".into()));
        }
        if self.client_info.version.trim().is_empty() {
            return Err(CliError::InvalidConfig("client_info.version is empty".into()));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(CliError::InvalidConfig(format!(
                "log_level '{}' is not one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> CliResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        fs::write(path, json)?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }
}
