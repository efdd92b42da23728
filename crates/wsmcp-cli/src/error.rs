//! CLI error type.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use wsmcp_protocol::Error as ClientError;

/// Errors a CLI command can end with
#[derive(Error, Debug)]
pub enum CliError {
    /// The client engine failed
    #[error("{0}")]
    Client(#[from] ClientError),

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The config file or environment could not be read
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// The configuration was read but is not usable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// `config init` would overwrite a file
    #[error("Config file {} already exists", .0.display())]
    ConfigExists(PathBuf),

    /// The tool ran and reported failure
    #[error("Tool '{0}' reported an error")]
    ToolFailed(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Hints for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Client(ClientError::Dial { .. }) => vec![
                "Check that the server is running",
                "Verify the URL (ws:// or wss://) with --server or server_url in the config",
            ],
            Self::Client(ClientError::Timeout { .. }) => vec![
                "Check server responsiveness",
                "Verify network connectivity",
            ],
            Self::Client(ClientError::ConnectionClosed | ClientError::Transport(_)) => {
                vec!["The server dropped the connection; check its logs"]
            }
            Self::InvalidArguments(_) => vec![
                "Arguments must be a JSON object, e.g. --arguments '{\"message\": \"hi\"}'",
                "Use --help to see expected format",
            ],
            Self::InvalidConfig(_) | Self::Config(_) => vec![
                "Run `wsmcp config init --force` to write a fresh default file",
                "Run `wsmcp config show` to see the merged configuration",
            ],
            Self::ConfigExists(_) => vec!["Pass --force to overwrite it"],
            _ => vec![],
        }
    }

    /// Broad category, used as the error label
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Client(ClientError::Remote(_)) | Self::ToolFailed(_) => ErrorCategory::Server,
            Self::Client(ClientError::Timeout { .. }) => ErrorCategory::Timeout,
            Self::Client(_) => ErrorCategory::Connection,
            Self::InvalidArguments(_) => ErrorCategory::User,
            Self::Config(_) | Self::InvalidConfig(_) | Self::ConfigExists(_) => {
                ErrorCategory::Config
            }
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Io(_) => ErrorCategory::System,
        }
    }
}

/// Error categories for colored output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Connection,
    User,
    Server,
    Timeout,
    Parsing,
    System,
    Config,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "Connection"),
            Self::User => write!(f, "User Input"),
            Self::Server => write!(f, "Server"),
            Self::Timeout => write!(f, "Timeout"),
            Self::Parsing => write!(f, "Parsing"),
            Self::System => write!(f, "System"),
            Self::Config => write!(f, "Configuration"),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
