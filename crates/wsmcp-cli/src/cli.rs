//! CLI argument parsing.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "wsmcp",
    version,
    about = "Talk to an MCP server over WebSocket",
    long_about = "wsmcp connects to an MCP server over WebSocket, performs the initialize \
                  handshake, and lists or calls the server's tools.\n\n\
                  Settings come from a JSON config file (see `wsmcp config init`), \
                  overridden by WSMCP_* environment variables and then by flags."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the JSON config file
    #[arg(long, short = 'c', global = true, default_value = "config.json", env = "WSMCP_CONFIG")]
    pub config: PathBuf,

    /// Server URL (overrides the config file)
    #[arg(long, short = 's', global = true)]
    pub server: Option<String>,

    /// Log level (overrides the config file; RUST_LOG wins over both)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect, initialize and stay connected until interrupted
    Run,

    /// Tool operations
    #[command(subcommand)]
    Tools(ToolCommands),

    /// Measure round-trip latency to the server
    Ping,

    /// Config file operations
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Tool-related commands
#[derive(Subcommand, Debug)]
pub enum ToolCommands {
    /// List available tools
    List,

    /// Call a tool
    Call {
        /// Tool name
        name: String,

        /// Arguments as a JSON object
        #[arg(long, short = 'a', default_value = "{}")]
        arguments: String,
    },
}

/// Config file commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// Pretty-printed JSON
    Json,
}
