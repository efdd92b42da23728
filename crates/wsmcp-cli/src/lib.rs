//! # wsmcp CLI
//!
//! Command-line client for MCP servers reachable over WebSocket.
//!
//! ## Usage
//!
//! ```bash
//! # Write config.json with defaults (ws://localhost:3000)
//! wsmcp config init
//!
//! # Connect, print the server identity and stay connected until Ctrl-C
//! wsmcp run
//!
//! # List and call tools
//! wsmcp tools list
//! wsmcp --server ws://127.0.0.1:3000 tools call echo --arguments '{"message": "hi"}'
//!
//! # Round-trip latency, as JSON
//! wsmcp ping --format json
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the configured level.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;

use clap::Parser;

pub use cli::{Cli, Commands, ConfigCommands, GlobalArgs, OutputFormat, ToolCommands};
pub use commands::CommandExecutor;
pub use config::Config;
pub use error::{CliError, CliResult};
pub use output::Formatter;

/// Parse the process arguments and run. Returns the exit code.
pub async fn run() -> i32 {
    run_with(Cli::parse()).await
}

/// Run an already-parsed command line. Returns the exit code.
pub async fn run_with(cli: Cli) -> i32 {
    let colored = !cli.global.no_color && cli.global.format == OutputFormat::Human;
    let formatter = Formatter::new(cli.global.format, colored);

    match execute(cli, formatter.clone()).await {
        Ok(()) => 0,
        Err(e) => {
            formatter.display_error(&e);
            1
        }
    }
}

async fn execute(cli: Cli, formatter: Formatter) -> CliResult<()> {
    // `config init` must work even when the existing file is broken.
    let config = match &cli.command {
        Commands::Config(ConfigCommands::Init { .. }) => Config::default(),
        _ => effective_config(&cli.global)?,
    };
    logging::init(&config.log_level, cli.global.format == OutputFormat::Json)?;

    CommandExecutor::new(formatter, config, cli.global.config)
        .execute(cli.command)
        .await
}

/// Load the config file and apply flag overrides, then validate.
pub fn effective_config(global: &GlobalArgs) -> CliResult<Config> {
    let mut config = Config::load(&global.config)?;
    if let Some(server) = &global.server {
        config.server_url.clone_from(server);
    }
    if let Some(level) = &global.log_level {
        config.log_level.clone_from(level);
    }
    config.validate()?;
    Ok(config)
}
