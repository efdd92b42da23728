//! Command execution.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{info, warn};
use wsmcp_client::Client;
use wsmcp_protocol::{Error as ClientError, InitializeResult, ToolCall};

use crate::cli::{Commands, ConfigCommands, ToolCommands};
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output::Formatter;

/// How often `run` checks that the connection is still up.
const HEALTH_INTERVAL: Duration = Duration::from_millis(500);

/// Runs one command against the configured server
#[derive(Debug)]
pub struct CommandExecutor {
    /// Renders results and errors
    pub formatter: Formatter,
    config: Config,
    config_path: PathBuf,
}

impl CommandExecutor {
    /// Create an executor for an already-validated config
    pub fn new(formatter: Formatter, config: Config, config_path: PathBuf) -> Self {
        Self {
            formatter,
            config,
            config_path,
        }
    }

    /// Execute a command
    pub async fn execute(&self, command: Commands) -> CliResult<()> {
        match command {
            Commands::Run => self.execute_run().await,
            Commands::Tools(cmd) => self.execute_tool_command(cmd).await,
            Commands::Ping => self.execute_ping().await,
            Commands::Config(cmd) => self.execute_config_command(cmd),
        }
    }

    async fn execute_run(&self) -> CliResult<()> {
        let (client, init) = self.connect().await?;
        self.formatter.display_server_info(&init)?;
        self.formatter
            .print_info("Connected; press Ctrl-C to disconnect");

        let outcome = tokio::select! {
            () = shutdown_signal() => {
                info!("shutdown signal received");
                Ok(())
            }
            () = connection_lost(&client) => Err(CliError::Client(ClientError::ConnectionClosed)),
        };

        client.disconnect().await?;
        outcome
    }

    async fn execute_tool_command(&self, command: ToolCommands) -> CliResult<()> {
        match command {
            ToolCommands::List => {
                let (client, _) = self.connect().await?;
                let tools = client.list_tools().await;
                client.disconnect().await?;
                self.formatter.display_tools(&tools?)
            }
            ToolCommands::Call { name, arguments } => {
                let arguments = parse_arguments(&arguments)?;
                let (client, _) = self.connect().await?;
                let result = client
                    .call_tool(ToolCall::new(name.clone()).with_arguments(arguments))
                    .await;
                client.disconnect().await?;

                let result = result?;
                self.formatter.display_tool_result(&result)?;
                if result.is_error {
                    return Err(CliError::ToolFailed(name));
                }
                Ok(())
            }
        }
    }

    async fn execute_ping(&self) -> CliResult<()> {
        let (client, _) = self.connect().await?;
        let rtt = client.ping().await;
        client.disconnect().await?;
        self.formatter.display_ping(&self.config.server_url, rtt?)
    }

    fn execute_config_command(&self, command: ConfigCommands) -> CliResult<()> {
        match command {
            ConfigCommands::Init { force } => {
                if self.config_path.exists() && !force {
                    return Err(CliError::ConfigExists(self.config_path.clone()));
                }
                Config::default().save(&self.config_path)?;
                self.formatter.print_info(&format!(
                    "Wrote default config to {}",
                    self.config_path.display()
                ));
                Ok(())
            }
            ConfigCommands::Show => self.formatter.display_config(&self.config),
        }
    }

    /// Connect and initialize, cleaning up if the handshake fails.
    async fn connect(&self) -> CliResult<(Client, InitializeResult)> {
        let client = Client::websocket();
        client.connect(self.config.server_url.as_str()).await?;

        match client.initialize(self.config.client_info.clone()).await {
            Ok(init) => Ok((client, init)),
            Err(e) => {
                let _ = client.disconnect().await;
                Err(e.into())
            }
        }
    }
}

/// Parse `--arguments`, which must be a JSON object.
pub fn parse_arguments(raw: &str) -> CliResult<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CliError::InvalidArguments(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(CliError::InvalidArguments(format!("Invalid JSON arguments: {e}"))),
    }
}

async fn connection_lost(client: &Client) {
    let mut ticker = tokio::time::interval(HEALTH_INTERVAL);
    loop {
        ticker.tick().await;
        if !client.is_connected() {
            warn!(status = %client.status(), "connection lost");
            return;
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM; waiting for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
