//! Output formatting for command results.

use std::time::Duration;

use comfy_table::{Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::{Value, json};
use wsmcp_protocol::{Content, InitializeResult, Tool, ToolResult};

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::{CliError, CliResult};

/// Prints command results in the chosen format
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
    colored: bool,
}

impl Formatter {
    /// Create a formatter; `colored` only affects human output
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    /// Selected output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Display any serializable value as JSON
    pub fn display<T: Serialize + ?Sized>(&self, value: &T) -> CliResult<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Display the server identity from `initialize`
    pub fn display_server_info(&self, init: &InitializeResult) -> CliResult<()> {
        match self.format {
            OutputFormat::Human => {
                self.print_header("Server Information");
                self.print_kv("Name", &init.server_info.name);
                self.print_kv("Version", &init.server_info.version);
                self.print_kv("Protocol", &init.protocol_version);
                self.print_kv(
                    "Tools",
                    if init.capabilities.supports_tools() {
                        "supported"
                    } else {
                        "not advertised"
                    },
                );
                Ok(())
            }
            OutputFormat::Json => self.display(init),
        }
    }

    /// Display the tool list
    pub fn display_tools(&self, tools: &[Tool]) -> CliResult<()> {
        match self.format {
            OutputFormat::Human => {
                if tools.is_empty() {
                    self.print_info("No tools available");
                    return Ok(());
                }
                println!("{}", tools_table(tools));
                self.print_footer(&format!("Total: {} tools", tools.len()));
                Ok(())
            }
            OutputFormat::Json => self.display(tools),
        }
    }

    /// Display a tool call result
    pub fn display_tool_result(&self, result: &ToolResult) -> CliResult<()> {
        match self.format {
            OutputFormat::Human => {
                if result.is_error {
                    if self.colored {
                        println!("{}", "Tool reported an error:".bright_red().bold());
                    } else {
                        println!("Tool reported an error:");
                    }
                }
                for line in content_lines(&result.content) {
                    println!("{line}");
                }
                Ok(())
            }
            OutputFormat::Json => self.display(result),
        }
    }

    /// Display ping latency
    pub fn display_ping(&self, server_url: &str, rtt: Duration) -> CliResult<()> {
        match self.format {
            OutputFormat::Human => {
                let millis = rtt.as_secs_f64() * 1000.0;
                if self.colored {
                    println!(
                        "pong from {} in {}",
                        server_url.bright_green(),
                        format!("{millis:.2}ms").bold()
                    );
                } else {
                    println!("pong from {server_url} in {millis:.2}ms");
                }
                Ok(())
            }
            OutputFormat::Json => self.display(&json!({
                "server_url": server_url,
                "rtt_ms": rtt.as_secs_f64() * 1000.0,
            })),
        }
    }

    /// Display the effective configuration
    pub fn display_config(&self, config: &Config) -> CliResult<()> {
        match self.format {
            OutputFormat::Human => {
                self.print_header("Configuration");
                self.print_kv("server_url", &config.server_url);
                self.print_kv("client_info.name", &config.client_info.name);
                self.print_kv("client_info.version", &config.client_info.version);
                self.print_kv("log_level", &config.log_level);
                Ok(())
            }
            OutputFormat::Json => self.display(config),
        }
    }

    /// One-line status message on stdout
    pub fn print_info(&self, text: &str) {
        if self.colored {
            println!("{}", text.bright_blue());
        } else {
            println!("{text}");
        }
    }

    /// Display error with suggestions
    pub fn display_error(&self, error: &CliError) {
        let label = error.category().to_string();
        if self.colored {
            eprintln!("{} {}", format!("{label} error:").bright_red().bold(), error);

            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\n{}", "Suggestions:".bright_yellow().bold());
                for suggestion in suggestions {
                    eprintln!("  {} {}", "•".bright_blue(), suggestion);
                }
            }
        } else {
            eprintln!("{label} error: {error}");

            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\nSuggestions:");
                for suggestion in suggestions {
                    eprintln!("  • {suggestion}");
                }
            }
        }
    }

    fn print_header(&self, text: &str) {
        if self.colored {
            println!("\n{}", text.bright_cyan().bold());
            println!("{}", "=".repeat(text.len()).bright_cyan());
        } else {
            println!("\n{text}");
            println!("{}", "=".repeat(text.len()));
        }
    }

    fn print_footer(&self, text: &str) {
        if self.colored {
            println!("\n{}", text.bright_black());
        } else {
            println!("\n{text}");
        }
    }

    fn print_kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("  {}: {}", key.bright_green().bold(), value);
        } else {
            println!("  {key}: {value}");
        }
    }
}

fn tools_table(tools: &[Tool]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Name", "Description", "Arguments"]);
    for tool in tools {
        let arguments = schema_summary(&tool.input_schema);
        table.add_row(vec![
            tool.name.as_str(),
            tool.description.as_deref().unwrap_or("-"),
            arguments.as_str(),
        ]);
    }
    table
}

/// Property names from an object schema, required ones marked with `*`.
fn schema_summary(schema: &Value) -> String {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return "-".to_owned();
    };
    if properties.is_empty() {
        return "-".to_owned();
    }
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    properties
        .keys()
        .map(|name| {
            if required.contains(&name.as_str()) {
                format!("{name}*")
            } else {
                name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn content_lines(content: &[Content]) -> Vec<String> {
    content
        .iter()
        .map(|item| match (item.text.as_deref(), item.image_url.as_deref()) {
            (Some(text), _) => text.to_owned(),
            (None, Some(url)) => format!("[image] {url}"),
            (None, None) => format!("[{}]", item.content_type),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_formatter_reports_its_format() {
        assert_eq!(Formatter::new(OutputFormat::Json, false).format(), OutputFormat::Json);
        assert_eq!(Formatter::new(OutputFormat::Human, true).format(), OutputFormat::Human);
    }

    #[test]
    fn test_schema_summary_marks_required() {
        let schema = json!({
            "type": "object",
            "properties": {"message": {"type": "string"}, "loud": {"type": "boolean"}},
            "required": ["message"]
        });
        assert_eq!(schema_summary(&schema), "message*, loud");
        assert_eq!(schema_summary(&json!({"type": "object"})), "-");
    }

    #[test]
    fn test_content_lines() {
        let content = vec![
            Content::text("Echo: hi"),
            Content::image_url("https://example.com/a.png"),
        ];
        assert_eq!(
            content_lines(&content),
            vec!["Echo: hi", "[image] https://example.com/a.png"]
        );
    }

    #[test]
    fn test_tools_table_lists_every_tool() {
        let tools = vec![
            Tool {
                name: "echo".into(),
                description: Some("Echo back the input".into()),
                input_schema: json!({"type": "object", "properties": {"message": {}}}),
            },
            Tool {
                name: "bare".into(),
                description: None,
                input_schema: json!({"type": "object"}),
            },
        ];
        let rendered = tools_table(&tools).to_string();
        assert!(rendered.contains("echo"));
        assert!(rendered.contains("Echo back the input"));
        assert!(rendered.contains("bare"));
    }
}
