//! Runs parsed command lines against the reference server.

use std::fs;
use std::path::Path;

use clap::Parser;
use pretty_assertions::assert_eq;
use wsmcp_cli::{Cli, Config, run_with};
use wsmcp_test_server::TestServer;

async fn run(config: &Path, args: &[&str]) -> i32 {
    let mut argv = vec!["wsmcp", "--no-color", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(args);
    run_with(Cli::try_parse_from(argv).unwrap()).await
}

#[tokio::test]
async fn test_tools_list_and_call_against_server() {
    let server = TestServer::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    let url = server.url();

    assert_eq!(run(&config, &["--server", &url, "tools", "list"]).await, 0);
    assert_eq!(
        run(
            &config,
            &[
                "--server",
                &url,
                "--format",
                "json",
                "tools",
                "call",
                "echo",
                "--arguments",
                r#"{"message":"hi"}"#,
            ],
        )
        .await,
        0
    );
    assert_eq!(run(&config, &["--server", &url, "ping"]).await, 0);
    server.stop().await;
}

#[tokio::test]
async fn test_tool_error_and_bad_arguments_exit_nonzero() {
    let server = TestServer::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    let url = server.url();

    assert_eq!(run(&config, &["--server", &url, "tools", "call", "fail"]).await, 1);
    assert_eq!(
        run(&config, &["--server", &url, "tools", "call", "echo", "--arguments", "[1]"]).await,
        1
    );
    assert_eq!(
        run(&config, &["--server", &url, "tools", "call", "no-such-tool"]).await,
        1
    );
    server.stop().await;
}

#[tokio::test]
async fn test_server_url_comes_from_config_file() {
    let server = TestServer::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    Config {
        server_url: server.url(),
        ..Config::default()
    }
    .save(&path)
    .unwrap();

    assert_eq!(run(&path, &["tools", "list"]).await, 0);
    server.stop().await;
}

#[tokio::test]
async fn test_unreachable_server_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = format!("ws://127.0.0.1:{port}");
    assert_eq!(run(&config, &["--server", &url, "ping"]).await, 1);
}

#[tokio::test]
async fn test_config_init_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sub/config.json");

    assert_eq!(run(&path, &["config", "init"]).await, 0);
    let written: Config = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, Config::default());

    // Refuses to overwrite without --force.
    assert_eq!(run(&path, &["config", "init"]).await, 1);

    fs::write(&path, "{ broken").unwrap();
    assert_eq!(run(&path, &["config", "show"]).await, 1);
    assert_eq!(run(&path, &["config", "init", "--force"]).await, 0);
    assert_eq!(run(&path, &["--format", "json", "config", "show"]).await, 0);
}

#[tokio::test]
async fn test_invalid_override_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    assert_eq!(
        run(&config, &["--server", "http://localhost:3000", "config", "show"]).await,
        1
    );
    assert_eq!(
        run(&config, &["--log-level", "loud", "config", "show"]).await,
        1
    );
}
