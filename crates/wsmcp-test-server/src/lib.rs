//! # wsmcp Test Server
//!
//! A small WebSocket MCP server for integration tests and manual runs.
//!
//! | method | reply |
//! |---|---|
//! | `initialize` | protocol `2024-11-05`, `tools` capability, `test-mcp-server` 1.0.0 |
//! | `tools/list` | the `echo`, `sleep` and `fail` tools |
//! | `tools/call` | runs the tool; unknown tools get an `error` object |
//! | `ping` | `{"id": <same>, "method": "pong"}` |
//! | anything else | logged, never answered |
//!
//! Replies carry the request's `method` alongside `result`, as some MCP
//! servers do. Each request is answered on its own task, so a slow `sleep`
//! call does not hold up other requests on the same connection.
//!
//! ```rust,no_run
//! # async fn demo() -> std::io::Result<()> {
//! let server = wsmcp_test_server::TestServer::start().await?;
//! println!("listening on {}", server.url());
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]

mod server;
pub mod tools;

pub use server::TestServer;

/// Server name reported in `initialize`.
pub const SERVER_NAME: &str = "test-mcp-server";
/// Server version reported in `initialize`.
pub const SERVER_VERSION: &str = "1.0.0";
