//! # wsmcp Client
//!
//! An MCP client engine over WebSocket. One [`Client`] owns one connection and:
//!
//! - tracks its lifecycle (`Disconnected → Connecting → Connected`, or `Error`)
//! - correlates every request with its response by id, with per-request timeouts
//! - runs a single receive loop per connection that routes responses to their
//!   waiters and everything else to a [`handlers::HandlerRegistry`]
//! - answers server `ping`s out of the box
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wsmcp_client::Client;
//! use wsmcp_protocol::{ClientInfo, ToolCall};
//!
//! # async fn example() -> wsmcp_protocol::Result<()> {
//! let client = Client::websocket();
//! client.connect("ws://localhost:3000").await?;
//! client.initialize(ClientInfo::new("my-app", "1.0.0")).await?;
//!
//! let result = client
//!     .call_tool(ToolCall::new("echo").with_argument("message", "hi"))
//!     .await?;
//! assert!(!result.is_error);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! `Client` is `Clone`; clones share the connection. Requests may be issued
//! from many tasks at once, and a task waiting on a response never blocks the
//! receive loop. Dropping a pending request's future removes it from the
//! correlation table.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod client;
pub mod handlers;

pub use client::{Client, ClientBuilder, ClientConfig, Connection, ConnectionStatus};
pub use handlers::{HandlerError, HandlerResult, MessageHandler, Responder, handler_fn};
