//! Protocol client engine.
//!
//! - `core`: the `Client` handle and request plumbing
//! - `state`: connection lifecycle state machine
//! - `correlation`: in-flight request table
//! - `dispatcher`: the per-connection receive loop
//! - `config` / `builder`: construction
//! - `operations`: the public operations, grouped by concern

pub mod builder;
pub mod config;
pub mod core;
mod correlation;
mod dispatcher;
mod operations;
pub mod state;

pub use builder::ClientBuilder;
pub use config::ClientConfig;
pub use core::Client;
pub use state::{Connection, ConnectionStatus};
