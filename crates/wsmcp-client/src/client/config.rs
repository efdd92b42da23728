//! Client configuration types.

use std::time::Duration;

use wsmcp_protocol::PROTOCOL_VERSION;

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// How long a request waits for its correlated response
    pub request_timeout: Duration,

    /// How long a dial may take before it counts as failed
    pub connect_timeout: Duration,

    /// Protocol revision sent in `initialize`
    pub protocol_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            protocol_version: PROTOCOL_VERSION.to_owned(),
        }
    }
}
