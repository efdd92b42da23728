//! Connection lifecycle.
//!
//! ```text
//!   Disconnected ──connect──▶ Connecting ──dial ok──▶ Connected
//!        ▲                        │                      │
//!        │                     dial err            receive loop
//!        │                        ▼                 fails/closes
//!        └──────disconnect──── Error ◀───────────────────┘
//! ```
//!
//! `disconnect` returns to `Disconnected` from every state.
//!
//! [`ConnectionState`] is plain data guarded by the client's lock; none of its
//! methods perform I/O, so the lock is never held across an await.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wsmcp_protocol::{Error, Result};
use wsmcp_transport::Transport;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No transport; initial and terminal state
    Disconnected,
    /// A dial is in flight
    Connecting,
    /// Transport up, receive loop running
    Connected,
    /// The last dial or the live transport failed
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Snapshot of the client's connection record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Stable identifier for this client's connection record
    pub id: Uuid,
    /// Server most recently dialed, if any
    pub server_url: Option<String>,
    /// Current lifecycle state
    pub status: ConnectionStatus,
    /// Successful connects so far
    pub sessions: u64,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            server_url: None,
            status: ConnectionStatus::Disconnected,
            sessions: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Everything the client tracks about its one connection.
#[derive(Debug)]
pub(crate) struct ConnectionState {
    connection: Connection,
    transport: Option<Arc<dyn Transport>>,
    session_token: Option<CancellationToken>,
    /// Bumped on every connect attempt and every disconnect, so a dial that
    /// finishes late can tell it has been superseded.
    attempt: u64,
}

/// What a finished dial should do with its transport.
#[derive(Debug)]
pub(crate) enum DialOutcome {
    /// Keep it; start a receive loop for `session` watching `token`.
    Established {
        session: u64,
        token: CancellationToken,
    },
    /// The attempt was superseded; close the transport.
    Superseded,
}

impl ConnectionState {
    pub(crate) fn new() -> Self {
        Self {
            connection: Connection::new(),
            transport: None,
            session_token: None,
            attempt: 0,
        }
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        self.connection.status
    }

    pub(crate) fn snapshot(&self) -> Connection {
        self.connection.clone()
    }

    /// The live transport, or `NotConnected`.
    pub(crate) fn transport(&self) -> Result<Arc<dyn Transport>> {
        match (&self.transport, self.connection.status) {
            (Some(transport), ConnectionStatus::Connected) => Ok(Arc::clone(transport)),
            _ => Err(Error::NotConnected),
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        self.connection.status = status;
        self.connection.updated_at = Utc::now();
    }

    /// `Disconnected`/`Error` → `Connecting`. Returns the attempt number.
    pub(crate) fn begin_connect(&mut self, server_url: &str) -> Result<u64> {
        match self.connection.status {
            ConnectionStatus::Connecting => return Err(Error::AlreadyConnecting),
            ConnectionStatus::Connected => return Err(Error::AlreadyConnected),
            ConnectionStatus::Disconnected | ConnectionStatus::Error => {}
        }
        self.attempt += 1;
        self.connection.server_url = Some(server_url.to_owned());
        self.set_status(ConnectionStatus::Connecting);
        Ok(self.attempt)
    }

    /// `Connecting` → `Error`, unless the attempt was superseded.
    pub(crate) fn fail_connect(&mut self, attempt: u64) {
        if self.attempt == attempt && self.connection.status == ConnectionStatus::Connecting {
            self.set_status(ConnectionStatus::Error);
        }
    }

    /// `Connecting` → `Connected` with `transport`.
    pub(crate) fn establish(
        &mut self,
        attempt: u64,
        transport: Arc<dyn Transport>,
        token: CancellationToken,
    ) -> DialOutcome {
        if self.attempt != attempt || self.connection.status != ConnectionStatus::Connecting {
            return DialOutcome::Superseded;
        }
        self.transport = Some(transport);
        self.session_token = Some(token.clone());
        self.connection.sessions += 1;
        self.set_status(ConnectionStatus::Connected);
        DialOutcome::Established {
            session: self.attempt,
            token,
        }
    }

    /// Any state → `Disconnected`. Returns the transport to close, if any.
    pub(crate) fn teardown(&mut self) -> Option<Arc<dyn Transport>> {
        self.attempt += 1;
        if let Some(token) = self.session_token.take() {
            token.cancel();
        }
        if self.connection.status != ConnectionStatus::Disconnected {
            self.set_status(ConnectionStatus::Disconnected);
        }
        self.transport.take()
    }

    /// Whether `session` is the live session.
    pub(crate) fn is_current(&self, session: u64) -> bool {
        self.attempt == session && self.connection.status == ConnectionStatus::Connected
    }

    /// `Connected` → `Error` for a session whose transport failed.
    pub(crate) fn fail_session(&mut self, session: u64) -> Option<Arc<dyn Transport>> {
        if !self.is_current(session) {
            return None;
        }
        if let Some(token) = self.session_token.take() {
            token.cancel();
        }
        self.set_status(ConnectionStatus::Error);
        self.transport.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsmcp_transport::MemoryTransport;

    fn transport() -> Arc<dyn Transport> {
        Arc::new(MemoryTransport::pair().0)
    }

    #[test]
    fn test_initial_state() {
        let state = ConnectionState::new();
        assert_eq!(state.status(), ConnectionStatus::Disconnected);
        assert!(matches!(state.transport(), Err(Error::NotConnected)));
        assert_eq!(state.snapshot().server_url, None);
    }

    #[test]
    fn test_connect_guards() {
        let mut state = ConnectionState::new();
        let attempt = state.begin_connect("ws://h:3000").unwrap();
        assert!(matches!(
            state.begin_connect("ws://h:3000"),
            Err(Error::AlreadyConnecting)
        ));

        let outcome = state.establish(attempt, transport(), CancellationToken::new());
        assert!(matches!(outcome, DialOutcome::Established { .. }));
        assert!(matches!(
            state.begin_connect("ws://h:3000"),
            Err(Error::AlreadyConnected)
        ));
        assert_eq!(state.snapshot().sessions, 1);
    }

    #[test]
    fn test_failed_dial_allows_retry() {
        let mut state = ConnectionState::new();
        let attempt = state.begin_connect("ws://h:3000").unwrap();
        state.fail_connect(attempt);
        assert_eq!(state.status(), ConnectionStatus::Error);
        assert!(state.begin_connect("ws://h:3001").is_ok());
        assert_eq!(
            state.snapshot().server_url.as_deref(),
            Some("ws://h:3001")
        );
    }

    #[test]
    fn test_disconnect_during_dial_supersedes_it() {
        let mut state = ConnectionState::new();
        let attempt = state.begin_connect("ws://h:3000").unwrap();
        assert!(state.teardown().is_none());
        assert_eq!(state.status(), ConnectionStatus::Disconnected);

        let outcome = state.establish(attempt, transport(), CancellationToken::new());
        assert!(matches!(outcome, DialOutcome::Superseded));
        assert_eq!(state.status(), ConnectionStatus::Disconnected);

        // A stale failure must not clobber the state either.
        state.fail_connect(attempt);
        assert_eq!(state.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_teardown_cancels_session_and_returns_transport() {
        let mut state = ConnectionState::new();
        let attempt = state.begin_connect("ws://h:3000").unwrap();
        let token = CancellationToken::new();
        state.establish(attempt, transport(), token.clone());

        assert!(state.teardown().is_some());
        assert!(token.is_cancelled());
        assert_eq!(state.status(), ConnectionStatus::Disconnected);
        assert!(state.teardown().is_none());
    }

    #[test]
    fn test_stale_session_cannot_fail_new_one() {
        let mut state = ConnectionState::new();
        let first = state.begin_connect("ws://h:3000").unwrap();
        let DialOutcome::Established { session: old, .. } =
            state.establish(first, transport(), CancellationToken::new())
        else {
            panic!("expected established");
        };
        state.teardown();

        let second = state.begin_connect("ws://h:3000").unwrap();
        let DialOutcome::Established { session: new, .. } =
            state.establish(second, transport(), CancellationToken::new())
        else {
            panic!("expected established");
        };

        assert!(state.fail_session(old).is_none());
        assert_eq!(state.status(), ConnectionStatus::Connected);
        assert!(state.fail_session(new).is_some());
        assert_eq!(state.status(), ConnectionStatus::Error);
    }
}
