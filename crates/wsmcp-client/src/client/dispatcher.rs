//! The receive loop.
//!
//! One loop runs per live connection and is the only reader of its
//! transport. Every inbound frame is decoded and routed:
//!
//! ```text
//! frame ──decode──▶ id pending? ──yes──▶ CorrelationTable::resolve
//!                        │
//!                        no
//!                        ▼
//!                  has method? ──yes──▶ HandlerRegistry::dispatch (own task)
//!                        │
//!                        no ──▶ logged and dropped
//! ```
//!
//! A frame that fails to decode is logged and skipped; it never ends the
//! connection. The loop ends when the transport closes or errors, or when its
//! cancellation token fires.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use wsmcp_protocol::JsonCodec;
use wsmcp_transport::{Transport, TransportError, TransportMessage};

use super::correlation::CorrelationTable;
use crate::handlers::{HandlerRegistry, Responder};

/// Why a receive loop stopped.
#[derive(Debug)]
pub(crate) enum LoopExit {
    /// The session token was cancelled (disconnect or shutdown).
    Cancelled,
    /// The peer closed the connection.
    Closed,
    /// The transport reported an error.
    Failed(TransportError),
}

#[derive(Debug)]
pub(crate) struct ReceiveLoop {
    pub(crate) session: u64,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) correlations: Arc<CorrelationTable>,
    pub(crate) handlers: Arc<HandlerRegistry>,
    pub(crate) token: CancellationToken,
}

impl ReceiveLoop {
    pub(crate) async fn run(&self) -> LoopExit {
        debug!(session = self.session, "receive loop started");
        let exit = loop {
            tokio::select! {
                biased;
                () = self.token.cancelled() => break LoopExit::Cancelled,
                received = self.transport.receive() => match received {
                    Ok(Some(frame)) => self.route(&frame),
                    Ok(None) => break LoopExit::Closed,
                    Err(e) => break LoopExit::Failed(e),
                },
            }
        };
        debug!(session = self.session, ?exit, "receive loop stopped");
        exit
    }

    fn route(&self, frame: &TransportMessage) {
        let message = match JsonCodec.decode_message(&frame.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    session = self.session,
                    error = %e,
                    size = frame.size(),
                    "discarding undecodable frame"
                );
                return;
            }
        };

        let message = match message.id.clone() {
            Some(id) => match self.correlations.resolve(&id, message) {
                Ok(()) => return,
                Err(unclaimed) => unclaimed,
            },
            None => message,
        };

        if message.method.is_none() {
            warn!(
                session = self.session,
                id = ?message.id,
                "dropping response for unknown or expired request"
            );
            return;
        }

        trace!(session = self.session, method = message.method_name(), "routing to handlers");
        let responder = Responder::new(Arc::clone(&self.transport));
        self.handlers.dispatch(message, responder);
    }
}
