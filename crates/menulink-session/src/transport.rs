//! Transport abstraction.
//!
//! A transport owns one link to a device (serial port, socket, whatever)
//! and surfaces everything that happens on it through [`Transport::poll_event`].
//! The controller polls during its tick; transports never call back into the
//! session, so implementations stay free of re-entrancy concerns.

use thiserror::Error;

/// Errors surfaced by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Writing to the link failed; the connection should be considered dead.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// An operation required an open connection.
    #[error("not connected")]
    NotConnected,

    /// The transport could not be started.
    #[error("start failed: {0}")]
    StartFailed(String),
}

/// Something that happened on the link since the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link came up.
    Connected,
    /// The link went down.
    Disconnected,
    /// Raw bytes arrived; may hold partial or multiple frames.
    Data(Vec<u8>),
}

/// One link to a remote menu device.
///
/// Implementations queue events internally and hand them out one at a time
/// from [`poll_event`](Transport::poll_event), oldest first.
pub trait Transport {
    /// Begin connecting. Safe to call again after a disconnect.
    fn start(&mut self) -> Result<(), TransportError>;

    /// Stop the transport entirely; no reconnection until started again.
    fn stop(&mut self);

    /// Drop the current connection but leave the transport started.
    fn close_connection(&mut self);

    /// Write one encoded message to the link.
    fn send_message(&mut self, raw: &str) -> Result<(), TransportError>;

    /// Whether the link is currently up.
    fn is_connected(&self) -> bool;

    /// Milliseconds timestamp of the last disconnect, if any.
    fn last_disconnect_time(&self) -> Option<u64>;

    /// Next queued event, oldest first.
    fn poll_event(&mut self) -> Option<TransportEvent>;

    /// Short name for diagnostics, usually the endpoint.
    fn name(&self) -> &str;
}
