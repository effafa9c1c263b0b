//! Transport abstraction traits for Huddle.
//!
//! These traits define the interface every transport provides, so the server
//! never depends on how lines actually travel.

use async_trait::async_trait;
use huddle_protocol::ProtocolError;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Protocol error.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A transport that can accept connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Accept a new connection.
    ///
    /// This method waits until a new connection is available or an error occurs.
    async fn accept(&self) -> Result<Box<dyn Connection>, TransportError>;

    /// Get the transport name (e.g., "tcp").
    fn name(&self) -> &'static str;
}

/// An active line-oriented connection.
///
/// Each call to [`Connection::read_line`] yields one complete frame with its
/// terminator removed.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Receive the next line.
    ///
    /// Returns `None` once the peer has closed the connection. Implementations
    /// must be cancel-safe: dropping the future before it completes must not
    /// lose a line.
    async fn read_line(&mut self) -> Result<Option<String>, TransportError>;

    /// Send one line. The terminator is added by the transport.
    async fn write_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Get the remote address of the connection, if available.
    fn remote_addr(&self) -> Option<String> {
        None
    }

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;
}
