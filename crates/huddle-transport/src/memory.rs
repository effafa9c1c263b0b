//! In-memory transport.
//!
//! Connects two [`LineConnection`]s back to back without touching the network.

use tokio::io::DuplexStream;

use crate::line::LineConnection;

/// A line connection over an in-memory pipe.
pub type MemoryConnection = LineConnection<DuplexStream>;

/// Buffer size of each direction of the pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Create two connected line connections.
///
/// Whatever one side writes, the other reads.
#[must_use]
pub fn pair(max_line_length: usize) -> (MemoryConnection, MemoryConnection) {
    let (a, b) = tokio::io::duplex(PIPE_CAPACITY);
    (
        LineConnection::new(a, max_line_length).with_remote_addr("memory"),
        LineConnection::new(b, max_line_length).with_remote_addr("memory"),
    )
}
