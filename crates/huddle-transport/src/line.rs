//! Line-framed connections over any byte stream.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use huddle_protocol::LineCodec;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::traits::{Connection, TransportError};

/// A connection that frames a byte stream with [`LineCodec`].
pub struct LineConnection<S> {
    framed: Framed<S, LineCodec>,
    remote_addr: Option<String>,
    is_open: bool,
}

impl<S> LineConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a stream, rejecting lines longer than `max_line_length`.
    #[must_use]
    pub fn new(stream: S, max_line_length: usize) -> Self {
        Self {
            framed: Framed::new(stream, LineCodec::with_max_length(max_line_length)),
            remote_addr: None,
            is_open: true,
        }
    }

    /// Record the peer address for logging.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }
}

#[async_trait]
impl<S> Connection for LineConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        if !self.is_open {
            return Ok(None);
        }

        match self.framed.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => {
                self.is_open = false;
                Err(TransportError::Protocol(e))
            }
            None => {
                debug!(peer = ?self.remote_addr, "Stream ended");
                self.is_open = false;
                Ok(None)
            }
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::ConnectionClosed);
        }

        self.framed
            .send(line)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.is_open = false;
        SinkExt::<&str>::close(&mut self.framed)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn remote_addr(&self) -> Option<String> {
        self.remote_addr.clone()
    }

    fn is_open(&self) -> bool {
        self.is_open
    }
}
