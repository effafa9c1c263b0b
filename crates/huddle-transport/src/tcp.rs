//! TCP transport implementation.

use async_trait::async_trait;
use huddle_protocol::DEFAULT_MAX_LINE_LENGTH;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::line::LineConnection;
use crate::traits::{Connection, Transport, TransportError};

/// A line connection over TCP.
pub type TcpConnection = LineConnection<TcpStream>;

/// TCP transport configuration.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum line length in bytes.
    pub max_line_length: usize,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 12345)),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// TCP transport.
pub struct TcpTransport {
    listener: TcpListener,
    config: TcpConfig,
}

impl TcpTransport {
    /// Create a new TCP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn new(config: TcpConfig) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(TransportError::Io)?;

        info!("TCP transport listening on {}", config.bind_addr);

        Ok(Self { listener, config })
    }

    /// Create a new TCP transport with default limits.
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        Self::new(TcpConfig {
            bind_addr: addr,
            ..Default::default()
        })
        .await
    }

    /// Get the local address this transport is bound to.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn accept(&self) -> Result<Box<dyn Connection>, TransportError> {
        let (stream, addr) = self.listener.accept().await.map_err(TransportError::Io)?;

        debug!("Accepted TCP connection from {}", addr);

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }

        let conn = LineConnection::new(stream, self.config.max_line_length)
            .with_remote_addr(addr.to_string());
        Ok(Box::new(conn))
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[test]
    fn test_tcp_config_default() {
        let config = TcpConfig::default();
        assert_eq!(config.bind_addr.port(), 12345);
        assert_eq!(config.max_line_length, 1024);
    }

    #[tokio::test]
    async fn test_accept_and_exchange_lines() {
        let transport = TcpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = transport.local_addr().unwrap();
        assert_eq!(transport.name(), "tcp");

        let client = tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (reader, mut writer) = stream.into_split();
            writer.write_all(b"hello server\r\n").await.unwrap();

            let mut lines = BufReader::new(reader).lines();
            lines.next_line().await.unwrap()
        });

        let mut conn = transport.accept().await.unwrap();
        assert!(conn.remote_addr().is_some());
        assert_eq!(conn.read_line().await.unwrap().as_deref(), Some("hello server"));
        conn.write_line("hello client").await.unwrap();

        assert_eq!(client.await.unwrap().as_deref(), Some("hello client"));
    }
}
