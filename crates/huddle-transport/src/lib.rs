//! # huddle-transport
//!
//! Transport abstraction layer for the Huddle chat relay.
//!
//! The server talks to clients one line at a time. This crate provides:
//!
//! - **TCP** - Line-framed TCP connections, the production transport
//! - **Memory** - In-process connection pairs for tests and benchmarks
//!
//! ## Transport Abstraction
//!
//! All transports implement the `Transport` and `Connection` traits,
//! allowing the server to be transport-agnostic.
//!
//! ```rust,ignore
//! use huddle_transport::Connection;
//!
//! async fn echo(mut conn: Box<dyn Connection>) {
//!     while let Ok(Some(line)) = conn.read_line().await {
//!         let _ = conn.write_line(&line).await;
//!     }
//! }
//! ```

pub mod line;
pub mod memory;
pub mod tcp;
pub mod traits;

pub use line::LineConnection;
pub use tcp::{TcpConfig, TcpConnection, TcpTransport};
pub use traits::{Connection, Transport, TransportError};
