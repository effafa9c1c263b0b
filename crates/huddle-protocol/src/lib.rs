//! # huddle-protocol
//!
//! Text protocol for the Huddle chat relay.
//!
//! Clients speak newline-delimited UTF-8. After a username/password exchange
//! every line is a command recognised by its keyword prefix:
//!
//! - `/broadcast <message>` - Send to every online user
//! - `/msg <username> <message>` - Send to one user
//! - `/create_group`, `/join_group`, `/leave_group` - Group membership
//! - `/group_msg <group> <message>` - Send to a group
//! - `/exit` - Disconnect
//!
//! ## Example
//!
//! ```rust
//! use huddle_protocol::{reply, Command};
//!
//! let command = Command::parse("/msg bob hello");
//! assert_eq!(command, Command::Private { target: "bob", body: "hello" });
//! assert_eq!(reply::private("alice", "hello"), "[Private from alice]: hello");
//! ```

pub mod codec;
pub mod command;
pub mod reply;

pub use codec::{LineCodec, ProtocolError, DEFAULT_MAX_LINE_LENGTH};
pub use command::{Command, CommandKind};
