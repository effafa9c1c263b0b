//! # huddle-core
//!
//! Session tracking, group membership and message routing for the Huddle chat
//! relay.
//!
//! This crate provides the shared state every connection works against:
//!
//! - **SessionRegistry** - Who is online, keyed by connection
//! - **GroupRegistry** - Named groups and their member connections
//! - **Router** - Broadcast, private and group delivery plus announcements
//! - **Outbox** - Per-connection delivery queue
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐
//! │  Connection │────▶│   Router    │────▶│ SessionRegistry │
//! └─────────────┘     └─────────────┘     └─────────────────┘
//!        ▲                   │
//!        │                   ▼
//! ┌─────────────┐     ┌─────────────┐
//! │   Outbox    │◀────│GroupRegistry│
//! └─────────────┘     └─────────────┘
//! ```
//!
//! Registries are locked only long enough to copy out recipients; lines are
//! then pushed to outboxes with no lock held.

pub mod connection;
pub mod delivery;
pub mod group;
pub mod router;
pub mod session;

pub use connection::ConnectionId;
pub use delivery::{outbox, Line, Outbox, OutboxReceiver};
pub use group::{CreateOutcome, GroupError, GroupRegistry};
pub use router::{RouteError, Router, RouterStats};
pub use session::{Session, SessionError, SessionRegistry};
