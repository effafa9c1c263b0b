//! Session tracking for Huddle.
//!
//! The session registry is the single source of truth for who is online: a
//! connection appears here from the moment it authenticates until it
//! disconnects or exits.

use crate::connection::ConnectionId;
use crate::delivery::Outbox;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::debug;

/// Session registry errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The connection already has a session.
    #[error("Connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),
}

/// An authenticated connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// Authenticated username.
    pub username: String,
    /// Delivery queue of the connection.
    pub outbox: Outbox,
}

/// Registry of authenticated sessions.
///
/// All access goes through one reader/writer lock. Sessions are kept in
/// [`ConnectionId`] order, so iteration (and therefore username resolution)
/// is deterministic. The lock is never held while delivering.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<BTreeMap<ConnectionId, Session>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<ConnectionId, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<ConnectionId, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a session for a connection.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyRegistered`] if the connection already
    /// has a session. The existing session is left untouched.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        username: impl Into<String>,
        outbox: Outbox,
    ) -> Result<(), SessionError> {
        let mut sessions = self.write();
        if sessions.contains_key(&connection_id) {
            return Err(SessionError::AlreadyRegistered(connection_id));
        }

        let username = username.into();
        debug!(connection = %connection_id, user = %username, "Session registered");
        sessions.insert(connection_id, Session { username, outbox });
        Ok(())
    }

    /// Get the username of a connection, if it is still online.
    #[must_use]
    pub fn lookup_username(&self, connection_id: ConnectionId) -> Option<String> {
        self.read()
            .get(&connection_id)
            .map(|session| session.username.clone())
    }

    /// Find the connection a username is logged in on.
    ///
    /// If the same username is logged in more than once, the earliest
    /// connection still online wins.
    #[must_use]
    pub fn find_connection_by_username(&self, username: &str) -> Option<ConnectionId> {
        self.read()
            .iter()
            .find(|(_, session)| session.username == username)
            .map(|(id, _)| *id)
    }

    /// Remove a session.
    ///
    /// Removing an absent connection is a no-op returning `None`.
    pub fn remove(&self, connection_id: ConnectionId) -> Option<Session> {
        let removed = self.write().remove(&connection_id);
        if let Some(session) = &removed {
            debug!(connection = %connection_id, user = %session.username, "Session removed");
        }
        removed
    }

    /// Visit every session under a single read lock.
    ///
    /// Concurrent registrations and removals wait until `f` has seen every
    /// session, so the visit observes one consistent state. `f` must not
    /// block.
    pub fn for_each_connection<F>(&self, mut f: F)
    where
        F: FnMut(ConnectionId, &Session),
    {
        for (id, session) in self.read().iter() {
            f(*id, session);
        }
    }

    /// Get the outbox of a connection.
    #[must_use]
    pub fn outbox(&self, connection_id: ConnectionId) -> Option<Outbox> {
        self.read()
            .get(&connection_id)
            .map(|session| session.outbox.clone())
    }

    /// Snapshot the outboxes of every session except one.
    #[must_use]
    pub fn recipients_except(&self, excluded: ConnectionId) -> Vec<Outbox> {
        let mut recipients = Vec::new();
        self.for_each_connection(|id, session| {
            if id != excluded {
                recipients.push(session.outbox.clone());
            }
        });
        recipients
    }

    /// Resolve a set of connections to their outboxes.
    ///
    /// Connections without a session are skipped.
    #[must_use]
    pub fn outboxes_of(&self, connections: &[ConnectionId]) -> Vec<Outbox> {
        let sessions = self.read();
        connections
            .iter()
            .filter_map(|id| sessions.get(id).map(|session| session.outbox.clone()))
            .collect()
    }

    /// Check whether a connection has a session.
    #[must_use]
    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.read().contains_key(&connection_id)
    }

    /// Get the number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check whether nobody is online.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
