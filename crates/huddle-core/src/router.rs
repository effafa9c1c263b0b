//! Message router for Huddle.
//!
//! The router decides who receives what. It reads the session and group
//! registries, copies the recipients out of the registry lock, and only then
//! hands the formatted line to their outboxes.

use crate::connection::ConnectionId;
use crate::delivery::{fan_out, Outbox};
use crate::group::{validate_group_name, CreateOutcome, GroupError, GroupRegistry};
use crate::session::{SessionError, SessionRegistry};
use huddle_protocol::reply;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Routing errors.
///
/// The display text of each variant is exactly what the issuing client sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The sender has no session (it raced its own disconnect).
    #[error("[Error] You are not recognized as an active user.")]
    NotRecognized,

    /// No online user has the requested username.
    #[error("[Error] User not active.")]
    UserNotActive,

    /// The group does not exist.
    #[error("[Error] Group does not exist. Create one using /create_group.")]
    GroupNotFound,

    /// The sender is not a member of the group.
    #[error("[Error] You are not a member of this group. Join first using /join_group.")]
    NotAGroupMember,

    /// Leaving a group the sender is not in, or that does not exist.
    #[error("[Error] You are not in this group or the group does not exist.")]
    NotInGroup,

    /// A group with that name already exists.
    #[error("[Error] Group already exists. Try joining using /join_group.")]
    GroupAlreadyExists,

    /// The group name is not acceptable.
    #[error("[Error] Invalid group name: {0}.")]
    InvalidGroupName(&'static str),
}

/// Router statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RouterStats {
    /// Number of online sessions.
    pub sessions: usize,
    /// Number of groups.
    pub groups: usize,
    /// Total number of group memberships.
    pub memberships: usize,
}

/// The central message router.
///
/// Holds no state of its own beyond the two shared registries it was built
/// with.
#[derive(Debug, Clone)]
pub struct Router {
    sessions: Arc<SessionRegistry>,
    groups: Arc<GroupRegistry>,
}

impl Router {
    /// Create a router over the given registries.
    #[must_use]
    pub fn new(sessions: Arc<SessionRegistry>, groups: Arc<GroupRegistry>) -> Self {
        Self { sessions, groups }
    }

    /// Get the session registry.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Get the group registry.
    #[must_use]
    pub fn groups(&self) -> &Arc<GroupRegistry> {
        &self.groups
    }

    /// Get router statistics.
    #[must_use]
    pub fn stats(&self) -> RouterStats {
        RouterStats {
            sessions: self.sessions.len(),
            groups: self.groups.len(),
            memberships: self.groups.membership_count(),
        }
    }

    fn sender_name(&self, sender: ConnectionId) -> Result<String, RouteError> {
        self.sessions
            .lookup_username(sender)
            .ok_or(RouteError::NotRecognized)
    }

    /// Register an authenticated connection and announce its arrival.
    ///
    /// Returns the number of connections the arrival was announced to.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyRegistered`] if the connection already
    /// has a session.
    pub fn connect(
        &self,
        connection_id: ConnectionId,
        username: &str,
        outbox: Outbox,
    ) -> Result<usize, SessionError> {
        self.sessions.register(connection_id, username, outbox)?;
        info!(connection = %connection_id, user = %username, "User joined");

        let recipients = self.sessions.recipients_except(connection_id);
        Ok(fan_out(&recipients, reply::user_joined_chat(username)))
    }

    /// Tear down a connection's session.
    ///
    /// Removes the session, purges the connection from every group and
    /// announces the departure to everyone still online. Safe to call more
    /// than once: only the call that actually removed the session announces.
    /// Returns the username of the removed session.
    pub fn disconnect(&self, connection_id: ConnectionId) -> Option<String> {
        let session = self.sessions.remove(connection_id);
        self.groups.purge_connection(connection_id);

        let session = session?;
        let recipients = self.sessions.recipients_except(connection_id);
        fan_out(&recipients, reply::user_left_chat(&session.username));
        info!(connection = %connection_id, user = %session.username, "User left");

        Some(session.username)
    }

    /// Send a message to every other online user.
    ///
    /// Returns the number of recipients.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::NotRecognized`] if the sender has no session.
    pub fn broadcast(&self, sender: ConnectionId, body: &str) -> Result<usize, RouteError> {
        let sender_name = self.sender_name(sender)?;
        let recipients = self.sessions.recipients_except(sender);

        let count = fan_out(&recipients, reply::broadcast(&sender_name, body));
        trace!(connection = %sender, recipients = count, "Broadcast");
        Ok(count)
    }

    /// Send a message to one user.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::NotRecognized`] if the sender has no session, or
    /// [`RouteError::UserNotActive`] if nobody is logged in as `target`.
    pub fn private(
        &self,
        sender: ConnectionId,
        target: &str,
        body: &str,
    ) -> Result<(), RouteError> {
        let sender_name = self.sender_name(sender)?;
        let outbox = self
            .sessions
            .find_connection_by_username(target)
            .and_then(|id| self.sessions.outbox(id))
            .ok_or(RouteError::UserNotActive)?;

        if !outbox.deliver(reply::private(&sender_name, body).into()) {
            debug!(connection = %sender, target = %target, "Private message recipient went away");
        }
        Ok(())
    }

    /// Create a group with the sender as its first member.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidGroupName`], [`RouteError::NotRecognized`]
    /// or [`RouteError::GroupAlreadyExists`].
    pub fn create_group(&self, sender: ConnectionId, name: &str) -> Result<(), RouteError> {
        validate_group_name(name).map_err(RouteError::InvalidGroupName)?;
        let sender_name = self.sender_name(sender)?;

        match self.groups.create(name, sender) {
            CreateOutcome::Created => {
                info!(group = %name, user = %sender_name, "Group created");
                Ok(())
            }
            CreateOutcome::AlreadyExists => Err(RouteError::GroupAlreadyExists),
        }
    }

    /// Join a group and announce it to the other members.
    ///
    /// Returns the number of members the join was announced to.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::NotRecognized`] or [`RouteError::GroupNotFound`].
    pub fn join_group(&self, sender: ConnectionId, name: &str) -> Result<usize, RouteError> {
        let sender_name = self.sender_name(sender)?;
        let members = self
            .groups
            .join(name, sender)
            .map_err(|_| RouteError::GroupNotFound)?;

        let others: Vec<ConnectionId> = members.into_iter().filter(|id| *id != sender).collect();
        let recipients = self.sessions.outboxes_of(&others);
        Ok(fan_out(&recipients, reply::member_joined(name, &sender_name)))
    }

    /// Leave a group and announce it to the remaining members.
    ///
    /// Returns the number of members the departure was announced to.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::NotRecognized`] or [`RouteError::NotInGroup`].
    pub fn leave_group(&self, sender: ConnectionId, name: &str) -> Result<usize, RouteError> {
        let sender_name = self.sender_name(sender)?;
        let remaining = self
            .groups
            .leave(name, sender)
            .map_err(|_| RouteError::NotInGroup)?;

        let recipients = self.sessions.outboxes_of(&remaining);
        Ok(fan_out(&recipients, reply::member_left(name, &sender_name)))
    }

    /// Send a message to every other member of a group.
    ///
    /// Returns the number of recipients.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::NotRecognized`], [`RouteError::GroupNotFound`] or
    /// [`RouteError::NotAGroupMember`].
    pub fn group_message(
        &self,
        sender: ConnectionId,
        group: &str,
        body: &str,
    ) -> Result<usize, RouteError> {
        let sender_name = self.sender_name(sender)?;
        let members = self.groups.members_of(group).map_err(|e| match e {
            GroupError::NotFound => RouteError::GroupNotFound,
            GroupError::NotAMember => RouteError::NotAGroupMember,
        })?;
        if !members.contains(&sender) {
            return Err(RouteError::NotAGroupMember);
        }

        let others: Vec<ConnectionId> = members.into_iter().filter(|id| *id != sender).collect();
        let recipients = self.sessions.outboxes_of(&others);
        let count = fan_out(&recipients, reply::group_message(group, &sender_name, body));
        trace!(connection = %sender, group = %group, recipients = count, "Group message");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{outbox, OutboxReceiver};

    struct Peer {
        id: ConnectionId,
        rx: OutboxReceiver,
    }

    impl Peer {
        fn drain(&mut self) -> Vec<String> {
            let mut lines = Vec::new();
            while let Ok(line) = self.rx.try_recv() {
                lines.push(line.to_string());
            }
            lines
        }
    }

    fn router() -> Router {
        Router::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(GroupRegistry::new()),
        )
    }

    fn login(router: &Router, name: &str) -> Peer {
        let id = ConnectionId::next();
        let (tx, rx) = outbox();
        router.connect(id, name, tx).unwrap();
        Peer { id, rx }
    }

    #[test]
    fn test_connect_announces_to_others_only() {
        let router = router();
        let mut alice = login(&router, "alice");
        let mut bob = login(&router, "bob");

        assert_eq!(alice.drain(), vec!["bob has joined the chat."]);
        assert!(bob.drain().is_empty());
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let router = router();
        let mut alice = login(&router, "alice");
        let mut bob = login(&router, "bob");
        alice.drain();

        assert_eq!(router.broadcast(alice.id, "hi").unwrap(), 1);
        assert_eq!(bob.drain(), vec!["[Broadcast from alice]: hi"]);
        assert!(alice.drain().is_empty());
    }

    #[test]
    fn test_broadcast_from_unknown_sender() {
        let router = router();
        let _alice = login(&router, "alice");
        assert_eq!(
            router.broadcast(ConnectionId::next(), "hi"),
            Err(RouteError::NotRecognized)
        );
    }

    #[test]
    fn test_broadcast_survives_closed_recipient() {
        let router = router();
        let alice = login(&router, "alice");
        let bob = login(&router, "bob");
        let mut carol = login(&router, "carol");
        drop(bob);
        carol.drain();

        assert_eq!(router.broadcast(alice.id, "still here?").unwrap(), 1);
        assert_eq!(carol.drain(), vec!["[Broadcast from alice]: still here?"]);
    }

    #[test]
    fn test_private_message() {
        let router = router();
        let mut alice = login(&router, "alice");
        let mut bob = login(&router, "bob");
        let mut carol = login(&router, "carol");
        alice.drain();
        bob.drain();

        router.private(alice.id, "bob", "secret").unwrap();
        assert_eq!(bob.drain(), vec!["[Private from alice]: secret"]);
        assert!(carol.drain().is_empty());
        assert!(alice.drain().is_empty());
    }

    #[test]
    fn test_private_to_offline_user() {
        let router = router();
        let alice = login(&router, "alice");
        assert_eq!(
            router.private(alice.id, "dave", "hello?"),
            Err(RouteError::UserNotActive)
        );
    }

    #[test]
    fn test_create_group_twice() {
        let router = router();
        let alice = login(&router, "alice");

        router.create_group(alice.id, "CS425").unwrap();
        assert_eq!(
            router.create_group(alice.id, "CS425"),
            Err(RouteError::GroupAlreadyExists)
        );
        assert_eq!(router.groups().members_of("CS425").unwrap(), vec![alice.id]);
    }

    #[test]
    fn test_create_group_invalid_name() {
        let router = router();
        let alice = login(&router, "alice");
        assert!(matches!(
            router.create_group(alice.id, ""),
            Err(RouteError::InvalidGroupName(_))
        ));
        assert!(router.groups().is_empty());
    }

    #[test]
    fn test_non_ascii_group_names() {
        let router = router();
        let mut alice = login(&router, "alice");
        let mut bob = login(&router, "bob");

        router.create_group(alice.id, "Café").unwrap();
        router.join_group(bob.id, "Café").unwrap();
        router.create_group(bob.id, "网络").unwrap();
        alice.drain();

        assert_eq!(router.group_message(alice.id, "Café", "bonjour").unwrap(), 1);
        assert_eq!(bob.drain(), vec!["[Group Café] alice bonjour"]);
        assert_eq!(router.groups().members_of("网络").unwrap(), vec![bob.id]);
        assert!(matches!(
            router.create_group(alice.id, "Caf\u{e9} au lait"),
            Err(RouteError::InvalidGroupName(_))
        ));
    }

    #[test]
    fn test_join_announces_to_other_members() {
        let router = router();
        let mut alice = login(&router, "alice");
        let mut bob = login(&router, "bob");
        let mut carol = login(&router, "carol");
        alice.drain();
        bob.drain();

        router.create_group(alice.id, "CS425").unwrap();
        assert_eq!(router.join_group(bob.id, "CS425").unwrap(), 1);

        assert_eq!(alice.drain(), vec!["[Group CS425] bob has joined."]);
        assert!(bob.drain().is_empty());
        assert!(carol.drain().is_empty());
    }

    #[test]
    fn test_join_missing_group() {
        let router = router();
        let alice = login(&router, "alice");
        assert_eq!(
            router.join_group(alice.id, "CS425"),
            Err(RouteError::GroupNotFound)
        );
    }

    #[test]
    fn test_leave_announces_to_remaining_members() {
        let router = router();
        let mut alice = login(&router, "alice");
        let mut bob = login(&router, "bob");
        router.create_group(alice.id, "CS425").unwrap();
        router.join_group(bob.id, "CS425").unwrap();
        alice.drain();

        assert_eq!(router.leave_group(bob.id, "CS425").unwrap(), 1);
        assert_eq!(alice.drain(), vec!["[Group CS425] bob has left."]);
        assert!(bob.drain().is_empty());

        assert_eq!(
            router.leave_group(bob.id, "CS425"),
            Err(RouteError::NotInGroup)
        );
        assert_eq!(
            router.leave_group(bob.id, "nowhere"),
            Err(RouteError::NotInGroup)
        );
    }

    #[test]
    fn test_group_message() {
        let router = router();
        let mut alice = login(&router, "alice");
        let mut bob = login(&router, "bob");
        let mut carol = login(&router, "carol");
        router.create_group(alice.id, "CS425").unwrap();
        router.join_group(bob.id, "CS425").unwrap();
        alice.drain();
        bob.drain();

        assert_eq!(router.group_message(alice.id, "CS425", "hello").unwrap(), 1);
        assert_eq!(bob.drain(), vec!["[Group CS425] alice hello"]);
        assert!(alice.drain().is_empty());
        assert!(carol.drain().is_empty());

        assert_eq!(
            router.group_message(carol.id, "CS425", "let me in"),
            Err(RouteError::NotAGroupMember)
        );
        assert_eq!(
            router.group_message(alice.id, "nowhere", "hello"),
            Err(RouteError::GroupNotFound)
        );
    }

    #[test]
    fn test_disconnect_cleans_up_once() {
        let router = router();
        let alice = login(&router, "alice");
        let mut bob = login(&router, "bob");
        router.create_group(alice.id, "CS425").unwrap();
        router.join_group(bob.id, "CS425").unwrap();
        bob.drain();

        assert_eq!(router.disconnect(alice.id).as_deref(), Some("alice"));
        assert_eq!(router.disconnect(alice.id), None);

        assert!(!router.sessions().contains(alice.id));
        assert_eq!(router.groups().members_of("CS425").unwrap(), vec![bob.id]);
        assert_eq!(bob.drain(), vec!["alice has left the chat."]);
    }

    #[test]
    fn test_stats() {
        let router = router();
        let alice = login(&router, "alice");
        let bob = login(&router, "bob");
        router.create_group(alice.id, "a").unwrap();
        router.create_group(bob.id, "b").unwrap();
        router.join_group(bob.id, "a").unwrap();

        let stats = router.stats();
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.groups, 2);
        assert_eq!(stats.memberships, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_disconnects_leave_no_stale_members() {
        let router = router();
        let founder = login(&router, "founder");
        router.create_group(founder.id, "busy").unwrap();

        let mut handles = Vec::new();
        for i in 0..64 {
            let router = router.clone();
            handles.push(tokio::spawn(async move {
                let peer = login(&router, &format!("user{i}"));
                for _ in 0..8 {
                    router.join_group(peer.id, "busy").unwrap();
                    let _ = router.group_message(peer.id, "busy", "hey");
                    tokio::task::yield_now().await;
                    let _ = router.leave_group(peer.id, "busy");
                    router.join_group(peer.id, "busy").unwrap();
                }
                router.disconnect(peer.id);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for member in router.groups().members_of("busy").unwrap() {
            assert!(router.sessions().contains(member));
        }
        assert_eq!(router.groups().members_of("busy").unwrap(), vec![founder.id]);
        assert_eq!(router.sessions().len(), 1);
    }
}
