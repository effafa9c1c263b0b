//! Group registry for Huddle.
//!
//! Groups are named sets of connections. They are created explicitly, outlive
//! their members, and can be rejoined after becoming empty.

use crate::connection::ConnectionId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Maximum group name length.
pub const MAX_GROUP_NAME_LENGTH: usize = 256;

/// Validate a group name.
///
/// # Errors
///
/// Returns an error message if the group name is invalid.
pub fn validate_group_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("group name cannot be empty");
    }
    if name.len() > MAX_GROUP_NAME_LENGTH {
        return Err("group name too long");
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("group name cannot contain spaces or control characters");
    }
    Ok(())
}

/// Group registry errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GroupError {
    /// No group with that name.
    #[error("Group not found")]
    NotFound,

    /// The connection is not a member, or the group does not exist.
    #[error("Not a member of the group")]
    NotAMember,
}

/// Outcome of creating a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The group was created.
    Created,
    /// A group with that name already existed; nothing changed.
    AlreadyExists,
}

/// Registry of groups and their members.
///
/// Each operation that reads and then writes a group runs under that group's
/// exclusive entry guard, so concurrent joins and leaves never lose updates
/// and the member set handed back always reflects the caller's own change.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: DashMap<String, HashSet<ConnectionId>>,
}

impl GroupRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group with `founder` as its first member.
    pub fn create(&self, name: &str, founder: ConnectionId) -> CreateOutcome {
        match self.groups.entry(name.to_string()) {
            Entry::Occupied(_) => CreateOutcome::AlreadyExists,
            Entry::Vacant(entry) => {
                entry.insert(HashSet::from([founder]));
                debug!(group = %name, connection = %founder, "Group created");
                CreateOutcome::Created
            }
        }
    }

    /// Add a connection to a group.
    ///
    /// Joining a group twice is a silent success. Returns the member set
    /// after the insertion.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::NotFound`] if the group does not exist.
    pub fn join(
        &self,
        name: &str,
        connection_id: ConnectionId,
    ) -> Result<Vec<ConnectionId>, GroupError> {
        let mut members = self.groups.get_mut(name).ok_or(GroupError::NotFound)?;
        if members.insert(connection_id) {
            debug!(group = %name, connection = %connection_id, members = members.len(), "Joined group");
        }
        Ok(members.iter().copied().collect())
    }

    /// Remove a connection from a group.
    ///
    /// Returns the member set after the removal.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::NotAMember`] if the connection is not a member,
    /// including when the group does not exist at all.
    pub fn leave(
        &self,
        name: &str,
        connection_id: ConnectionId,
    ) -> Result<Vec<ConnectionId>, GroupError> {
        let mut members = self.groups.get_mut(name).ok_or(GroupError::NotAMember)?;
        if !members.remove(&connection_id) {
            return Err(GroupError::NotAMember);
        }
        debug!(group = %name, connection = %connection_id, members = members.len(), "Left group");
        Ok(members.iter().copied().collect())
    }

    /// Get the members of a group.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::NotFound`] if the group does not exist.
    pub fn members_of(&self, name: &str) -> Result<Vec<ConnectionId>, GroupError> {
        self.groups
            .get(name)
            .map(|members| members.iter().copied().collect())
            .ok_or(GroupError::NotFound)
    }

    /// Check whether a connection belongs to a group.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::NotFound`] if the group does not exist.
    pub fn is_member(&self, name: &str, connection_id: ConnectionId) -> Result<bool, GroupError> {
        self.groups
            .get(name)
            .map(|members| members.contains(&connection_id))
            .ok_or(GroupError::NotFound)
    }

    /// Remove a connection from every group.
    ///
    /// Empty groups are kept. Returns the number of groups the connection was
    /// removed from.
    pub fn purge_connection(&self, connection_id: ConnectionId) -> usize {
        let mut purged = 0;
        for mut members in self.groups.iter_mut() {
            if members.remove(&connection_id) {
                purged += 1;
            }
        }
        debug!(connection = %connection_id, groups = purged, "Purged from all groups");
        purged
    }

    /// Check if a group exists.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Get the number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check whether no group exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Get the total number of memberships across all groups.
    #[must_use]
    pub fn membership_count(&self) -> usize {
        self.groups.iter().map(|members| members.len()).sum()
    }
}
