//! Credential store.
//!
//! Credentials are read once at startup from a text file with one
//! `username:password` record per line and never change afterwards.

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Credential loading errors.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The credentials file could not be read.
    #[error("Failed to read credentials from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read-only map of usernames to passwords.
#[derive(Debug, Default, Clone)]
pub struct CredentialStore {
    users: HashMap<String, String>,
}

impl CredentialStore {
    /// Load credentials from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CredentialError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let store = Self::parse(&contents);
        info!(users = store.len(), path = %path.display(), "Loaded credentials");
        Ok(store)
    }

    /// Parse `username:password` records.
    ///
    /// Each line is split at its first `:` and both halves lose trailing
    /// whitespace. Lines without a `:` are skipped; a repeated username keeps
    /// its last password.
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let mut users = HashMap::new();
        for (number, line) in contents.lines().enumerate() {
            match line.split_once(':') {
                Some((username, password)) => {
                    users.insert(
                        username.trim_end().to_string(),
                        password.trim_end().to_string(),
                    );
                }
                None => debug!(line = number + 1, "Skipping credentials line without ':'"),
            }
        }
        Self { users }
    }

    /// Check a username/password pair.
    #[must_use]
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected == password)
    }

    /// Get the number of known users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Check whether no users are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl FromIterator<(String, String)> for CredentialStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            users: iter.into_iter().collect(),
        }
    }
}
