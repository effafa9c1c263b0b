//! Per-connection supervisor.
//!
//! A supervisor owns one client connection from accept to close. It walks the
//! connection through authentication, registers the session, dispatches every
//! command to the router while forwarding queued deliveries, and finally runs
//! the single teardown routine.

use crate::credentials::CredentialStore;
use crate::metrics;
use huddle_core::{outbox, ConnectionId, Outbox, OutboxReceiver, RouteError, Router, SessionError};
use huddle_protocol::{reply, Command};
use huddle_transport::{Connection, TransportError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Lifecycle of a supervised connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Accepted, nothing exchanged yet.
    Connected,
    /// Waiting for username and password.
    Authenticating,
    /// Session registered; commands are being processed.
    Authenticated,
    /// Closed. No further events are processed.
    Terminated,
}

/// Whether the command loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Owns the teardown of a registered session.
///
/// Teardown runs when [`SessionGuard::release`] is called or, failing that,
/// when the guard is dropped, so a connection task that is aborted still
/// leaves the registries clean.
pub struct SessionGuard {
    router: Router,
    connection_id: ConnectionId,
    released: bool,
}

impl SessionGuard {
    /// Register a session and announce it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyRegistered`] if the connection already
    /// has a session; no guard is created in that case.
    pub fn register(
        router: &Router,
        connection_id: ConnectionId,
        username: &str,
        outbox: Outbox,
    ) -> Result<Self, SessionError> {
        let announced = router.connect(connection_id, username, outbox)?;
        metrics::record_deliveries(announced);
        metrics::set_active_sessions(router.sessions().len());

        Ok(Self {
            router: router.clone(),
            connection_id,
            released: false,
        })
    }

    /// Tear the session down now.
    ///
    /// Returns the username if this call removed the session.
    pub fn release(mut self) -> Option<String> {
        self.released = true;
        self.teardown()
    }

    fn teardown(&self) -> Option<String> {
        let username = self.router.disconnect(self.connection_id);
        metrics::set_active_sessions(self.router.sessions().len());
        username
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.released {
            warn!(connection = %self.connection_id, "Session dropped without release");
            self.teardown();
        }
    }
}

/// Drives a single client connection.
pub struct ConnectionSupervisor {
    id: ConnectionId,
    conn: Box<dyn Connection>,
    router: Router,
    credentials: Arc<CredentialStore>,
    state: SupervisorState,
}

impl ConnectionSupervisor {
    /// Create a supervisor for a freshly accepted connection.
    #[must_use]
    pub fn new(
        id: ConnectionId,
        conn: Box<dyn Connection>,
        router: Router,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            id,
            conn,
            router,
            credentials,
            state: SupervisorState::Connected,
        }
    }

    /// Get the connection ID.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the current state.
    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Run the connection to completion.
    ///
    /// The connection is always closed on return. Session teardown has
    /// already completed by then.
    ///
    /// # Errors
    ///
    /// Returns the transport error that ended the connection, if any.
    pub async fn run(mut self) -> Result<(), TransportError> {
        let result = self.drive().await;

        self.state = SupervisorState::Terminated;
        if let Err(e) = self.conn.close().await {
            debug!(connection = %self.id, error = %e, "Close failed");
        }
        debug!(connection = %self.id, "Connection terminated");

        result
    }

    async fn drive(&mut self) -> Result<(), TransportError> {
        self.state = SupervisorState::Authenticating;
        let Some(username) = self.authenticate().await? else {
            return Ok(());
        };

        let (outbox, mut deliveries) = outbox();
        let guard = match SessionGuard::register(&self.router, self.id, &username, outbox) {
            Ok(guard) => guard,
            Err(e) => {
                error!(connection = %self.id, error = %e, "Session registration failed");
                metrics::record_error("register");
                return Ok(());
            }
        };
        self.state = SupervisorState::Authenticated;

        let result = self.serve(&username, &mut deliveries).await;

        guard.release();
        result
    }

    /// Prompt for credentials and verify them.
    ///
    /// Returns `None` if the peer went away or the credentials were rejected.
    async fn authenticate(&mut self) -> Result<Option<String>, TransportError> {
        self.conn.write_line(reply::USERNAME_PROMPT).await?;
        let Some(username) = self.conn.read_line().await? else {
            debug!(connection = %self.id, "Closed before sending a username");
            return Ok(None);
        };
        let username = username.trim().to_string();

        self.conn.write_line(reply::PASSWORD_PROMPT).await?;
        let Some(password) = self.conn.read_line().await? else {
            debug!(connection = %self.id, user = %username, "Closed before sending a password");
            return Ok(None);
        };

        if !self.credentials.verify(&username, password.trim()) {
            warn!(connection = %self.id, user = %username, "Authentication failed");
            metrics::record_auth_failure();
            self.conn.write_line(reply::AUTH_FAILED).await?;
            return Ok(None);
        }

        info!(connection = %self.id, user = %username, "Authenticated");
        Ok(Some(username))
    }

    async fn serve(
        &mut self,
        username: &str,
        deliveries: &mut OutboxReceiver,
    ) -> Result<(), TransportError> {
        self.conn.write_line(reply::AUTH_SUCCESS).await?;

        loop {
            tokio::select! {
                line = self.conn.read_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if self.dispatch(username, &line).await? == Flow::Exit {
                                info!(connection = %self.id, user = %username, "Requested exit");
                                return Ok(());
                            }
                        }
                        Ok(None) => {
                            info!(connection = %self.id, user = %username, "Disconnected");
                            return Ok(());
                        }
                        Err(e) => {
                            warn!(connection = %self.id, user = %username, error = %e, "Read failed");
                            metrics::record_error("read");
                            return Err(e);
                        }
                    }
                }

                Some(line) = deliveries.recv() => {
                    self.conn.write_line(&line).await?;
                }
            }
        }
    }

    /// Handle one command line.
    async fn dispatch(&mut self, username: &str, line: &str) -> Result<Flow, TransportError> {
        let command = Command::parse(line);
        let kind = command.kind();
        metrics::record_command(kind.as_str());

        let id = self.id;
        let outcome: Result<Option<String>, RouteError> = match command {
            Command::Broadcast { body } => self.router.broadcast(id, body).map(|count| {
                metrics::record_deliveries(count);
                None
            }),
            Command::Private { target, body } => self.router.private(id, target, body).map(|()| {
                metrics::record_deliveries(1);
                None
            }),
            Command::CreateGroup { name } => self
                .router
                .create_group(id, name)
                .map(|()| Some(reply::group_created(name))),
            Command::JoinGroup { name } => self.router.join_group(id, name).map(|count| {
                metrics::record_deliveries(count);
                Some(reply::you_joined(name))
            }),
            Command::LeaveGroup { name } => self.router.leave_group(id, name).map(|count| {
                metrics::record_deliveries(count);
                Some(reply::you_left(name))
            }),
            Command::GroupMessage { group, body } => {
                self.router.group_message(id, group, body).map(|count| {
                    metrics::record_deliveries(count);
                    None
                })
            }
            Command::Exit => return Ok(Flow::Exit),
            Command::Help => Ok(Some(reply::HELP.to_string())),
            Command::Malformed { kind } => {
                debug!(connection = %id, user = %username, command = kind.as_str(), "Ignoring malformed command");
                Ok(None)
            }
            Command::Unknown => Ok(Some(reply::UNKNOWN_COMMAND.to_string())),
        };

        match outcome {
            Ok(Some(text)) => self.conn.write_line(&text).await?,
            Ok(None) => {}
            Err(e) => {
                debug!(connection = %id, user = %username, command = kind.as_str(), error = %e, "Command rejected");
                metrics::record_error("command");
                self.conn.write_line(&e.to_string()).await?;
            }
        }

        Ok(Flow::Continue)
    }
}
