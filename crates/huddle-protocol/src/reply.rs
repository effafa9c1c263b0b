//! User-visible texts.
//!
//! Every line the server writes to a client is built here, so the wording stays
//! in one place. Lines are written without a terminator; the codec appends
//! `\n`.

/// Prompt sent before reading the username.
pub const USERNAME_PROMPT: &str = "Enter username: ";

/// Prompt sent before reading the password.
pub const PASSWORD_PROMPT: &str = "Enter password: ";

/// Sent once credentials have been accepted.
pub const AUTH_SUCCESS: &str = "Authentication successful!";

/// Sent before closing a connection whose credentials were rejected.
pub const AUTH_FAILED: &str = "[Error] Authentication failed. Invalid username or password.";

/// Sent for any line that is not a recognised command.
pub const UNKNOWN_COMMAND: &str = "[Error] Unknown command. Use /help for available commands.";

/// Sent before closing a connection refused by the connection limit.
pub const SERVER_FULL: &str = "[Error] Server is full. Try again later.";

/// Reply to `/help`.
pub const HELP: &str = "Commands: /broadcast <message> | /msg <username> <message> | \
/create_group <group> | /join_group <group> | /leave_group <group> | \
/group_msg <group> <message> | /exit";

/// `[Broadcast from <sender>]: <body>`
#[must_use]
pub fn broadcast(sender: &str, body: &str) -> String {
    format!("[Broadcast from {sender}]: {body}")
}

/// `[Private from <sender>]: <body>`
#[must_use]
pub fn private(sender: &str, body: &str) -> String {
    format!("[Private from {sender}]: {body}")
}

/// `[Group <group>] <sender> <body>`
#[must_use]
pub fn group_message(group: &str, sender: &str, body: &str) -> String {
    format!("[Group {group}] {sender} {body}")
}

/// Confirmation to the creator of a group.
#[must_use]
pub fn group_created(group: &str) -> String {
    format!("Group {group} created.")
}

/// Confirmation to a user who joined a group.
#[must_use]
pub fn you_joined(group: &str) -> String {
    format!("You joined the group {group}.")
}

/// Confirmation to a user who left a group.
#[must_use]
pub fn you_left(group: &str) -> String {
    format!("You left the group {group}.")
}

/// Announcement to the other members of a group.
#[must_use]
pub fn member_joined(group: &str, user: &str) -> String {
    format!("[Group {group}] {user} has joined.")
}

/// Announcement to the remaining members of a group.
#[must_use]
pub fn member_left(group: &str, user: &str) -> String {
    format!("[Group {group}] {user} has left.")
}

/// Global arrival announcement.
#[must_use]
pub fn user_joined_chat(user: &str) -> String {
    format!("{user} has joined the chat.")
}

/// Global departure announcement.
#[must_use]
pub fn user_left_chat(user: &str) -> String {
    format!("{user} has left the chat.")
}
