//! Command grammar for Huddle.
//!
//! Every inbound line after authentication is one command. Commands are
//! recognised by a case-sensitive keyword prefix; whatever follows the prefix
//! is parsed according to the command.

/// Command kind identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Broadcast,
    Private,
    CreateGroup,
    JoinGroup,
    LeaveGroup,
    GroupMessage,
    Exit,
    Help,
    Malformed,
    Unknown,
}

impl CommandKind {
    /// Stable lowercase label, used for logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Broadcast => "broadcast",
            CommandKind::Private => "msg",
            CommandKind::CreateGroup => "create_group",
            CommandKind::JoinGroup => "join_group",
            CommandKind::LeaveGroup => "leave_group",
            CommandKind::GroupMessage => "group_msg",
            CommandKind::Exit => "exit",
            CommandKind::Help => "help",
            CommandKind::Malformed => "malformed",
            CommandKind::Unknown => "unknown",
        }
    }
}

const BROADCAST: &str = "/broadcast ";
const PRIVATE: &str = "/msg ";
const CREATE_GROUP: &str = "/create_group ";
const JOIN_GROUP: &str = "/join_group ";
const LEAVE_GROUP: &str = "/leave_group ";
const GROUP_MESSAGE: &str = "/group_msg ";
const EXIT: &str = "/exit";
const HELP: &str = "/help";

/// A decoded client command.
///
/// Borrows from the line it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// `/broadcast <body>`
    Broadcast { body: &'a str },

    /// `/msg <username> <body>`
    Private { target: &'a str, body: &'a str },

    /// `/create_group <name>`
    CreateGroup { name: &'a str },

    /// `/join_group <name>`
    JoinGroup { name: &'a str },

    /// `/leave_group <name>`
    LeaveGroup { name: &'a str },

    /// `/group_msg <name> <body>`
    GroupMessage { group: &'a str, body: &'a str },

    /// `/exit`
    Exit,

    /// `/help`
    Help,

    /// A recognised keyword whose arguments could not be split
    /// (e.g. `/msg bob` without a body).
    Malformed { kind: CommandKind },

    /// Anything else.
    Unknown,
}

impl<'a> Command<'a> {
    /// Parse one line into a command.
    ///
    /// Never fails: unrecognised input becomes [`Command::Unknown`].
    #[must_use]
    pub fn parse(line: &'a str) -> Self {
        if let Some(body) = line.strip_prefix(BROADCAST) {
            Command::Broadcast { body }
        } else if let Some(rest) = line.strip_prefix(PRIVATE) {
            match split_target(rest) {
                Some((target, body)) => Command::Private { target, body },
                None => Command::Malformed {
                    kind: CommandKind::Private,
                },
            }
        } else if let Some(rest) = line.strip_prefix(CREATE_GROUP) {
            Command::CreateGroup { name: rest.trim() }
        } else if let Some(rest) = line.strip_prefix(JOIN_GROUP) {
            Command::JoinGroup { name: rest.trim() }
        } else if let Some(rest) = line.strip_prefix(LEAVE_GROUP) {
            Command::LeaveGroup { name: rest.trim() }
        } else if let Some(rest) = line.strip_prefix(GROUP_MESSAGE) {
            match split_target(rest) {
                Some((group, body)) => Command::GroupMessage { group, body },
                None => Command::Malformed {
                    kind: CommandKind::GroupMessage,
                },
            }
        } else if line == EXIT {
            Command::Exit
        } else if line == HELP {
            Command::Help
        } else {
            Command::Unknown
        }
    }

    /// Get the command kind.
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Broadcast { .. } => CommandKind::Broadcast,
            Command::Private { .. } => CommandKind::Private,
            Command::CreateGroup { .. } => CommandKind::CreateGroup,
            Command::JoinGroup { .. } => CommandKind::JoinGroup,
            Command::LeaveGroup { .. } => CommandKind::LeaveGroup,
            Command::GroupMessage { .. } => CommandKind::GroupMessage,
            Command::Exit => CommandKind::Exit,
            Command::Help => CommandKind::Help,
            Command::Malformed { .. } => CommandKind::Malformed,
            Command::Unknown => CommandKind::Unknown,
        }
    }
}

/// Split `<token> <rest>` at the first space.
fn split_target(rest: &str) -> Option<(&str, &str)> {
    rest.split_once(' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_broadcast_keeps_body_verbatim() {
        assert_eq!(
            Command::parse("/broadcast hi  there "),
            Command::Broadcast {
                body: "hi  there "
            }
        );
    }

    #[test]
    fn test_parse_private() {
        assert_eq!(
            Command::parse("/msg bob secret plans"),
            Command::Private {
                target: "bob",
                body: "secret plans"
            }
        );
    }

    #[test]
    fn test_parse_private_without_body_is_malformed() {
        assert_eq!(
            Command::parse("/msg bob"),
            Command::Malformed {
                kind: CommandKind::Private
            }
        );
    }

    #[test]
    fn test_parse_group_commands_trim_name() {
        assert_eq!(
            Command::parse("/create_group CS425  "),
            Command::CreateGroup { name: "CS425" }
        );
        assert_eq!(
            Command::parse("/join_group CS425\t"),
            Command::JoinGroup { name: "CS425" }
        );
        assert_eq!(
            Command::parse("/leave_group  CS425"),
            Command::LeaveGroup { name: "CS425" }
        );
    }

    #[test]
    fn test_parse_group_message() {
        assert_eq!(
            Command::parse("/group_msg CS425 hello everyone"),
            Command::GroupMessage {
                group: "CS425",
                body: "hello everyone"
            }
        );
        assert_eq!(
            Command::parse("/group_msg CS425").kind(),
            CommandKind::Malformed
        );
    }

    #[test]
    fn test_exit_and_help_are_exact() {
        assert_eq!(Command::parse("/exit"), Command::Exit);
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("/exit now"), Command::Unknown);
        assert_eq!(Command::parse("/exit "), Command::Unknown);
    }

    #[test]
    fn test_prefix_is_case_sensitive_and_needs_space() {
        assert_eq!(Command::parse("/BROADCAST hi"), Command::Unknown);
        assert_eq!(Command::parse("/broadcast"), Command::Unknown);
        assert_eq!(Command::parse("hello"), Command::Unknown);
        assert_eq!(Command::parse(""), Command::Unknown);
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(CommandKind::GroupMessage.as_str(), "group_msg");
        assert_eq!(Command::parse("/msg a b").kind().as_str(), "msg");
    }
}
