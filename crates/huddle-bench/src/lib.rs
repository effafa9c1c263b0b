//! Shared workload for the Huddle load tools.
//!
//! The users below must exist in the server's credentials file for the
//! `stress` binary to log in.

use rand::seq::SliceRandom;
use rand::Rng;

/// Accounts the load clients log in as, cycled by client index.
pub const USERS: &[(&str, &str)] = &[
    ("alice", "password123"),
    ("bob", "qwerty456"),
    ("charlie", "secure789"),
    ("david", "helloWorld!"),
    ("eve", "trustno1"),
    ("frank", "letmein"),
    ("grace", "passw0rd"),
];

/// Message bodies to pick from.
pub const MESSAGES: &[&str] = &[
    "Hello world!",
    "CS425 is awesome",
    "Testing the server",
    "How's everyone?",
    "Network labs are fun",
    "Lorem ipsum dolor sit amet",
];

/// Groups the load clients create, join and message.
pub const GROUPS: &[&str] = &["CS425", "TestGroup", "Networkers", "CoolGroup", "FridayFun"];

/// Credentials for the `index`-th client.
#[must_use]
pub fn credentials_for(index: usize) -> (&'static str, &'static str) {
    USERS[index % USERS.len()]
}

/// Pick one command line: broadcast, group message, private message,
/// create, join or leave, with equal odds.
pub fn random_command<R: Rng + ?Sized>(rng: &mut R) -> String {
    let message = pick(MESSAGES, rng);
    let group = pick(GROUPS, rng);

    match rng.gen_range(0..6) {
        0 => format!("/broadcast {message}"),
        1 => format!("/group_msg {group} {message}"),
        2 => {
            let (user, _) = USERS.choose(rng).copied().unwrap_or(USERS[0]);
            format!("/msg {user} {message}")
        }
        3 => format!("/create_group {group}"),
        4 => format!("/join_group {group}"),
        _ => format!("/leave_group {group}"),
    }
}

fn pick<R: Rng + ?Sized>(items: &[&'static str], rng: &mut R) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_protocol::{Command, CommandKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_credentials_cycle() {
        assert_eq!(credentials_for(0), ("alice", "password123"));
        assert_eq!(credentials_for(USERS.len() + 1), ("bob", "qwerty456"));
    }

    #[test]
    fn test_random_commands_parse() {
        let mut rng = StdRng::seed_from_u64(425);
        let mut seen = Vec::new();

        for _ in 0..500 {
            let line = random_command(&mut rng);
            let kind = Command::parse(&line).kind();
            assert!(
                !matches!(kind, CommandKind::Malformed | CommandKind::Unknown),
                "{line} parsed as {kind:?}"
            );
            if !seen.contains(&kind) {
                seen.push(kind);
            }
        }

        assert_eq!(seen.len(), 6);
    }
}
