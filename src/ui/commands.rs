//! Compose-box commands starting with `/`.
//!
//! Commands are handled locally and never transmitted to the peer.

use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// `/hangup`: same as the disconnect control.
    Hangup,
    /// `/help`: list the commands.
    Help,
}

pub const COMMAND_HELP: &[(&str, &str)] = &[
    ("/hangup", "End the current chat"),
    ("/help", "Show available commands"),
];

/// One-line summary for the status bar.
pub fn help_line() -> String {
    COMMAND_HELP
        .iter()
        .map(|(cmd, desc)| format!("{cmd}: {desc}"))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Parse `input` as a command.
///
/// `None` means a regular message. `Some(Err(..))` carries the text to show
/// for an unknown command.
pub fn parse_command(input: &str) -> Option<Result<ChatCommand, String>> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let cmd = trimmed.split_whitespace().next()?;
    match cmd {
        "/hangup" => Some(Ok(ChatCommand::Hangup)),
        "/help" => Some(Ok(ChatCommand::Help)),
        _ => {
            warn!(event = "unknown_command", command = %cmd, "Unknown chat command");
            Some(Err(format!("Unknown command: {cmd}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_message_is_not_a_command() {
        assert!(parse_command("hello world").is_none());
        assert!(parse_command("  ").is_none());
        assert!(parse_command("a/b").is_none());
    }

    #[test]
    fn known_commands() {
        assert_eq!(parse_command("/hangup"), Some(Ok(ChatCommand::Hangup)));
        assert_eq!(parse_command(" /help me "), Some(Ok(ChatCommand::Help)));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert_eq!(
            parse_command("/clear"),
            Some(Err("Unknown command: /clear".into()))
        );
    }

    #[test]
    fn help_lists_every_command() {
        let line = help_line();
        assert!(line.contains("/hangup"));
        assert!(line.contains("/help"));
    }
}
