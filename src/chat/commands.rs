//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the backend.

use std::path::PathBuf;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display the connection status and message count.
    Status,

    /// Print the timeline with message numbers.
    History,

    /// Re-send an edited copy of a user message.
    Edit {
        /// Zero-based timeline index.
        index: usize,
        /// The replacement text.
        text: String,
    },

    /// Upload a file.
    Upload(PathBuf),

    /// Pick an option from the most recent card selection.
    Select(usize),

    /// List the most recently extracted sources.
    Sources,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// Message and option numbers are one-based, as printed by `/history`.
///
/// # Examples
///
/// ```
/// # use concierge::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/upload ./invoice.pdf").is_some());
/// assert!(parse_command("When is my next service?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "status" | "stats" => ChatCommand::Status,
        "history" => ChatCommand::History,
        "sources" => ChatCommand::Sources,
        "upload" => match argument {
            Some(path) => ChatCommand::Upload(PathBuf::from(path)),
            None => ChatCommand::Invalid("/upload requires a file path".to_string()),
        },
        "select" => match parse_position(argument, "/select") {
            Ok(index) => ChatCommand::Select(index),
            Err(err) => ChatCommand::Invalid(err),
        },
        "edit" => parse_edit_command(argument),
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_edit_command(argument: Option<&str>) -> ChatCommand {
    let Some(argument) = argument else {
        return ChatCommand::Invalid("/edit requires a message number and text".to_string());
    };
    let mut parts = argument.splitn(2, ' ');
    let index = match parse_position(parts.next(), "/edit") {
        Ok(index) => index,
        Err(err) => return ChatCommand::Invalid(err),
    };
    match parts.next().map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => ChatCommand::Edit {
            index,
            text: text.to_string(),
        },
        None => ChatCommand::Invalid("/edit requires replacement text".to_string()),
    }
}

fn parse_position(argument: Option<&str>, name: &str) -> Result<usize, String> {
    let Some(argument) = argument else {
        return Err(format!("{name} requires a number"));
    };
    match argument.parse::<usize>() {
        Ok(position) if position > 0 => Ok(position - 1),
        _ => Err(format!("{name} expects a positive integer")),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /status                Show connection status and message count
  /history               Show the conversation with message numbers
  /edit <n> <text>       Send an edited copy of message n
  /upload <path>         Upload a file
  /select <n>            Pick option n from the latest selection cards
  /sources               List the sources of the latest table
  /help                  Show this help message
  /quit                  Exit the chat"#
}
