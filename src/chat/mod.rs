//! Chat session controller and its terminal front end.
//!
//! This module provides the session state machine that mediates between a
//! user and the multi-agent backend, plus the pieces the `concierge-chat`
//! binary builds on:
//!
//! - [`session`]: timeline, mode and connection lifecycle
//! - [`supervisor`]: status labels, close classification and reconnect suppression
//! - [`intent`]: user intents and their dispatch
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: slash command parsing
//! - [`render`]: plain-text output

pub mod commands;
pub mod config;
pub mod intent;
pub mod render;
pub mod session;
pub mod supervisor;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{BASE_URL_ENV, ChatArgs, ChatConfig};
pub use intent::{Dispatcher, Intent, OptionHandler};
pub use render::{PlainTextRenderer, Renderer};
pub use session::{ChatSession, Mode, SessionEvent};
pub use supervisor::{CloseKind, ConnectionStatus, Supervisor};
