//! Interactive terminal client for the concierge backend.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a backend on localhost:8000
//! concierge-chat
//!
//! # Point at another deployment
//! concierge-chat --base-url https://dealer.example.com/
//!
//! # Disable colors and log debug output to stderr
//! concierge-chat --no-color --verbose
//! ```
//!
//! # Commands
//!
//! - `/status` - Show connection status and message count
//! - `/history` - Show the conversation with message numbers
//! - `/edit <n> <text>` - Send an edited copy of message n
//! - `/upload <path>` - Upload a file
//! - `/select <n>` - Pick option n from the latest selection cards
//! - `/sources` - List the sources of the latest table
//! - `/quit` - Exit the application

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use concierge::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, ConnectionStatus, Dispatcher, Intent,
    PlainTextRenderer, Renderer, help_text, parse_command,
};
use concierge::{Citation, Message, Notice, Role, SessionObserver, StructuredKind};

/// Prints session activity as it happens.
struct TerminalObserver {
    renderer: Mutex<PlainTextRenderer>,
    appended: AtomicUsize,
}

impl TerminalObserver {
    fn new(use_color: bool) -> Self {
        Self {
            renderer: Mutex::new(PlainTextRenderer::with_color(use_color)),
            appended: AtomicUsize::new(0),
        }
    }
}

impl SessionObserver for TerminalObserver {
    fn on_message(&self, message: &Message) {
        let number = self.appended.fetch_add(1, Ordering::Relaxed) + 1;
        // The user just typed it.
        if message.role == Role::User {
            return;
        }
        if let Ok(mut renderer) = self.renderer.lock() {
            renderer.print_message(number, message);
        }
    }

    fn on_status(&self, status: ConnectionStatus) {
        if let Ok(mut renderer) = self.renderer.lock() {
            renderer.print_status(status);
        }
    }

    fn on_notice(&self, notice: &Notice) {
        if let Ok(mut renderer) = self.renderer.lock() {
            renderer.print_notice(notice);
        }
    }

    fn on_sources_extracted(&self, citations: &[Citation]) {
        tracing::debug!(count = citations.len(), "sources extracted");
    }
}

/// What the line-reader thread reports.
enum Input {
    Line(String),
    Interrupted,
    Eof,
    Failed(String),
}

fn spawn_line_reader(tx: mpsc::UnboundedSender<Input>) -> rustyline::Result<()> {
    let mut rl = DefaultEditor::new()?;
    std::thread::spawn(move || {
        loop {
            let input = match rl.readline("You: ") {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    Input::Line(line)
                }
                Err(ReadlineError::Interrupted) => Input::Interrupted,
                Err(ReadlineError::Eof) => Input::Eof,
                Err(err) => Input::Failed(err.to_string()),
            };
            let done = matches!(input, Input::Eof | Input::Failed(_));
            if tx.send(input).is_err() || done {
                break;
            }
        }
    });
    Ok(())
}

/// Main entry point for the concierge-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("concierge-chat [OPTIONS]");
    let config = ChatConfig::from(args);

    let default_level = if config.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut session = ChatSession::from_config(&config)?;
    session.add_observer(Arc::new(TerminalObserver::new(config.use_color)));
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut dispatcher = Dispatcher::new().with_option_handler(|session, option| {
        let reply = option.value_text().unwrap_or_else(|| option.label());
        session.send(&reply);
    });

    let (line_tx, mut lines) = mpsc::unbounded_channel();
    spawn_line_reader(line_tx)?;

    let (interrupt_tx, mut interrupts) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    })?;

    println!("Concierge Chat ({})", session.status());
    println!("Type /help for commands, /quit to exit\n");

    loop {
        tokio::select! {
            input = lines.recv() => match input {
                Some(Input::Line(line)) => {
                    if !handle_line(&line, &mut session, &mut dispatcher, &mut renderer) {
                        break;
                    }
                }
                Some(Input::Interrupted) => continue,
                Some(Input::Eof) | None => break,
                Some(Input::Failed(err)) => {
                    renderer.print_error(&format!("Input error: {err}"));
                    break;
                }
            },
            _ = interrupts.recv() => break,
            event = session.next_event() => session.handle_event(event),
        }
    }

    session.shutdown().await;
    println!("\nGoodbye!");
    Ok(())
}

/// Handles one line of input.  Returns false when the user asked to quit.
fn handle_line(
    line: &str,
    session: &mut ChatSession,
    dispatcher: &mut Dispatcher,
    renderer: &mut PlainTextRenderer,
) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return true;
    }
    let Some(command) = parse_command(line) else {
        let _ = dispatcher.dispatch(session, Intent::Send(line.to_string()));
        return true;
    };

    let result = match command {
        ChatCommand::Quit => return false,
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
            Ok(())
        }
        ChatCommand::Status => {
            print_status(session);
            Ok(())
        }
        ChatCommand::History => {
            for (index, message) in session.timeline().iter().enumerate() {
                renderer.print_message(index + 1, message);
            }
            Ok(())
        }
        ChatCommand::Edit { index, text } => {
            dispatcher.dispatch(session, Intent::Edit { index, text })
        }
        ChatCommand::Upload(path) => dispatcher.dispatch(session, Intent::Upload(path)),
        ChatCommand::Select(index) => {
            let option = session
                .timeline()
                .iter()
                .rev()
                .filter_map(|message| message.content.as_structured())
                .find(|structured| structured.kind == StructuredKind::CardSelection)
                .and_then(|structured| structured.selection_options())
                .and_then(|options| options.into_iter().nth(index));
            match option {
                Some(option) => dispatcher.dispatch(session, Intent::SelectOption(option)),
                None => {
                    renderer.print_error(&format!("No option {} to select", index + 1));
                    Ok(())
                }
            }
        }
        ChatCommand::Sources => {
            renderer.print_sources(session.sources());
            Ok(())
        }
        ChatCommand::Invalid(message) => {
            renderer.print_error(&message);
            Ok(())
        }
    };
    if let Err(err) = result {
        renderer.print_error(&err.user_detail());
    }
    true
}

fn print_status(session: &ChatSession) {
    println!("    Session Status:");
    println!("      Mode: {}", session.status());
    println!("      Messages: {}", session.message_count());
    println!(
        "      Request pending: {}",
        if session.pending() { "yes" } else { "no" }
    );
    println!(
        "      Awaiting agent: {}",
        if session.awaiting_agent_reply() {
            "yes"
        } else {
            "no"
        }
    );
    match session.connection_error() {
        Some(error) => println!("      Last connection error: {error}"),
        None => println!("      Last connection error: (none)"),
    }
}
