//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction so the timeline
//! can be shown in different styles.  The default implementation prints plain
//! text with optional ANSI escape codes.

use std::io::{self, Stdout, Write};

use crate::chat::supervisor::ConnectionStatus;
use crate::observer::{Notice, Severity};
use crate::types::{
    AnswerPayload, Citation, Content, Message, Role, StructuredContent, StructuredKind,
};

/// ANSI escape code for dim text (used for timestamps and descriptions).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for titles).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for agent names).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for system messages).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for positive notices).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print one timeline entry.  `number` is one-based.
    fn print_message(&mut self, number: usize, message: &Message);

    /// Print a transient notice.
    fn print_notice(&mut self, notice: &Notice);

    /// Print a status change.
    fn print_status(&mut self, status: ConnectionStatus);

    /// Print extracted source citations.
    fn print_sources(&mut self, citations: &[Citation]);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn style(&self, code: &str, text: &str) -> String {
        if self.use_color {
            format!("{code}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn emit(&mut self, text: &str) {
        let mut out = self.stdout.lock();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }

    /// Formats a timeline entry the way [`Renderer::print_message`] prints it.
    pub fn format_message(&self, number: usize, message: &Message) -> String {
        let author = author_label(&message.role);
        let author = match &message.role {
            Role::Agent(_) => self.style(ANSI_CYAN, &author),
            Role::System => self.style(ANSI_YELLOW, &author),
            Role::User | Role::Assistant => self.style(ANSI_BOLD, &author),
        };
        let time = format!(
            "{:02}:{:02}:{:02}",
            message.timestamp.hour(),
            message.timestamp.minute(),
            message.timestamp.second()
        );
        let header = format!("[{number}] {author} {}", self.style(ANSI_DIM, &time));
        let body = match &message.content {
            Content::Text { text } => text.clone(),
            Content::Structured(structured) => self.format_structured(structured),
        };
        format!("{header}\n{body}")
    }

    fn format_structured(&self, structured: &StructuredContent) -> String {
        let mut out = String::new();
        if let Some(description) = &structured.description {
            out.push_str(&self.style(ANSI_DIM, description));
            out.push('\n');
        }
        let body = match structured.kind {
            StructuredKind::Table => structured.table().map(|table| {
                let mut lines = vec![table.headers.join(" | ")];
                lines.push(
                    table
                        .headers
                        .iter()
                        .map(|h| "-".repeat(h.chars().count().max(3)))
                        .collect::<Vec<_>>()
                        .join("-|-"),
                );
                lines.extend(table.rows.iter().map(|row| row.join(" | ")));
                if !table.citations.is_empty() {
                    lines.push(format!("({} sources, see /sources)", table.citations.len()));
                }
                lines.join("\n")
            }),
            StructuredKind::Pricing => structured.pricing_items().map(|items| {
                let mut lines = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    let mut title = item.display_title(index);
                    if item.recommended {
                        title.push_str(" (recommended)");
                    }
                    let price = item.price.clone().unwrap_or_default();
                    lines.push(format!("* {} {price}", self.style(ANSI_BOLD, &title)));
                    if let Some(description) = &item.description {
                        lines.push(format!("  {description}"));
                    }
                    for feature in &item.features {
                        lines.push(format!("  - {feature}"));
                    }
                }
                lines.join("\n")
            }),
            StructuredKind::CardSelection => structured.selection_options().map(|options| {
                options
                    .iter()
                    .enumerate()
                    .map(|(index, option)| {
                        let mut line = format!("  {}. {}", index + 1, option.label());
                        if let Some(description) = &option.description {
                            line.push_str(&format!(" - {description}"));
                        }
                        line
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }),
            StructuredKind::Answer => structured.answer().map(|answer| match answer {
                AnswerPayload::Text(text) => text,
                AnswerPayload::Raw(value) => value.to_string(),
            }),
            StructuredKind::Unknown => None,
        };
        out.push_str(&body.unwrap_or_else(|| structured.data.to_string()));
        out
    }

    /// Formats a notice the way [`Renderer::print_notice`] prints it.
    pub fn format_notice(&self, notice: &Notice) -> String {
        let color = match notice.severity {
            Severity::Info => ANSI_GREEN,
            Severity::Error => ANSI_RED,
        };
        format!(
            "{} {}",
            self.style(color, &format!("[{}]", notice.title)),
            notice.description
        )
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, number: usize, message: &Message) {
        let text = self.format_message(number, message);
        self.emit(&text);
    }

    fn print_notice(&mut self, notice: &Notice) {
        let text = self.format_notice(notice);
        self.emit(&text);
    }

    fn print_status(&mut self, status: ConnectionStatus) {
        let text = self.style(ANSI_DIM, &format!("-- {} --", status.label()));
        self.emit(&text);
    }

    fn print_sources(&mut self, citations: &[Citation]) {
        if citations.is_empty() {
            self.emit("No sources.");
            return;
        }
        let lines = citations
            .iter()
            .enumerate()
            .map(|(index, citation)| format!("  {}. {}", index + 1, citation.url))
            .collect::<Vec<_>>()
            .join("\n");
        self.emit(&format!("Sources:\n{lines}"));
    }

    fn print_error(&mut self, error: &str) {
        let text = self.style(ANSI_RED, &format!("Error: {error}"));
        let _ = writeln!(io::stderr(), "{text}");
    }

    fn print_info(&mut self, info: &str) {
        self.emit(info);
    }
}

fn author_label(role: &Role) -> String {
    match role {
        Role::User => "You".to_string(),
        Role::Assistant => "Assistant".to_string(),
        Role::System => "System".to_string(),
        Role::Agent(kind) => kind.display_name().to_string(),
    }
}
