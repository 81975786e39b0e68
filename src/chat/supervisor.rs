//! Connection supervision: status labels, close classification, notices and
//! reconnect suppression.

use std::fmt;

use crate::chat::session::Mode;
use crate::error::Error;
use crate::observability::{STREAM_CONNECTS, STREAM_CONNECTS_SUPPRESSED};
use crate::observer::Notice;
use crate::transport::CloseInfo;

/// User-facing connection status.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No interactive session; requests go to the ask endpoint.
    Standard,
    /// An interactive session is being established.
    Connecting,
    /// An interactive session is open.
    Connected,
}

impl ConnectionStatus {
    /// A stable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Standard => "Standard Mode",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Interactive Mode",
        }
    }
}

impl From<Mode> for ConnectionStatus {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Stateless => ConnectionStatus::Standard,
            Mode::Connecting => ConnectionStatus::Connecting,
            Mode::Interactive => ConnectionStatus::Connected,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a connection ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CloseKind {
    /// Closed with code 1000.
    Normal,
    /// Closed with any other code.
    Abnormal,
}

/// Classifies a close by its code.
pub fn classify_close(info: &CloseInfo) -> CloseKind {
    if info.is_normal() {
        CloseKind::Normal
    } else {
        CloseKind::Abnormal
    }
}

/// The `connection_error` text for an abnormal close.
pub fn describe_close(info: &CloseInfo) -> String {
    format!("Connection closed unexpectedly (Code: {})", info.code)
}

/// The `connection_error` text for a socket failure.
pub fn describe_failure() -> String {
    "Connection error occurred".to_string()
}

/// The error an ended connection leaves behind, or `None` for a normal close.
pub fn close_error(info: &CloseInfo) -> Option<Error> {
    match classify_close(info) {
        CloseKind::Normal => None,
        CloseKind::Abnormal => Some(Error::connection_closed(
            describe_close(info),
            Some(info.code),
        )),
    }
}

/// The error a failed socket leaves behind.
pub fn failure_error() -> Error {
    Error::connection_closed(describe_failure(), None)
}

pub(crate) fn connected_notice() -> Notice {
    Notice::info("Connected", "Interactive session started")
}

pub(crate) fn ended_notice() -> Notice {
    Notice::info("Session Ended", "Interactive session completed")
}

pub(crate) fn lost_notice() -> Notice {
    Notice::error("Connection Lost", "Interactive session ended")
}

pub(crate) fn connect_failed_notice() -> Notice {
    Notice::error("Connection Error", "Failed to establish connection")
}

pub(crate) fn request_failed_notice(detail: &str) -> Notice {
    Notice::error("Request Failed", detail)
}

pub(crate) fn uploaded_notice(file_name: &str) -> Notice {
    Notice::info("File Uploaded", format!("{file_name} uploaded successfully"))
}

pub(crate) fn upload_failed_notice(detail: &str) -> Notice {
    Notice::error("Upload Failed", detail)
}

pub(crate) fn send_failed_notice(detail: &str) -> Notice {
    Notice::error("Send Failed", detail)
}

/// Decides when a connection may be opened.
///
/// A connection is only ever opened in answer to a fresh escalation signal,
/// and never while another one is live.  Nothing reconnects on its own.
#[derive(Debug, Default)]
pub struct Supervisor {
    connects: u64,
    suppressed: u64,
}

impl Supervisor {
    /// Creates a supervisor with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a connection may be opened now.
    pub fn permit_connect(&mut self, live: bool) -> bool {
        if live {
            self.suppressed += 1;
            STREAM_CONNECTS_SUPPRESSED.click();
            tracing::debug!("interactive connection already live; not connecting again");
            false
        } else {
            self.connects += 1;
            STREAM_CONNECTS.click();
            true
        }
    }

    /// Number of connections opened so far.
    pub fn connects(&self) -> u64 {
        self.connects
    }

    /// Number of connect attempts refused because one was already live.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}
