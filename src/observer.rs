//! Observer trait for session activity.
//!
//! The [`SessionObserver`] trait lets a presentation layer follow a
//! [`ChatSession`](crate::chat::ChatSession) without polling it: appended
//! messages, status changes, user notices and extracted sources are all
//! reported as they happen.
//!
//! # Example
//!
//! ```rust,ignore
//! use concierge::{Citation, SessionObserver};
//! use std::sync::Mutex;
//!
//! struct SourceList {
//!     sources: Mutex<Vec<Citation>>,
//! }
//!
//! impl SessionObserver for SourceList {
//!     fn on_sources_extracted(&self, citations: &[Citation]) {
//!         self.sources.lock().unwrap().extend_from_slice(citations);
//!     }
//! }
//! ```

use crate::chat::ConnectionStatus;
use crate::types::{Citation, Message, SelectionOption};

/// How prominently a notice should be shown.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    /// Something good happened.
    Info,
    /// Something went wrong and the user should know.
    Error,
}

/// A short, transient user notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// One or two word headline.
    pub title: String,
    /// A sentence of detail.
    pub description: String,
    /// How prominently to show it.
    pub severity: Severity,
}

impl Notice {
    /// An informational notice.
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    /// An error notice.
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }

    /// Returns true for error notices.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Receives session activity.
///
/// Every method has an empty default so implementors pick only what they need.
/// Methods are called synchronously from the task driving the session and
/// should not block.
pub trait SessionObserver: Send + Sync {
    /// A message was appended to the timeline.
    fn on_message(&self, _message: &Message) {}

    /// The connection status changed.
    fn on_status(&self, _status: ConnectionStatus) {}

    /// Something happened the user should be told about.
    fn on_notice(&self, _notice: &Notice) {}

    /// A table payload carried source citations.
    fn on_sources_extracted(&self, _citations: &[Citation]) {}

    /// The user picked a card and no handler was registered for it.
    fn on_option_unhandled(&self, _option: &SelectionOption) {}
}
