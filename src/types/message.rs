use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Content, Role};

/// One entry of the session timeline.
///
/// Messages are stamped once when they are appended and never change after
/// that.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Who authored the message.
    pub role: Role,

    /// What the message says.
    pub content: Content,

    /// When the message was appended.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,
}

impl Message {
    /// Creates a message stamped with the given instant.
    pub fn new(role: Role, content: Content, timestamp: OffsetDateTime) -> Self {
        Self {
            role,
            content,
            timestamp,
        }
    }

    /// Returns the message text if the content is plain text.
    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }
}
