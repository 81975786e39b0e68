//! Payloads exchanged with the backend that are not timeline content.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `type` value announcing that the backend wants an interactive session.
pub const INTERACTIVE_SESSION_START: &str = "interactive_session_start";

/// The `type` value of a message authored by a named agent.
pub const AGENT_MESSAGE: &str = "agent_message";

/// The `type` value of the closing summary of an interactive exchange.
pub const FINAL_ANSWER: &str = "final_answer";

/// Body of a request to the ask endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskRequest {
    /// The user's query, verbatim.
    pub query: String,
}

impl AskRequest {
    /// Creates a new request.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// The raw body of a successful ask call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePayload {
    /// The decoded body text.
    pub body: String,
}

impl ResponsePayload {
    /// Wraps a response body.
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

/// Signals that drive mode transitions and never reach the timeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControlSignal {
    /// The backend escalated to a persistent interactive session.
    InteractiveSessionStart,
}

/// Acknowledgement returned by the upload endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadAck {
    /// The name the file was uploaded under.
    pub file_name: String,
    /// The server's response body, decoded if it was JSON.
    pub response: Option<Value>,
}

/// Error body the backend sends with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Option<Value>,
}
