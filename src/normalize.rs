//! Conversion of backend payloads into timeline content.
//!
//! The same rules apply to ask-endpoint bodies and to interactive frames, so
//! both paths produce identical messages for identical payloads.

use serde_json::{Map, Value};

use crate::types::wire::{AGENT_MESSAGE, FINAL_ANSWER, INTERACTIVE_SESSION_START};
use crate::types::{
    AgentKind, Citation, Content, ControlSignal, Role, StructuredContent, StructuredKind,
    TableView,
};

/// A normalized timeline entry, not yet stamped.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry {
    /// Author of the entry.
    pub role: Role,
    /// Body of the entry.
    pub content: Content,
    /// Citations extracted from a table payload; empty otherwise.
    pub citations: Vec<Citation>,
}

impl NormalizedEntry {
    fn new(role: Role, content: Content) -> Self {
        Self {
            role,
            content,
            citations: Vec::new(),
        }
    }

    fn assistant_text(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Content::text(text))
    }

    fn unknown(raw: Value) -> Self {
        Self::new(
            Role::Assistant,
            Content::Structured(StructuredContent::unknown(raw)),
        )
    }
}

/// The outcome of normalizing one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// A signal for the session; must never be appended.
    Control(ControlSignal),
    /// Something to append to the timeline.
    Entry(NormalizedEntry),
}

impl Normalized {
    /// Returns the entry, if this is not a control signal.
    pub fn entry(self) -> Option<NormalizedEntry> {
        match self {
            Normalized::Entry(entry) => Some(entry),
            Normalized::Control(_) => None,
        }
    }
}

/// Parses `raw` as JSON, returning `None` when it is not JSON at all.
pub fn try_parse_structured(raw: &str) -> Option<Value> {
    serde_json::from_str(raw).ok()
}

/// Normalizes a raw payload.
pub fn normalize(raw: &str) -> Normalized {
    match try_parse_structured(raw) {
        Some(value @ (Value::Object(_) | Value::String(_) | Value::Array(_))) => {
            normalize_value(value)
        }
        // Scalars such as `42` or `true` are plain text that happens to parse.
        Some(_) | None => Normalized::Entry(NormalizedEntry::assistant_text(raw)),
    }
}

/// Normalizes an already-parsed payload.
pub fn normalize_value(value: Value) -> Normalized {
    match value {
        Value::Object(object) => normalize_object(object),
        Value::String(text) => Normalized::Entry(NormalizedEntry::assistant_text(text)),
        Value::Null => Normalized::Entry(NormalizedEntry::assistant_text(String::new())),
        scalar @ (Value::Bool(_) | Value::Number(_)) => {
            Normalized::Entry(NormalizedEntry::assistant_text(scalar.to_string()))
        }
        array @ Value::Array(_) => {
            tracing::warn!("payload is a bare array; keeping it as unknown content");
            Normalized::Entry(NormalizedEntry::unknown(array))
        }
    }
}

fn normalize_object(mut object: Map<String, Value>) -> Normalized {
    let ty = match object.get("type") {
        Some(Value::String(ty)) => ty.clone(),
        Some(_) => {
            tracing::warn!("payload has a non-string type; keeping it as unknown content");
            return Normalized::Entry(NormalizedEntry::unknown(Value::Object(object)));
        }
        None => {
            return match object.get("text") {
                Some(Value::String(text)) => {
                    Normalized::Entry(NormalizedEntry::assistant_text(text.clone()))
                }
                _ => Normalized::Entry(NormalizedEntry::unknown(Value::Object(object))),
            };
        }
    };

    match ty.as_str() {
        INTERACTIVE_SESSION_START => Normalized::Control(ControlSignal::InteractiveSessionStart),
        AGENT_MESSAGE => {
            let Some(Value::String(text)) = object.get("text") else {
                tracing::warn!("agent message without text; keeping it as unknown content");
                return Normalized::Entry(NormalizedEntry::unknown(Value::Object(object)));
            };
            let sender = object
                .get("sender")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let kind = AgentKind::from_sender(sender);
            if kind == AgentKind::Generic {
                tracing::debug!(sender, "unrecognized agent; using the generic agent role");
            }
            Normalized::Entry(NormalizedEntry::new(
                Role::Agent(kind),
                Content::text(text.clone()),
            ))
        }
        FINAL_ANSWER => match object.get("text") {
            Some(Value::String(text)) => {
                Normalized::Entry(NormalizedEntry::assistant_text(text.clone()))
            }
            _ => {
                tracing::warn!("final answer without text; keeping it as unknown content");
                Normalized::Entry(NormalizedEntry::unknown(Value::Object(object)))
            }
        },
        other => match StructuredKind::from_type(other) {
            Some(StructuredKind::Table) => {
                let Some(table) = object.get("data").and_then(TableView::from_data) else {
                    tracing::warn!("table payload without row array; keeping it as unknown content");
                    return Normalized::Entry(NormalizedEntry::unknown(Value::Object(object)));
                };
                let mut entry = structured_entry(StructuredKind::Table, &mut object);
                entry.citations = table.citations;
                Normalized::Entry(entry)
            }
            Some(kind) => Normalized::Entry(structured_entry(kind, &mut object)),
            None => {
                tracing::warn!(payload_type = other, "unknown payload type");
                Normalized::Entry(NormalizedEntry::unknown(Value::Object(object)))
            }
        },
    }
}

fn structured_entry(kind: StructuredKind, object: &mut Map<String, Value>) -> NormalizedEntry {
    let data = object.remove("data").unwrap_or(Value::Null);
    let mut structured = StructuredContent::new(kind, data);
    if let Some(Value::String(description)) = object.get("description") {
        structured = structured.with_description(description.clone());
    }
    NormalizedEntry::new(Role::Assistant, Content::Structured(structured))
}
