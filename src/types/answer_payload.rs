use serde_json::Value;

/// The decoded body of an `answer` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerPayload {
    /// A bare string, or an object's `text` field.
    Text(String),
    /// Anything else; shown as pretty-printed JSON.
    Raw(Value),
}

impl AnswerPayload {
    /// Decodes an answer; `null` has nothing to show.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(AnswerPayload::Text(text.clone())),
            other => match other.get("text").and_then(Value::as_str) {
                Some(text) if !text.is_empty() => Some(AnswerPayload::Text(text.to_string())),
                _ => Some(AnswerPayload::Raw(other.clone())),
            },
        }
    }
}
