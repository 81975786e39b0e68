use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::table_view::cell_text;

/// One choice from a `card_selection` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SelectionOption {
    /// Card title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Card description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The value associated with the card, as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl SelectionOption {
    /// Leniently decodes an option.
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(String::from);
        Self {
            title: text("title"),
            description: text("description"),
            value: value.get("value").filter(|v| !v.is_null()).cloned(),
        }
    }

    /// The option's value rendered as text, if present.
    pub fn value_text(&self) -> Option<String> {
        self.value.as_ref().map(cell_text)
    }

    /// A short label for logs and listings.
    pub fn label(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.value_text())
            .unwrap_or_else(|| "(untitled option)".to_string())
    }
}
