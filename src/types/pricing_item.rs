use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::table_view::cell_text;

/// One pricing option from a `pricing` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PricingItem {
    /// Option title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Price as shown to the user; numbers are rendered verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,

    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Feature bullet points.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,

    /// Whether the backend recommends this option.
    #[serde(default)]
    pub recommended: bool,
}

impl PricingItem {
    /// Leniently decodes an item; fields of the wrong shape are ignored.
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .filter(|v| !v.is_null())
                .map(cell_text)
                .filter(|s| !s.is_empty())
        };
        let features = value
            .get("features")
            .and_then(Value::as_array)
            .map(|features| features.iter().map(cell_text).collect())
            .unwrap_or_default();
        Self {
            title: text("title"),
            price: text("price"),
            description: text("description"),
            features,
            recommended: value
                .get("recommended")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    /// The title to display, falling back to a positional label.
    pub fn display_title(&self, index: usize) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Option {}", index + 1))
    }
}
