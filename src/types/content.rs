use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{AnswerPayload, PricingItem, SelectionOption, TableView};

/// The structured payload kinds the backend emits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredKind {
    /// Rows of key/value objects, optionally carrying citations.
    Table,
    /// One or more pricing options.
    Pricing,
    /// A list of options the user may pick from.
    CardSelection,
    /// A formatted answer.
    Answer,
    /// A payload whose `type` is not recognized; `data` holds the whole object.
    Unknown,
}

impl StructuredKind {
    /// Maps a wire `type` onto a recognized kind.
    ///
    /// Returns `None` for anything that is not one of the four known kinds;
    /// callers decide how to wrap those.
    pub fn from_type(ty: &str) -> Option<Self> {
        match ty {
            "table" => Some(StructuredKind::Table),
            "pricing" => Some(StructuredKind::Pricing),
            "card_selection" => Some(StructuredKind::CardSelection),
            "answer" => Some(StructuredKind::Answer),
            _ => None,
        }
    }

    /// The wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            StructuredKind::Table => "table",
            StructuredKind::Pricing => "pricing",
            StructuredKind::CardSelection => "card_selection",
            StructuredKind::Answer => "answer",
            StructuredKind::Unknown => "unknown",
        }
    }
}

/// A structured payload as received from the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuredContent {
    /// Which kind of payload this is.
    #[serde(rename = "type")]
    pub kind: StructuredKind,

    /// The payload's `data`, untouched.
    pub data: Value,

    /// Optional text shown above the payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StructuredContent {
    /// Creates structured content of the given kind.
    pub fn new(kind: StructuredKind, data: Value) -> Self {
        Self {
            kind,
            data,
            description: None,
        }
    }

    /// Wraps an unrecognized payload so nothing is dropped.
    pub fn unknown(raw: Value) -> Self {
        Self::new(StructuredKind::Unknown, raw)
    }

    /// Attaches a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Projects a table payload for display.
    pub fn table(&self) -> Option<TableView> {
        match self.kind {
            StructuredKind::Table => TableView::from_data(&self.data),
            _ => None,
        }
    }

    /// Decodes a pricing payload, which is either one item or a list of them.
    pub fn pricing_items(&self) -> Option<Vec<PricingItem>> {
        if self.kind != StructuredKind::Pricing {
            return None;
        }
        match &self.data {
            Value::Array(items) => Some(items.iter().map(PricingItem::from_value).collect()),
            Value::Null => None,
            item => Some(vec![PricingItem::from_value(item)]),
        }
    }

    /// Decodes a card selection payload.
    pub fn selection_options(&self) -> Option<Vec<SelectionOption>> {
        if self.kind != StructuredKind::CardSelection {
            return None;
        }
        let options = self.data.as_array()?;
        Some(options.iter().map(SelectionOption::from_value).collect())
    }

    /// Decodes an answer payload.
    pub fn answer(&self) -> Option<AnswerPayload> {
        match self.kind {
            StructuredKind::Answer => AnswerPayload::from_value(&self.data),
            _ => None,
        }
    }
}

/// The body of a timeline entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    /// Plain text.
    Text {
        /// The text, verbatim.
        text: String,
    },

    /// A structured payload.
    Structured(StructuredContent),
}

impl Content {
    /// Creates text content.
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    /// Returns the text if this is text content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text } => Some(text),
            Content::Structured(_) => None,
        }
    }

    /// Returns the structured payload if this is structured content.
    pub fn as_structured(&self) -> Option<&StructuredContent> {
        match self {
            Content::Structured(structured) => Some(structured),
            Content::Text { .. } => None,
        }
    }

    /// Returns the structured kind, if any.
    pub fn structured_kind(&self) -> Option<StructuredKind> {
        self.as_structured().map(|s| s.kind)
    }
}

impl From<StructuredContent> for Content {
    fn from(structured: StructuredContent) -> Self {
        Content::Structured(structured)
    }
}
