use serde::{Deserialize, Serialize};

/// A source URL backing a row of tabular data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Citation {
    /// The cited URL, trimmed of surrounding whitespace.
    pub url: String,
}

impl Citation {
    /// Creates a new citation for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl From<&str> for Citation {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}
