use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::Citation;

/// The column that carries comma-separated citation URLs instead of data.
pub const SOURCE_COLUMN: &str = "Source";

/// A display-ready projection of a `table` payload.
///
/// The payload is a list of row objects.  Headers are the union of all keys
/// except [`SOURCE_COLUMN`], in first-seen order.  Every row has exactly one
/// cell per header; missing keys become the empty string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableView {
    /// Column headers.
    pub headers: Vec<String>,
    /// One entry per input row, one cell per header.
    pub rows: Vec<Vec<String>>,
    /// Deduplicated citations collected from every row's source column.
    pub citations: Vec<Citation>,
}

impl TableView {
    /// Projects a table payload.
    ///
    /// Returns `None` when `data` is not an array.  Array elements that are not
    /// objects produce rows of empty cells.
    pub fn from_data(data: &Value) -> Option<Self> {
        let rows = data.as_array()?;
        let empty = Map::new();
        let objects: Vec<&Map<String, Value>> = rows
            .iter()
            .map(|row| row.as_object().unwrap_or(&empty))
            .collect();

        let mut headers: Vec<String> = Vec::new();
        let mut seen_headers = HashSet::new();
        for object in &objects {
            for key in object.keys() {
                if key != SOURCE_COLUMN && seen_headers.insert(key.as_str()) {
                    headers.push(key.clone());
                }
            }
        }

        let rows = objects
            .iter()
            .map(|object| {
                headers
                    .iter()
                    .map(|header| object.get(header).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();

        let mut citations = Vec::new();
        let mut seen_urls = HashSet::new();
        for object in &objects {
            let Some(Value::String(sources)) = object.get(SOURCE_COLUMN) else {
                continue;
            };
            for url in sources.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if seen_urls.insert(url.to_string()) {
                    citations.push(Citation::new(url));
                }
            }
        }

        Some(Self {
            headers,
            rows,
            citations,
        })
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Renders a single JSON value as cell text.
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_are_union_without_source() {
        let data = json!([{"A": "1", "Source": "u1,u2"}, {"B": "2"}]);
        let table = TableView::from_data(&data).unwrap();
        assert_eq!(table.headers, vec!["A", "B"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["1".to_string(), String::new()],
                vec![String::new(), "2".to_string()],
            ]
        );
        assert_eq!(
            table.citations,
            vec![Citation::new("u1"), Citation::new("u2")]
        );
    }

    #[test]
    fn citations_are_trimmed_and_deduplicated() {
        let data = json!([
            {"Name": "a", "Source": " https://x.example , https://y.example,"},
            {"Name": "b", "Source": "https://x.example"},
        ]);
        let table = TableView::from_data(&data).unwrap();
        assert_eq!(
            table.citations,
            vec![
                Citation::new("https://x.example"),
                Citation::new("https://y.example"),
            ]
        );
    }

    #[test]
    fn non_string_cells_are_stringified() {
        let data = json!([{"Price": 42, "InStock": true, "Notes": null}]);
        let table = TableView::from_data(&data).unwrap();
        assert_eq!(table.headers, vec!["Price", "InStock", "Notes"]);
        assert_eq!(table.rows, vec![vec!["42", "true", ""]]);
    }

    #[test]
    fn non_array_payload_is_not_a_table() {
        assert!(TableView::from_data(&json!({"A": "1"})).is_none());
    }

    #[test]
    fn non_object_rows_become_empty_rows() {
        let data = json!([{"A": "1"}, "stray"]);
        let table = TableView::from_data(&data).unwrap();
        assert_eq!(table.rows, vec![vec!["1".to_string()], vec![String::new()]]);
    }
}
