use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pagination::Pagination;

/// Lightweight reference to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lite {
    pub entity_type: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_str: Option<String>,
}

impl Lite {
    pub fn new(entity_type: impl Into<String>, id: impl Into<Value>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
            to_str: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Lite>,
    /// Positional against [`ResultTable::columns`].
    pub columns: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultTable {
    pub query_key: String,
    pub entity_column: String,
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
    pub pagination: Pagination,
    pub total_elements: u64,
}

impl ResultTable {
    pub fn column_index(&self, full_key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == full_key)
    }

    pub fn value(&self, row: usize, full_key: &str) -> Option<&Value> {
        let index = self.column_index(full_key)?;
        self.rows.get(row)?.columns.get(index)
    }

    pub fn total_pages(&self) -> u64 {
        self.pagination.total_pages(self.total_elements)
    }
}
