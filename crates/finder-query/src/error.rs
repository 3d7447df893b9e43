use thiserror::Error;

use crate::operation::{FilterOperation, FilterType};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("cannot resolve token '{path}' in query '{query_key}': {reason}")]
    TokenResolution {
        query_key: String,
        path: String,
        reason: String,
    },

    #[error("operation {operation:?} is not allowed on '{path}' (filter type {filter_type:?})")]
    IllegalOperation {
        path: String,
        operation: FilterOperation,
        filter_type: Option<FilterType>,
    },

    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("options target query '{found}' but the schema describes '{expected}'")]
    QueryKeyMismatch { expected: String, found: String },

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl QueryError {
    pub(crate) fn unresolved(query_key: &str, path: &str, reason: impl Into<String>) -> Self {
        QueryError::TokenResolution {
            query_key: query_key.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
