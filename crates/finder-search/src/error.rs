use finder_query::QueryError;
use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("request failed: {0}")]
    Request(#[from] TransportError),

    #[error("invalid state: {0}")]
    InvalidState(String),
}
