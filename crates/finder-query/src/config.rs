use serde::{Deserialize, Serialize};

use crate::pagination::Pagination;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NormalizeConfig {
    /// Fail on the first unresolved option instead of skipping it.
    pub strict: bool,
    /// Used when the authored options carry no pagination.
    pub default_pagination: Pagination,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            strict: false,
            default_pagination: Pagination::default(),
        }
    }
}

impl NormalizeConfig {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}
