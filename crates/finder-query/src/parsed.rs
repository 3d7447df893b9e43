use std::sync::Arc;

use serde_json::Value;

use crate::operation::{FilterGroupOperation, FilterOperation};
use crate::options::{OrderType, PinnedFilter, SystemTime};
use crate::pagination::Pagination;
use crate::token::QueryToken;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOptionParsed {
    Condition(FilterConditionOptionParsed),
    Group(FilterGroupOptionParsed),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterConditionOptionParsed {
    pub token: Arc<QueryToken>,
    pub operation: FilterOperation,
    pub value: Value,
    pub frozen: bool,
    pub pinned: Option<PinnedFilter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterGroupOptionParsed {
    pub token: Option<Arc<QueryToken>>,
    pub group_operation: FilterGroupOperation,
    pub filters: Vec<FilterOptionParsed>,
    pub frozen: bool,
    /// Whether the group is shown open in a filter builder; never sent.
    pub expanded: bool,
    pub pinned: Option<PinnedFilter>,
    pub value: Option<String>,
}

impl FilterOptionParsed {
    pub fn token(&self) -> Option<&Arc<QueryToken>> {
        match self {
            FilterOptionParsed::Condition(c) => Some(&c.token),
            FilterOptionParsed::Group(g) => g.token.as_ref(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, FilterOptionParsed::Group(_))
    }

    pub fn frozen(&self) -> bool {
        match self {
            FilterOptionParsed::Condition(c) => c.frozen,
            FilterOptionParsed::Group(g) => g.frozen,
        }
    }

    pub fn pinned(&self) -> Option<&PinnedFilter> {
        match self {
            FilterOptionParsed::Condition(c) => c.pinned.as_ref(),
            FilterOptionParsed::Group(g) => g.pinned.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderOptionParsed {
    pub token: Arc<QueryToken>,
    pub order_type: OrderType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnOptionParsed {
    pub token: Option<Arc<QueryToken>>,
    pub display_name: Option<String>,
}

impl ColumnOptionParsed {
    pub fn new(token: Arc<QueryToken>) -> Self {
        Self {
            token: Some(token),
            display_name: None,
        }
    }

    pub fn full_key(&self) -> Option<&str> {
        self.token.as_deref().map(|t| t.full_key.as_str())
    }
}

/// Find options with every token resolved against the query's schema.
///
/// When `group_results` is set, every order and column token is either an
/// aggregate or groupable. Grouping toggles go through the reconciliation in
/// [`crate::group`] to keep it that way.
#[derive(Debug, Clone, PartialEq)]
pub struct FindOptionsParsed {
    pub query_key: String,
    pub group_results: bool,
    pub filter_options: Vec<FilterOptionParsed>,
    pub order_options: Vec<OrderOptionParsed>,
    pub column_options: Vec<ColumnOptionParsed>,
    pub pagination: Pagination,
    pub system_time: Option<SystemTime>,
}
