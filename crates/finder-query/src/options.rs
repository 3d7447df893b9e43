use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operation::{FilterGroupOperation, FilterOperation};
use crate::pagination::Pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnOptionsMode {
    #[default]
    Add,
    Remove,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemTimeMode {
    AsOf,
    Between,
    ContainedIn,
    All,
}

/// Bitemporal window applied to a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemTime {
    pub mode: SystemTimeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl SystemTime {
    pub fn as_of(date: impl Into<String>) -> Self {
        Self {
            mode: SystemTimeMode::AsOf,
            start_date: Some(date.into()),
            end_date: None,
        }
    }
}

/// Promotes a filter to a fixed quick-access slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default)]
    pub disable_on_null: bool,
    #[serde(default)]
    pub split_text: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterOption {
    Group(FilterGroupOption),
    Condition(FilterConditionOption),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConditionOption {
    pub token: String,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<FilterOperation>,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<PinnedFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroupOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub frozen: bool,
    pub group_operation: FilterGroupOperation,
    #[serde(default)]
    pub filters: Vec<FilterOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<PinnedFilter>,
    /// Text searched across the group's conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FilterOption {
    pub fn condition(
        token: impl Into<String>,
        operation: FilterOperation,
        value: impl Into<Value>,
    ) -> Self {
        FilterOption::Condition(FilterConditionOption::new(token, operation, value))
    }

    pub fn group(group_operation: FilterGroupOperation, filters: Vec<FilterOption>) -> Self {
        FilterOption::Group(FilterGroupOption {
            token: None,
            frozen: false,
            group_operation,
            filters,
            pinned: None,
            value: None,
        })
    }

    pub fn is_group(&self) -> bool {
        matches!(self, FilterOption::Group(_))
    }
}

impl FilterConditionOption {
    pub fn new(token: impl Into<String>, operation: FilterOperation, value: impl Into<Value>) -> Self {
        Self {
            token: token.into(),
            frozen: false,
            operation: Some(operation),
            value: value.into(),
            pinned: None,
        }
    }

    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn pinned(mut self, pinned: PinnedFilter) -> Self {
        self.pinned = Some(pinned);
        self
    }
}

impl From<FilterConditionOption> for FilterOption {
    fn from(c: FilterConditionOption) -> Self {
        FilterOption::Condition(c)
    }
}

impl From<FilterGroupOption> for FilterOption {
    fn from(g: FilterGroupOption) -> Self {
        FilterOption::Group(g)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOption {
    pub token: String,
    pub order_type: OrderType,
}

impl OrderOption {
    pub fn asc(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            order_type: OrderType::Ascending,
        }
    }

    pub fn desc(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            order_type: OrderType::Descending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnOption {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ColumnOption {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            display_name: None,
        }
    }

    pub fn named(token: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            display_name: Some(display_name.into()),
        }
    }
}

/// User-authored description of a search. Tokens are dotted paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOptions {
    pub query_name: String,
    #[serde(default)]
    pub group_results: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_value: Option<Value>,
    #[serde(default)]
    pub filter_options: Vec<FilterOption>,
    #[serde(default)]
    pub order_options: Vec<OrderOption>,
    #[serde(default)]
    pub column_options_mode: ColumnOptionsMode,
    #[serde(default)]
    pub column_options: Vec<ColumnOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_time: Option<SystemTime>,
}

impl FindOptions {
    pub fn new(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            group_results: false,
            parent_token: None,
            parent_value: None,
            filter_options: Vec::new(),
            order_options: Vec::new(),
            column_options_mode: ColumnOptionsMode::Add,
            column_options: Vec::new(),
            pagination: None,
            system_time: None,
        }
    }

    pub fn filter(mut self, filter: impl Into<FilterOption>) -> Self {
        self.filter_options.push(filter.into());
        self
    }

    pub fn order(mut self, order: OrderOption) -> Self {
        self.order_options.push(order);
        self
    }

    pub fn column(mut self, column: ColumnOption) -> Self {
        self.column_options.push(column);
        self
    }

    pub fn columns_mode(mut self, mode: ColumnOptionsMode) -> Self {
        self.column_options_mode = mode;
        self
    }

    pub fn parent(mut self, token: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parent_token = Some(token.into());
        self.parent_value = Some(value.into());
        self
    }

    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn grouped(mut self) -> Self {
        self.group_results = true;
        self
    }
}

/// Builder for dotted token paths, e.g. `QueryTokenString::new("Lines").any().then("Quantity")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryTokenString(String);

impl QueryTokenString {
    pub fn new(root: impl Into<String>) -> Self {
        Self(root.into())
    }

    pub fn entity() -> Self {
        Self::new(crate::schema::ENTITY_COLUMN)
    }

    pub fn then(&self, key: &str) -> Self {
        Self(format!("{}.{}", self.0, key))
    }

    pub fn any(&self) -> Self {
        self.then("Any")
    }

    pub fn all(&self) -> Self {
        self.then("All")
    }

    pub fn element(&self) -> Self {
        self.then("Element")
    }

    pub fn count(&self) -> Self {
        self.then("Count")
    }

    pub fn min(&self) -> Self {
        self.then("Min")
    }

    pub fn max(&self) -> Self {
        self.then("Max")
    }

    pub fn sum(&self) -> Self {
        self.then("Sum")
    }

    pub fn average(&self) -> Self {
        self.then("Average")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryTokenString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<QueryTokenString> for String {
    fn from(t: QueryTokenString) -> Self {
        t.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_string_builds_paths() {
        let t = QueryTokenString::new("Lines").any().then("Quantity");
        assert_eq!(t.as_str(), "Lines.Any.Quantity");
        assert_eq!(QueryTokenString::new("Amount").min().to_string(), "Amount.Min");
        let s: String = QueryTokenString::entity().then("Id").into();
        assert_eq!(s, "Entity.Id");
    }

    #[test]
    fn filter_option_deserializes_by_shape() {
        let filters: Vec<FilterOption> = serde_json::from_value(json!([
            { "token": "Amount", "operation": "GreaterThan", "value": 100 },
            { "groupOperation": "Or", "filters": [
                { "token": "Status", "value": "Open" }
            ]}
        ]))
        .unwrap();

        match &filters[0] {
            FilterOption::Condition(c) => {
                assert_eq!(c.token, "Amount");
                assert_eq!(c.operation, Some(FilterOperation::GreaterThan));
                assert_eq!(c.value, json!(100));
                assert!(!c.frozen);
            }
            other => panic!("expected condition, got {other:?}"),
        }
        match &filters[1] {
            FilterOption::Group(g) => {
                assert_eq!(g.group_operation, FilterGroupOperation::Or);
                assert_eq!(g.filters.len(), 1);
                assert!(!g.filters[0].is_group());
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn find_options_defaults() {
        let fo: FindOptions = serde_json::from_value(json!({ "queryName": "Order" })).unwrap();
        assert_eq!(fo, FindOptions::new("Order"));
        assert_eq!(fo.column_options_mode, ColumnOptionsMode::Add);
    }
}
