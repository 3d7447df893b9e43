use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operation::{FilterGroupOperation, FilterOperation};
use crate::options::{OrderType, SystemTime};
use crate::pagination::Pagination;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query_key: String,
    pub group_results: bool,
    #[serde(default)]
    pub filters: Vec<FilterRequest>,
    #[serde(default)]
    pub orders: Vec<OrderRequest>,
    #[serde(default)]
    pub columns: Vec<ColumnRequest>,
    pub pagination: Pagination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_time: Option<SystemTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterRequest {
    Group(FilterGroupRequest),
    Condition(FilterConditionRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroupRequest {
    pub group_operation: FilterGroupOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub filters: Vec<FilterRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConditionRequest {
    pub token: String,
    pub operation: FilterOperation,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub token: String,
    pub order_type: OrderType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRequest {
    pub token: String,
    pub display_name: String,
}

/// Fetches the entities matching a filter set, e.g. behind a grouped row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntitiesRequest {
    pub query_key: String,
    #[serde(default)]
    pub filters: Vec<FilterRequest>,
    #[serde(default)]
    pub orders: Vec<OrderRequest>,
    pub count: Option<u32>,
}

/// Computes one value over the filtered rows; the row count when `value_token` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryValueRequest {
    pub query_key: String,
    #[serde(default)]
    pub filters: Vec<FilterRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_time: Option<SystemTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_request_wire_shape() {
        let request = QueryRequest {
            query_key: "Order".into(),
            group_results: false,
            filters: vec![
                FilterRequest::Condition(FilterConditionRequest {
                    token: "Amount".into(),
                    operation: FilterOperation::GreaterThan,
                    value: json!(100),
                }),
                FilterRequest::Group(FilterGroupRequest {
                    group_operation: FilterGroupOperation::Or,
                    token: None,
                    filters: vec![],
                }),
            ],
            orders: vec![OrderRequest {
                token: "Id".into(),
                order_type: OrderType::Descending,
            }],
            columns: vec![ColumnRequest {
                token: "Status".into(),
                display_name: "Status".into(),
            }],
            pagination: Pagination::paginate(20, 1),
            system_time: None,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "queryKey": "Order",
                "groupResults": false,
                "filters": [
                    { "token": "Amount", "operation": "GreaterThan", "value": 100 },
                    { "groupOperation": "Or", "filters": [] }
                ],
                "orders": [{ "token": "Id", "orderType": "Descending" }],
                "columns": [{ "token": "Status", "displayName": "Status" }],
                "pagination": { "mode": "Paginate", "elementsPerPage": 20, "currentPage": 1 }
            })
        );
    }

    #[test]
    fn filter_request_reads_back_by_shape() {
        let parsed: Vec<FilterRequest> = serde_json::from_value(json!([
            { "groupOperation": "And", "token": "Lines", "filters": [
                { "token": "Lines.Any.Quantity", "operation": "EqualTo", "value": 2 }
            ]}
        ]))
        .unwrap();
        match &parsed[0] {
            FilterRequest::Group(g) => {
                assert_eq!(g.token.as_deref(), Some("Lines"));
                assert!(matches!(g.filters[0], FilterRequest::Condition(_)));
            }
            other => panic!("expected group, got {other:?}"),
        }
    }
}
