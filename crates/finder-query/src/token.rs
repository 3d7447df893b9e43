use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::operation::FilterType;
use crate::schema::{ColumnDescription, TypeReference};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryTokenType {
    Aggregate,
    Element,
    AnyOrAll,
}

/// A resolved, typed reference to a dotted path into a query's schema.
///
/// Tokens are immutable and shared through `Arc`. A child holds its parent;
/// parents never hold children, so the chain is acyclic and `full_key` is
/// always `parent.full_key + "." + key`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryToken {
    pub key: String,
    pub full_key: String,
    pub nice_name: String,
    pub to_str: String,
    pub type_ref: TypeReference,
    pub filter_type: Option<FilterType>,
    pub is_groupable: bool,
    /// `None` for plain tokens.
    pub query_token_type: Option<QueryTokenType>,
    pub unit: Option<String>,
    pub format: Option<String>,
    pub has_order_adapter: bool,
    pub prefer_equals: bool,
    pub property_route: Option<String>,
    pub parent: Option<Arc<QueryToken>>,
}

impl QueryToken {
    /// A plain child of `parent` with no filter type, not groupable.
    pub fn child(
        parent: &Arc<QueryToken>,
        key: impl Into<String>,
        nice_name: impl Into<String>,
        type_ref: TypeReference,
    ) -> Self {
        let key = key.into();
        let nice_name = nice_name.into();
        Self {
            full_key: format!("{}.{}", parent.full_key, key),
            to_str: format!("{}.{}", parent.to_str, nice_name),
            key,
            nice_name,
            type_ref,
            filter_type: None,
            is_groupable: false,
            query_token_type: None,
            unit: None,
            format: None,
            has_order_adapter: false,
            prefer_equals: false,
            property_route: None,
            parent: Some(Arc::clone(parent)),
        }
    }

    /// A child of `parent` navigating to a member described like a column.
    pub fn member(parent: &Arc<QueryToken>, member: &ColumnDescription) -> Self {
        Self {
            filter_type: member.filter_type,
            is_groupable: member.is_groupable,
            unit: member.unit.clone(),
            format: member.format.clone(),
            has_order_adapter: member.has_order_adapter,
            prefer_equals: member.prefer_equals,
            property_route: member.property_route.clone(),
            ..Self::child(
                parent,
                member.name.clone(),
                member.display_name.clone(),
                member.type_ref.clone(),
            )
        }
    }

    pub fn with_filter_type(mut self, filter_type: Option<FilterType>) -> Self {
        self.filter_type = filter_type;
        self
    }

    pub fn groupable(mut self, is_groupable: bool) -> Self {
        self.is_groupable = is_groupable;
        self
    }

    pub fn token_type(mut self, token_type: QueryTokenType) -> Self {
        self.query_token_type = Some(token_type);
        self
    }

    pub fn parent(&self) -> Option<&Arc<QueryToken>> {
        self.parent.as_ref()
    }

    pub fn is_aggregate(&self) -> bool {
        self.query_token_type == Some(QueryTokenType::Aggregate)
    }

    fn ancestors(&self) -> impl Iterator<Item = &QueryToken> {
        std::iter::successors(Some(self), |t| t.parent.as_deref())
    }
}

/// Builds the single-segment token for a top-level column.
pub fn to_query_token(column: &ColumnDescription) -> QueryToken {
    QueryToken {
        key: column.name.clone(),
        full_key: column.name.clone(),
        nice_name: column.display_name.clone(),
        to_str: column.display_name.clone(),
        type_ref: column.type_ref.clone(),
        filter_type: column.filter_type,
        is_groupable: column.is_groupable,
        query_token_type: None,
        unit: column.unit.clone(),
        format: column.format.clone(),
        has_order_adapter: column.has_order_adapter,
        prefer_equals: column.prefer_equals,
        property_route: column.property_route.clone(),
        parent: None,
    }
}

pub fn has_aggregate(token: Option<&QueryToken>) -> bool {
    token.is_some_and(|t| {
        t.ancestors()
            .any(|a| a.query_token_type == Some(QueryTokenType::Aggregate))
    })
}

pub fn has_any_or_all(token: Option<&QueryToken>) -> bool {
    token.is_some_and(|t| {
        t.ancestors()
            .any(|a| a.query_token_type == Some(QueryTokenType::AnyOrAll))
    })
}

/// True when `token` is `prefix` itself or nested under it.
pub fn is_prefix(prefix: &QueryToken, token: &QueryToken) -> bool {
    match token.full_key.strip_prefix(prefix.full_key.as_str()) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// The nearest ancestor (inclusive) that is outside every any-or-all scope.
pub fn without_all_any(token: Option<&Arc<QueryToken>>) -> Option<Arc<QueryToken>> {
    let token = token?;

    if token.query_token_type == Some(QueryTokenType::AnyOrAll) {
        return without_all_any(token.parent.as_ref());
    }

    let parent = without_all_any(token.parent.as_ref());
    let unchanged = match (&parent, &token.parent) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    };

    if unchanged { Some(Arc::clone(token)) } else { parent }
}

/// Root-first chain of tokens ending with `token`.
pub fn token_parents(token: Option<&Arc<QueryToken>>) -> Vec<Arc<QueryToken>> {
    let mut chain: Vec<Arc<QueryToken>> =
        std::iter::successors(token.cloned(), |t| t.parent.clone()).collect();
    chain.reverse();
    chain
}
