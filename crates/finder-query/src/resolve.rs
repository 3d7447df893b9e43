use std::collections::HashMap;
use std::ops::BitOr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::QueryError;
use crate::operation::FilterType;
use crate::schema::{QuerySchema, TypeReference, type_names};
use crate::token::{QueryToken, QueryTokenType, has_any_or_all, to_query_token};

/// Which derived sub-tokens a resolution may produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SubTokensOptions(u8);

impl SubTokensOptions {
    pub const NONE: Self = Self(0);
    pub const CAN_AGGREGATE: Self = Self(1);
    pub const CAN_ANY_ALL: Self = Self(2);
    pub const CAN_ELEMENT: Self = Self(4);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SubTokensOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenRequest {
    pub full_key: String,
    pub options: SubTokensOptions,
}

/// Resolves batches of dotted paths into tokens, possibly over the network.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    /// Returns one token per request, in request order.
    async fn parse_tokens(
        &self,
        query_key: &str,
        requests: &[TokenRequest],
    ) -> Result<Vec<Arc<QueryToken>>, QueryError>;
}

const AGGREGATES: [&str; 4] = ["Min", "Max", "Sum", "Average"];
const COLLECTION_SCOPES: [&str; 4] = ["Any", "All", "NotAny", "NotAll"];

impl QuerySchema {
    /// Resolves a dotted path segment by segment.
    pub fn parse_token(
        &self,
        full_key: &str,
        options: SubTokensOptions,
    ) -> Result<Arc<QueryToken>, QueryError> {
        if full_key.split('.').any(str::is_empty) {
            return Err(QueryError::unresolved(
                self.query_key(),
                full_key,
                "empty path segment",
            ));
        }

        let mut current: Option<Arc<QueryToken>> = None;
        for key in full_key.split('.') {
            let next = self
                .sub_tokens(current.as_ref(), options)
                .into_iter()
                .find(|t| t.key == key);
            match next {
                Some(token) => current = Some(token),
                None => {
                    let reason = match &current {
                        Some(parent) => format!("'{}' has no sub-token '{key}'", parent.full_key),
                        None => format!("no column '{key}'"),
                    };
                    return Err(QueryError::unresolved(self.query_key(), full_key, reason));
                }
            }
        }

        current.ok_or_else(|| QueryError::unresolved(self.query_key(), full_key, "empty path"))
    }

    /// Tokens reachable one segment below `parent`, or the root tokens when `parent` is `None`.
    pub fn sub_tokens(
        &self,
        parent: Option<&Arc<QueryToken>>,
        options: SubTokensOptions,
    ) -> Vec<Arc<QueryToken>> {
        let Some(parent) = parent else {
            let mut roots: Vec<Arc<QueryToken>> = self
                .description
                .columns
                .values()
                .map(|c| Arc::new(to_query_token(c)))
                .collect();
            if options.contains(SubTokensOptions::CAN_AGGREGATE) {
                roots.push(Arc::new(root_count()));
            }
            return roots;
        };

        if parent.is_aggregate() {
            return Vec::new();
        }

        let mut result = Vec::new();
        let type_ref = &parent.type_ref;

        if type_ref.is_collection {
            let element = type_ref.element();
            let element_filter = self.catalog.filter_type_of(&element);
            if options.contains(SubTokensOptions::CAN_ELEMENT) {
                result.push(
                    QueryToken::child(parent, "Element", "Element", element.clone())
                        .with_filter_type(element_filter)
                        .groupable(!element.is_embedded)
                        .token_type(QueryTokenType::Element),
                );
            }
            if options.contains(SubTokensOptions::CAN_ANY_ALL) {
                for scope in COLLECTION_SCOPES {
                    result.push(
                        QueryToken::child(parent, scope, scope, element.clone())
                            .with_filter_type(element_filter)
                            .token_type(QueryTokenType::AnyOrAll),
                    );
                }
            }
            result.push(
                QueryToken::child(parent, "Count", "Count", TypeReference::new(type_names::NUMBER))
                    .with_filter_type(Some(FilterType::Integer))
                    .groupable(true),
            );
        } else {
            for member in self.catalog.members_of(type_ref) {
                result.push(QueryToken::member(parent, member));
            }

            if options.contains(SubTokensOptions::CAN_AGGREGATE) && !has_any_or_all(Some(parent.as_ref())) {
                for name in AGGREGATES {
                    if let Some(aggregate_type) = aggregate_type(name, type_ref) {
                        let filter_type = self.catalog.filter_type_of(&aggregate_type);
                        let nice_name = format!("{name} of {}", parent.nice_name);
                        result.push(
                            QueryToken::child(parent, name, nice_name, aggregate_type)
                                .with_filter_type(filter_type)
                                .token_type(QueryTokenType::Aggregate),
                        );
                    }
                }
            }
        }

        result.into_iter().map(Arc::new).collect()
    }
}

fn root_count() -> QueryToken {
    QueryToken {
        key: "Count".into(),
        full_key: "Count".into(),
        nice_name: "Count".into(),
        to_str: "Count".into(),
        type_ref: TypeReference::new(type_names::NUMBER).not_nullable(),
        filter_type: Some(FilterType::Integer),
        is_groupable: false,
        query_token_type: Some(QueryTokenType::Aggregate),
        unit: None,
        format: None,
        has_order_adapter: false,
        prefer_equals: false,
        property_route: None,
        parent: None,
    }
}

/// Result type of aggregate `name` over `source`, `None` when not applicable.
fn aggregate_type(name: &str, source: &TypeReference) -> Option<TypeReference> {
    let base = source.element();
    match name {
        "Min" | "Max" if source.is_numeric() || source.name == type_names::DATETIME => Some(base),
        "Sum" if source.is_numeric() => Some(base),
        "Average" if source.is_numeric() => {
            if source.name == type_names::NUMBER {
                Some(TypeReference::new(type_names::DECIMAL))
            } else {
                Some(base)
            }
        }
        _ => None,
    }
}

#[async_trait]
impl TokenResolver for QuerySchema {
    async fn parse_tokens(
        &self,
        query_key: &str,
        requests: &[TokenRequest],
    ) -> Result<Vec<Arc<QueryToken>>, QueryError> {
        if query_key != self.query_key() {
            return Err(QueryError::QueryKeyMismatch {
                expected: self.query_key().to_string(),
                found: query_key.to_string(),
            });
        }
        requests
            .iter()
            .map(|r| self.parse_token(&r.full_key, r.options))
            .collect()
    }
}

/// Two-phase batch token resolution.
///
/// Callers first [`request`](Self::request) every path they need, await
/// [`finished`](Self::finished) once, then [`get`](Self::get) the results.
/// All pending paths are resolved with a single resolver call.
pub struct TokenCompleter<'a> {
    resolver: &'a dyn TokenResolver,
    query_key: String,
    pending: Vec<TokenRequest>,
    resolved: HashMap<String, Arc<QueryToken>>,
}

impl<'a> TokenCompleter<'a> {
    pub fn new(resolver: &'a dyn TokenResolver, query_key: impl Into<String>) -> Self {
        Self {
            resolver,
            query_key: query_key.into(),
            pending: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    pub fn request(&mut self, full_key: &str, options: SubTokensOptions) {
        if self.resolved.contains_key(full_key) || self.pending.iter().any(|r| r.full_key == full_key) {
            return;
        }
        self.pending.push(TokenRequest {
            full_key: full_key.to_string(),
            options,
        });
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub async fn finished(&mut self) -> Result<(), QueryError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let requests = std::mem::take(&mut self.pending);
        debug!(query = %self.query_key, count = requests.len(), "resolving token batch");
        let tokens = self.resolver.parse_tokens(&self.query_key, &requests).await?;
        if tokens.len() != requests.len() {
            return Err(QueryError::InvalidState(format!(
                "resolver returned {} tokens for {} requests",
                tokens.len(),
                requests.len()
            )));
        }

        for (request, token) in requests.into_iter().zip(tokens) {
            self.resolved.insert(request.full_key, token);
        }
        Ok(())
    }

    pub fn get(&self, full_key: &str) -> Result<Arc<QueryToken>, QueryError> {
        self.resolved.get(full_key).cloned().ok_or_else(|| {
            QueryError::InvalidState(format!(
                "token '{full_key}' was not resolved; request it and await finished() first"
            ))
        })
    }
}
