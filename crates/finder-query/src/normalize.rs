use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::NormalizeConfig;
use crate::error::QueryError;
use crate::operation::{FilterGroupOperation, FilterOperation};
use crate::options::{
    ColumnOption, ColumnOptionsMode, FilterConditionOption, FilterGroupOption, FilterOption,
    FindOptions, OrderOption,
};
use crate::parsed::{
    ColumnOptionParsed, FilterConditionOptionParsed, FilterGroupOptionParsed, FilterOptionParsed,
    FindOptionsParsed, OrderOptionParsed,
};
use crate::request::{
    ColumnRequest, FilterConditionRequest, FilterGroupRequest, FilterRequest, OrderRequest,
    QueryEntitiesRequest, QueryRequest, QueryValueRequest,
};
use crate::resolve::SubTokensOptions;
use crate::schema::{QueryDescription, QuerySchema};
use crate::token::{QueryToken, has_aggregate, to_query_token};

/// A normalization result plus the options that were dropped on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub skipped: Vec<QueryError>,
}

impl<T> Normalized<T> {
    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

fn filter_token_options(group_results: bool) -> SubTokensOptions {
    let base = SubTokensOptions::CAN_ANY_ALL | SubTokensOptions::CAN_ELEMENT;
    if group_results {
        base | SubTokensOptions::CAN_AGGREGATE
    } else {
        base
    }
}

fn column_token_options(group_results: bool) -> SubTokensOptions {
    if group_results {
        SubTokensOptions::CAN_ELEMENT | SubTokensOptions::CAN_AGGREGATE
    } else {
        SubTokensOptions::CAN_ELEMENT
    }
}

struct Normalizer<'a> {
    schema: &'a QuerySchema,
    strict: bool,
    skipped: Vec<QueryError>,
}

impl<'a> Normalizer<'a> {
    fn new(schema: &'a QuerySchema, strict: bool) -> Self {
        Self {
            schema,
            strict,
            skipped: Vec::new(),
        }
    }

    /// Strict mode fails on the first error; otherwise the option is dropped and recorded.
    fn accept<T>(&mut self, result: Result<T, QueryError>) -> Result<Option<T>, QueryError> {
        match result {
            Ok(v) => Ok(Some(v)),
            Err(e) if !self.strict => {
                warn!(query = %self.schema.query_key(), error = %e, "skipping option");
                self.skipped.push(e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn token(&mut self, path: &str, options: SubTokensOptions) -> Result<Option<Arc<QueryToken>>, QueryError> {
        let resolved = self.schema.parse_token(path, options);
        self.accept(resolved)
    }

    fn filters(
        &mut self,
        filters: &[FilterOption],
        options: SubTokensOptions,
    ) -> Result<Vec<FilterOptionParsed>, QueryError> {
        let mut result = Vec::with_capacity(filters.len());
        for filter in filters {
            if let Some(parsed) = self.filter(filter, options)? {
                result.push(parsed);
            }
        }
        Ok(result)
    }

    fn filter(
        &mut self,
        filter: &FilterOption,
        options: SubTokensOptions,
    ) -> Result<Option<FilterOptionParsed>, QueryError> {
        match filter {
            FilterOption::Condition(c) => Ok(self
                .condition(c, options)?
                .map(FilterOptionParsed::Condition)),
            FilterOption::Group(g) => Ok(self.group(g, options)?.map(FilterOptionParsed::Group)),
        }
    }

    fn condition(
        &mut self,
        c: &FilterConditionOption,
        options: SubTokensOptions,
    ) -> Result<Option<FilterConditionOptionParsed>, QueryError> {
        let Some(token) = self.token(&c.token, options)? else {
            return Ok(None);
        };

        let operation = c.operation.unwrap_or(FilterOperation::EqualTo);
        let allowed = token.filter_type.is_some_and(|ft| ft.allows(operation));
        if !allowed {
            let illegal = Err(QueryError::IllegalOperation {
                path: token.full_key.clone(),
                operation,
                filter_type: token.filter_type,
            });
            return self.accept(illegal);
        }

        Ok(Some(FilterConditionOptionParsed {
            token,
            operation,
            value: c.value.clone(),
            frozen: c.frozen,
            pinned: c.pinned.clone(),
        }))
    }

    fn group(
        &mut self,
        g: &FilterGroupOption,
        options: SubTokensOptions,
    ) -> Result<Option<FilterGroupOptionParsed>, QueryError> {
        let token = match &g.token {
            Some(path) => match self.token(path, options)? {
                Some(token) => Some(token),
                None => return Ok(None),
            },
            None => None,
        };

        let filters = self.filters(&g.filters, options)?;
        if filters.is_empty() {
            debug!(query = %self.schema.query_key(), "dropping empty filter group");
            return Ok(None);
        }

        Ok(Some(FilterGroupOptionParsed {
            token,
            group_operation: g.group_operation,
            filters,
            frozen: g.frozen,
            expanded: false,
            pinned: g.pinned.clone(),
            value: g.value.clone(),
        }))
    }

    fn orders(
        &mut self,
        orders: &[OrderOption],
        options: SubTokensOptions,
    ) -> Result<Vec<OrderOptionParsed>, QueryError> {
        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            if let Some(token) = self.token(&order.token, options)? {
                result.push(OrderOptionParsed {
                    token,
                    order_type: order.order_type,
                });
            }
        }
        Ok(result)
    }

    fn columns(
        &mut self,
        columns: &[ColumnOption],
        options: SubTokensOptions,
    ) -> Result<Vec<ColumnOptionParsed>, QueryError> {
        let mut result = Vec::with_capacity(columns.len());
        for column in columns {
            if let Some(token) = self.token(&column.token, options)? {
                result.push(ColumnOptionParsed {
                    token: Some(token),
                    display_name: column.display_name.clone(),
                });
            }
        }
        Ok(result)
    }
}

/// Resolves authored find options against `schema`.
pub fn parse_find_options(
    fo: &FindOptions,
    schema: &QuerySchema,
    config: &NormalizeConfig,
) -> Result<Normalized<FindOptionsParsed>, QueryError> {
    if fo.query_name != schema.query_key() {
        return Err(QueryError::QueryKeyMismatch {
            expected: schema.query_key().to_string(),
            found: fo.query_name.clone(),
        });
    }

    let pagination = fo
        .pagination
        .clone()
        .unwrap_or_else(|| config.default_pagination.clone());
    pagination.validate()?;

    let mut normalizer = Normalizer::new(schema, config.strict);

    let mut authored_filters = Vec::with_capacity(fo.filter_options.len() + 1);
    if let Some(parent) = &fo.parent_token {
        authored_filters.push(FilterOption::Condition(
            FilterConditionOption::new(
                parent.clone(),
                FilterOperation::EqualTo,
                fo.parent_value.clone().unwrap_or(Value::Null),
            )
            .frozen(),
        ));
    }
    authored_filters.extend(fo.filter_options.iter().cloned());

    let filter_options =
        normalizer.filters(&authored_filters, filter_token_options(fo.group_results))?;
    let order_options =
        normalizer.orders(&fo.order_options, column_token_options(fo.group_results))?;
    let authored_columns =
        normalizer.columns(&fo.column_options, column_token_options(fo.group_results))?;

    let column_options = merge_columns(
        schema.description(),
        fo.column_options_mode,
        authored_columns,
        fo.parent_token.as_deref(),
    );

    debug!(
        query = %fo.query_name,
        filters = filter_options.len(),
        orders = order_options.len(),
        columns = column_options.len(),
        "parsed find options"
    );

    Ok(Normalized {
        value: FindOptionsParsed {
            query_key: fo.query_name.clone(),
            group_results: fo.group_results,
            filter_options,
            order_options,
            column_options,
            pagination,
            system_time: fo.system_time.clone(),
        },
        skipped: normalizer.skipped,
    })
}

/// Resolves a standalone filter list, e.g. one produced by a drill-down.
pub fn parse_filter_options(
    filters: &[FilterOption],
    group_results: bool,
    schema: &QuerySchema,
    config: &NormalizeConfig,
) -> Result<Normalized<Vec<FilterOptionParsed>>, QueryError> {
    let mut normalizer = Normalizer::new(schema, config.strict);
    let value = normalizer.filters(filters, filter_token_options(group_results))?;
    Ok(Normalized {
        value,
        skipped: normalizer.skipped,
    })
}

fn merge_columns(
    description: &QueryDescription,
    mode: ColumnOptionsMode,
    authored: Vec<ColumnOptionParsed>,
    hidden: Option<&str>,
) -> Vec<ColumnOptionParsed> {
    let defaults = || {
        description
            .default_columns()
            .filter(move |c| Some(c.name.as_str()) != hidden)
            .map(|c| ColumnOptionParsed::new(Arc::new(to_query_token(c))))
    };

    match mode {
        ColumnOptionsMode::Replace => authored,
        ColumnOptionsMode::Add => defaults().chain(authored).collect(),
        ColumnOptionsMode::Remove => defaults()
            .filter(|d| !authored.iter().any(|a| a.full_key() == d.full_key()))
            .collect(),
    }
}

/// Flattens parsed options into the wire request.
pub fn to_query_request(fop: &FindOptionsParsed) -> QueryRequest {
    QueryRequest {
        query_key: fop.query_key.clone(),
        group_results: fop.group_results,
        filters: to_filter_requests(&fop.filter_options),
        orders: to_order_requests(&fop.order_options),
        columns: fop
            .column_options
            .iter()
            .filter_map(|co| {
                co.token.as_ref().map(|t| ColumnRequest {
                    token: t.full_key.clone(),
                    display_name: co.display_name.clone().unwrap_or_else(|| t.nice_name.clone()),
                })
            })
            .collect(),
        pagination: fop.pagination.clone(),
        system_time: fop.system_time.clone(),
    }
}

pub fn to_order_requests(orders: &[OrderOptionParsed]) -> Vec<OrderRequest> {
    orders
        .iter()
        .map(|o| OrderRequest {
            token: o.token.full_key.clone(),
            order_type: o.order_type,
        })
        .collect()
}

pub fn to_query_entities_request(
    query_key: &str,
    filters: &[FilterOptionParsed],
    orders: &[OrderOptionParsed],
    count: Option<u32>,
) -> QueryEntitiesRequest {
    QueryEntitiesRequest {
        query_key: query_key.to_string(),
        filters: to_filter_requests(filters),
        orders: to_order_requests(orders),
        count,
    }
}

pub fn to_query_value_request(fop: &FindOptionsParsed, value_token: Option<&QueryToken>) -> QueryValueRequest {
    QueryValueRequest {
        query_key: fop.query_key.clone(),
        filters: to_filter_requests(&fop.filter_options),
        value_token: value_token.map(|t| t.full_key.clone()),
        system_time: fop.system_time.clone(),
    }
}

pub fn to_filter_requests(filters: &[FilterOptionParsed]) -> Vec<FilterRequest> {
    filters.iter().filter_map(to_filter_request).collect()
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn to_filter_request(filter: &FilterOptionParsed) -> Option<FilterRequest> {
    match filter {
        FilterOptionParsed::Condition(c) => {
            let disabled = c.pinned.as_ref().is_some_and(|p| p.disable_on_null);
            if disabled && is_empty_value(&c.value) {
                return None;
            }
            Some(FilterRequest::Condition(FilterConditionRequest {
                token: c.token.full_key.clone(),
                operation: c.operation,
                value: c.value.clone(),
            }))
        }
        FilterOptionParsed::Group(g) => {
            let token = g.token.as_ref().map(|t| t.full_key.clone());
            let Some(pinned) = &g.pinned else {
                let filters = to_filter_requests(&g.filters);
                return (!filters.is_empty()).then(|| {
                    FilterRequest::Group(FilterGroupRequest {
                        group_operation: g.group_operation,
                        token,
                        filters,
                    })
                });
            };

            let text = g.value.as_deref().unwrap_or("").trim();
            if text.is_empty() {
                return None;
            }

            let words: Vec<&str> = if pinned.split_text {
                text.split_whitespace().collect()
            } else {
                vec![text]
            };

            let mut per_word: Vec<FilterRequest> = words
                .into_iter()
                .filter_map(|word| {
                    let filters = with_search_value(&g.filters, word);
                    (!filters.is_empty()).then(|| {
                        FilterRequest::Group(FilterGroupRequest {
                            group_operation: g.group_operation,
                            token: token.clone(),
                            filters,
                        })
                    })
                })
                .collect();

            match per_word.len() {
                0 => None,
                1 => per_word.pop(),
                _ => Some(FilterRequest::Group(FilterGroupRequest {
                    group_operation: FilterGroupOperation::And,
                    token: None,
                    filters: per_word,
                })),
            }
        }
    }
}

/// Requests for `filters` with `text` placed into every condition left without a value.
fn with_search_value(filters: &[FilterOptionParsed], text: &str) -> Vec<FilterRequest> {
    filters
        .iter()
        .filter_map(|f| match f {
            FilterOptionParsed::Condition(c) if c.value.is_null() => {
                Some(FilterRequest::Condition(FilterConditionRequest {
                    token: c.token.full_key.clone(),
                    operation: c.operation,
                    value: Value::String(text.to_string()),
                }))
            }
            FilterOptionParsed::Group(g) if g.pinned.is_none() => {
                let filters = with_search_value(&g.filters, text);
                (!filters.is_empty()).then(|| {
                    FilterRequest::Group(FilterGroupRequest {
                        group_operation: g.group_operation,
                        token: g.token.as_ref().map(|t| t.full_key.clone()),
                        filters,
                    })
                })
            }
            other => to_filter_request(other),
        })
        .collect()
}

/// Drops aggregate filters from a filter tree; groups left empty are dropped too.
pub fn without_aggregate(filter: &FilterOptionParsed) -> Option<FilterOptionParsed> {
    if has_aggregate(filter.token().map(|t| t.as_ref())) {
        return None;
    }

    match filter {
        FilterOptionParsed::Condition(_) => Some(filter.clone()),
        FilterOptionParsed::Group(g) => {
            let filters: Vec<_> = g.filters.iter().filter_map(without_aggregate).collect();
            if filters.is_empty() {
                return None;
            }
            Some(FilterOptionParsed::Group(FilterGroupOptionParsed {
                filters,
                ..g.clone()
            }))
        }
    }
}

/// Converts parsed filters back into authored filters.
pub fn to_filter_options(filters: &[FilterOptionParsed]) -> Vec<FilterOption> {
    filters
        .iter()
        .map(|f| match f {
            FilterOptionParsed::Condition(c) => FilterOption::Condition(FilterConditionOption {
                token: c.token.full_key.clone(),
                frozen: c.frozen,
                operation: Some(c.operation),
                value: c.value.clone(),
                pinned: c.pinned.clone(),
            }),
            FilterOptionParsed::Group(g) => FilterOption::Group(FilterGroupOption {
                token: g.token.as_ref().map(|t| t.full_key.clone()),
                frozen: g.frozen,
                group_operation: g.group_operation,
                filters: to_filter_options(&g.filters),
                pinned: g.pinned.clone(),
                value: g.value.clone(),
            }),
        })
        .collect()
}

/// Converts parsed options back into authored options.
///
/// Columns are expressed relative to the query's defaults when they start
/// with them (`Add`), otherwise the full list is given (`Replace`).
pub fn to_find_options(fop: &FindOptionsParsed, description: &QueryDescription) -> FindOptions {
    let defaults: Vec<&str> = description
        .default_columns()
        .map(|c| c.name.as_str())
        .collect();
    let keys: Vec<Option<&str>> = fop.column_options.iter().map(|c| c.full_key()).collect();

    let starts_with_defaults = keys.len() >= defaults.len()
        && defaults
            .iter()
            .zip(&keys)
            .all(|(d, k)| Some(*d) == *k)
        && fop.column_options[..defaults.len()]
            .iter()
            .all(|c| c.display_name.is_none());

    let (column_options_mode, columns) = if starts_with_defaults {
        (ColumnOptionsMode::Add, &fop.column_options[defaults.len()..])
    } else {
        (ColumnOptionsMode::Replace, &fop.column_options[..])
    };

    FindOptions {
        query_name: fop.query_key.clone(),
        group_results: fop.group_results,
        parent_token: None,
        parent_value: None,
        filter_options: to_filter_options(&fop.filter_options),
        order_options: fop
            .order_options
            .iter()
            .map(|o| OrderOption {
                token: o.token.full_key.clone(),
                order_type: o.order_type,
            })
            .collect(),
        column_options_mode,
        column_options: columns
            .iter()
            .filter_map(|c| {
                c.token.as_ref().map(|t| ColumnOption {
                    token: t.full_key.clone(),
                    display_name: c.display_name.clone(),
                })
            })
            .collect(),
        pagination: Some(fop.pagination.clone()),
        system_time: fop.system_time.clone(),
    }
}
