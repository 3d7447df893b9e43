use std::sync::Arc;

use tracing::debug;

use crate::error::QueryError;
use crate::normalize::without_aggregate;
use crate::operation::FilterOperation;
use crate::options::ColumnOption;
use crate::parsed::{
    ColumnOptionParsed, FilterConditionOptionParsed, FilterGroupOptionParsed, FilterOptionParsed,
    FindOptionsParsed, OrderOptionParsed,
};
use crate::resolve::{SubTokensOptions, TokenCompleter, TokenResolver};
use crate::result::ResultRow;
use crate::schema::{ID_COLUMN, QueryDescription, TypeReference};
use crate::token::{QueryToken, has_aggregate, to_query_token};

/// Types whose values can be summarized with `Min`.
pub fn can_have_min(type_ref: &TypeReference) -> bool {
    type_ref.is_numeric()
}

/// An option carrying a single token that grouping may rewrite.
pub trait TokenSlot {
    fn slot_token(&self) -> Option<&Arc<QueryToken>>;
    fn set_token(&mut self, token: Arc<QueryToken>);
}

impl TokenSlot for OrderOptionParsed {
    fn slot_token(&self) -> Option<&Arc<QueryToken>> {
        Some(&self.token)
    }

    fn set_token(&mut self, token: Arc<QueryToken>) {
        self.token = token;
    }
}

impl TokenSlot for ColumnOptionParsed {
    fn slot_token(&self) -> Option<&Arc<QueryToken>> {
        self.token.as_ref()
    }

    // A custom header is replaced by the new token's name.
    fn set_token(&mut self, token: Arc<QueryToken>) {
        if self.display_name.is_some() {
            self.display_name = Some(token.nice_name.clone());
        }
        self.token = Some(token);
    }
}

enum Rewrite {
    Keep,
    Request(String),
    Drop,
}

fn plan(token: &QueryToken) -> Rewrite {
    if token.is_aggregate() {
        Rewrite::Keep
    } else if can_have_min(&token.type_ref) {
        if token.parent.is_none() && token.key == ID_COLUMN {
            Rewrite::Request("Count".to_string())
        } else {
            Rewrite::Request(format!("{}.Min", token.full_key))
        }
    } else if token.is_groupable {
        Rewrite::Keep
    } else {
        Rewrite::Drop
    }
}

fn request_aggregates<T: TokenSlot>(slots: &[T], completer: &mut TokenCompleter<'_>) {
    let options = SubTokensOptions::CAN_ELEMENT | SubTokensOptions::CAN_AGGREGATE;
    for token in slots.iter().filter_map(TokenSlot::slot_token) {
        if let Rewrite::Request(path) = plan(token) {
            completer.request(&path, options);
        }
    }
}

fn apply_aggregates<T: TokenSlot>(slots: Vec<T>, completer: &TokenCompleter<'_>) -> Result<Vec<T>, QueryError> {
    let mut result = Vec::with_capacity(slots.len());
    for mut slot in slots {
        let Some(token) = slot.slot_token() else {
            continue;
        };
        match plan(token) {
            Rewrite::Keep => result.push(slot),
            Rewrite::Request(path) => {
                slot.set_token(completer.get(&path)?);
                result.push(slot);
            }
            Rewrite::Drop => debug!(token = %token.full_key, "dropping non-groupable option"),
        }
    }
    Ok(result)
}

/// Switches `fop` to grouped results, rewriting orders and columns.
///
/// Numeric tokens become their `Min` aggregate (a numeric `Id` becomes `Count`),
/// groupable tokens stay as group keys and the rest are dropped. Filters are
/// left as they are. `fop` is only modified once every token resolved.
pub async fn enable_grouping(
    fop: &mut FindOptionsParsed,
    resolver: &dyn TokenResolver,
) -> Result<(), QueryError> {
    if fop.group_results {
        return Ok(());
    }

    let mut completer = TokenCompleter::new(resolver, fop.query_key.clone());
    request_aggregates(&fop.order_options, &mut completer);
    request_aggregates(&fop.column_options, &mut completer);
    completer.finished().await?;

    let order_options = apply_aggregates(fop.order_options.clone(), &completer)?;
    let column_options = apply_aggregates(fop.column_options.clone(), &completer)?;

    fop.order_options = order_options;
    fop.column_options = column_options;
    fop.group_results = true;
    debug!(query = %fop.query_key, "grouping enabled");
    Ok(())
}

/// Switches `fop` back to plain rows: aggregate tokens give way to their parent.
pub fn disable_grouping(fop: &mut FindOptionsParsed, description: &QueryDescription) {
    if !fop.group_results {
        return;
    }

    let id_token = description
        .column(ID_COLUMN)
        .map(|c| Arc::new(to_query_token(c)));
    let degrade = |token: &Arc<QueryToken>| -> Option<Arc<QueryToken>> {
        if token.is_aggregate() {
            token.parent.clone().or_else(|| id_token.clone())
        } else {
            Some(Arc::clone(token))
        }
    };

    fop.filter_options = degrade_filters(&fop.filter_options, &degrade);
    fop.order_options = degrade_slots(std::mem::take(&mut fop.order_options), &degrade);
    fop.column_options = degrade_slots(std::mem::take(&mut fop.column_options), &degrade);
    fop.group_results = false;
    debug!(query = %fop.query_key, "grouping disabled");
}

fn degrade_slots<T, F>(slots: Vec<T>, degrade: &F) -> Vec<T>
where
    T: TokenSlot,
    F: Fn(&Arc<QueryToken>) -> Option<Arc<QueryToken>>,
{
    slots
        .into_iter()
        .filter_map(|mut slot| {
            let current = slot.slot_token()?;
            let replacement = degrade(current)?;
            if !Arc::ptr_eq(current, &replacement) {
                slot.set_token(replacement);
            }
            Some(slot)
        })
        .collect()
}

fn degrade_filters<F>(filters: &[FilterOptionParsed], degrade: &F) -> Vec<FilterOptionParsed>
where
    F: Fn(&Arc<QueryToken>) -> Option<Arc<QueryToken>>,
{
    filters
        .iter()
        .filter_map(|f| match f {
            FilterOptionParsed::Condition(c) => {
                let token = degrade(&c.token)?;
                Some(FilterOptionParsed::Condition(FilterConditionOptionParsed {
                    token,
                    ..c.clone()
                }))
            }
            FilterOptionParsed::Group(g) => {
                let token = match &g.token {
                    Some(t) => Some(degrade(t)?),
                    None => None,
                };
                let filters = degrade_filters(&g.filters, degrade);
                if filters.is_empty() {
                    return None;
                }
                Some(FilterOptionParsed::Group(FilterGroupOptionParsed {
                    token,
                    filters,
                    ..g.clone()
                }))
            }
        })
        .collect()
}

/// Ungrouped filters selecting the rows behind one grouped `row`.
///
/// The snapshot's own non-aggregate filters come first, followed by one
/// `EqualTo` per non-aggregate snapshot column bound to the row's value.
/// A derived filter equal to one of the snapshot filters is still added.
pub fn group_filters(
    row: &ResultRow,
    result_columns: &[String],
    snapshot: &FindOptionsParsed,
) -> Vec<FilterOptionParsed> {
    let mut filters: Vec<FilterOptionParsed> = snapshot
        .filter_options
        .iter()
        .filter_map(without_aggregate)
        .collect();

    for token in snapshot.column_options.iter().filter_map(|c| c.token.as_ref()) {
        if has_aggregate(Some(token.as_ref())) {
            continue;
        }
        let value = result_columns
            .iter()
            .position(|c| *c == token.full_key)
            .and_then(|i| row.columns.get(i));
        let Some(value) = value else {
            debug!(token = %token.full_key, "column missing from result row");
            continue;
        };
        filters.push(FilterOptionParsed::Condition(FilterConditionOptionParsed {
            token: Arc::clone(token),
            operation: FilterOperation::EqualTo,
            value: value.clone(),
            frozen: false,
            pinned: None,
        }));
    }

    filters
}

/// Parents of the snapshot's aggregate columns, e.g. `Amount` for `Amount.Min`.
pub fn aggregate_parent_columns(snapshot: &FindOptionsParsed) -> Vec<ColumnOption> {
    let mut columns: Vec<ColumnOption> = Vec::new();
    for token in snapshot.column_options.iter().filter_map(|c| c.token.as_ref()) {
        if !token.is_aggregate() {
            continue;
        }
        let Some(parent) = token.parent() else {
            continue;
        };
        if !columns.iter().any(|c| c.token == parent.full_key) {
            columns.push(ColumnOption::new(parent.full_key.clone()));
        }
    }
    columns
}
