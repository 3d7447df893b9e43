use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use finder_query::{
    ColumnOptionParsed, ColumnOptionsMode, FindOptions, FindOptionsParsed, Lite, Pagination,
    PaginationMode, QueryDescription, QuerySchema, QueryToken, ResultTable, SystemTime,
    aggregate_parent_columns, disable_grouping, enable_grouping, group_filters,
    parse_find_options, to_filter_options, to_query_entities_request, to_query_request,
    to_query_value_request, without_all_any,
};
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::transport::{AbortHandle, QueryTransport, TransportError, abort_pair};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Applied(Arc<ResultTable>),
    /// A later search (or an abort) took over; nothing was applied.
    Superseded,
}

struct State {
    options: FindOptionsParsed,
    /// Bumped on every edit of `options`.
    revision: u64,
    result: Option<Arc<ResultTable>>,
    /// Options that produced `result`.
    snapshot: Option<FindOptionsParsed>,
    generation: u64,
    in_flight: Option<AbortHandle>,
    search_count: u64,
}

impl State {
    fn edit(&mut self) -> &mut FindOptionsParsed {
        self.revision += 1;
        &mut self.options
    }

    fn supersede(&mut self) -> u64 {
        if let Some(previous) = self.in_flight.take() {
            debug!(generation = self.generation, "aborting in-flight search");
            previous.abort();
        }
        self.generation += 1;
        self.generation
    }

    fn grouped_result(&self) -> Result<(Arc<ResultTable>, &FindOptionsParsed), SearchError> {
        match (&self.result, &self.snapshot) {
            (Some(result), Some(snapshot)) if snapshot.group_results => Ok((Arc::clone(result), snapshot)),
            (Some(_), Some(_)) => Err(SearchError::InvalidState(
                "results are not grouped".into(),
            )),
            _ => Err(SearchError::InvalidState("no results to select from".into())),
        }
    }
}

/// Runs searches for one set of find options.
///
/// At most one search is authoritative: issuing a new one aborts the
/// previous, and a response that arrives after being superseded is
/// discarded. The state lock is never held across an await.
pub struct SearchController<T: QueryTransport> {
    transport: T,
    description: QueryDescription,
    config: SearchConfig,
    state: Mutex<State>,
}

impl<T: QueryTransport> SearchController<T> {
    pub fn new(
        transport: T,
        description: QueryDescription,
        options: FindOptionsParsed,
        config: SearchConfig,
    ) -> Self {
        Self {
            transport,
            description,
            config,
            state: Mutex::new(State {
                options,
                revision: 0,
                result: None,
                snapshot: None,
                generation: 0,
                in_flight: None,
                search_count: 0,
            }),
        }
    }

    /// Normalizes `fo` against `schema` and builds a controller for it.
    pub fn from_find_options(
        transport: T,
        schema: &QuerySchema,
        fo: &FindOptions,
        config: SearchConfig,
    ) -> Result<Self, SearchError> {
        let normalized = parse_find_options(fo, schema, &config.normalize)?;
        if !normalized.is_clean() {
            warn!(
                query = %fo.query_name,
                skipped = normalized.skipped.len(),
                "some find options were skipped"
            );
        }
        Ok(Self::new(
            transport,
            schema.description().clone(),
            normalized.into_inner(),
            config,
        ))
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn description(&self) -> &QueryDescription {
        &self.description
    }

    pub fn options(&self) -> FindOptionsParsed {
        self.state().options.clone()
    }

    /// Edits the current options in place. Takes effect on the next search.
    pub fn update_options<R>(&self, f: impl FnOnce(&mut FindOptionsParsed) -> R) -> R {
        f(self.state().edit())
    }

    pub fn result(&self) -> Option<Arc<ResultTable>> {
        self.state().result.clone()
    }

    pub fn snapshot(&self) -> Option<FindOptionsParsed> {
        self.state().snapshot.clone()
    }

    pub fn search_count(&self) -> u64 {
        self.state().search_count
    }

    pub fn is_searching(&self) -> bool {
        self.state().in_flight.is_some()
    }

    pub async fn search(&self, reset_to_page1: bool) -> Result<SearchOutcome, SearchError> {
        let (generation, request, snapshot, signal) = {
            let mut state = self.state();
            let pagination = &state.options.pagination;
            if reset_to_page1
                && pagination.mode == PaginationMode::Paginate
                && pagination.current_page != Some(1)
            {
                state.edit().pagination.current_page = Some(1);
            }
            let request = to_query_request(&state.options);
            let generation = state.supersede();
            let (handle, signal) = abort_pair();
            state.in_flight = Some(handle);
            (generation, request, state.options.clone(), signal)
        };

        info!(query = %request.query_key, generation, grouped = request.group_results, "issuing search");
        let response = self.transport.execute_query(&request, signal).await;

        let mut state = self.state();
        if state.generation != generation {
            debug!(query = %request.query_key, generation, "discarding superseded search");
            return Ok(SearchOutcome::Superseded);
        }
        state.in_flight = None;

        match response {
            Ok(table) => {
                let table = Arc::new(table);
                state.result = Some(Arc::clone(&table));
                state.snapshot = Some(snapshot);
                state.search_count += 1;
                info!(
                    query = %request.query_key,
                    generation,
                    rows = table.rows.len(),
                    total = table.total_elements,
                    "search applied"
                );
                Ok(SearchOutcome::Applied(table))
            }
            Err(e) => {
                warn!(query = %request.query_key, generation, error = %e, "search failed");
                Err(SearchError::Request(e))
            }
        }
    }

    /// Cancels the in-flight search, if any.
    pub fn abort(&self) {
        self.state().supersede();
    }

    /// Flips grouping, reconciles orders and columns, and searches page 1.
    ///
    /// Fails with `InvalidState`, leaving the options as they are, if they
    /// were edited while grouping tokens were being resolved.
    pub async fn toggle_grouping(&self) -> Result<SearchOutcome, SearchError> {
        let (mut options, revision) = {
            let state = self.state();
            (state.options.clone(), state.revision)
        };
        if options.group_results {
            disable_grouping(&mut options, &self.description);
        } else {
            enable_grouping(&mut options, &self.transport).await?;
        }

        {
            let mut state = self.state();
            if state.revision != revision {
                warn!(query = %options.query_key, "options changed while toggling grouping");
                return Err(SearchError::InvalidState(
                    "find options changed while grouping was being toggled".into(),
                ));
            }
            *state.edit() = options;
            if self.config.clear_results_on_toggle {
                state.result = None;
            }
        }
        self.search(true).await
    }

    /// Replaces the pagination; `All` only clears results and waits for an explicit search.
    pub async fn change_pagination(&self, pagination: Pagination) -> Result<Option<SearchOutcome>, SearchError> {
        pagination.validate()?;
        let mode = pagination.mode;
        {
            let mut state = self.state();
            state.edit().pagination = pagination;
            state.result = None;
        }

        if mode == PaginationMode::All {
            return Ok(None);
        }
        self.search(false).await.map(Some)
    }

    /// Sets an `AsOf now` system time, or clears the current one.
    pub fn toggle_system_time(&self, now: impl Into<String>) -> Option<SystemTime> {
        let mut state = self.state();
        let options = state.edit();
        options.system_time = match options.system_time {
            Some(_) => None,
            None => Some(SystemTime::as_of(now)),
        };
        options.system_time.clone()
    }

    /// Inserts a column at `index`, lifted out of any any-or-all scope.
    pub fn insert_column(&self, index: usize, token: &Arc<QueryToken>) -> Result<(), SearchError> {
        let token = without_all_any(Some(token)).ok_or_else(|| {
            SearchError::InvalidState(format!("'{}' has no column outside its collection scope", token.full_key))
        })?;

        let mut state = self.state();
        let len = state.options.column_options.len();
        if index > len {
            return Err(SearchError::InvalidState(format!(
                "column index {index} out of range ({len} columns)"
            )));
        }
        state.edit().column_options.insert(index, ColumnOptionParsed::new(token));
        Ok(())
    }

    /// Removes the column at `index`. When grouped, orders on its token go too.
    pub fn remove_column(&self, index: usize) -> Result<ColumnOptionParsed, SearchError> {
        let mut state = self.state();
        if index >= state.options.column_options.len() {
            return Err(SearchError::InvalidState(format!(
                "column index {index} out of range ({} columns)",
                state.options.column_options.len()
            )));
        }

        let options = state.edit();
        let removed = options.column_options.remove(index);
        if options.group_results {
            if let Some(key) = removed.full_key() {
                options.order_options.retain(|o| o.token.full_key != key);
            }
        }
        Ok(removed)
    }

    /// Entities of the selected result rows.
    pub fn selected_entities(&self, rows: &[usize]) -> Result<Vec<Lite>, SearchError> {
        let state = self.state();
        let (Some(result), Some(snapshot)) = (&state.result, &state.snapshot) else {
            return Err(SearchError::InvalidState("no results to select from".into()));
        };
        if snapshot.group_results {
            return Err(SearchError::InvalidState(
                "grouped rows have no entity; use grouped_selected_entities".into(),
            ));
        }

        let mut entities = Vec::with_capacity(rows.len());
        for &index in rows {
            let row = result.rows.get(index).ok_or_else(|| {
                SearchError::InvalidState(format!("row {index} out of range"))
            })?;
            entities.extend(row.entity.clone());
        }
        Ok(entities)
    }

    /// Entities behind the selected grouped rows, one entities query per row.
    pub async fn grouped_selected_entities(&self, rows: &[usize]) -> Result<Vec<Lite>, SearchError> {
        let requests = {
            let state = self.state();
            let (result, snapshot) = state.grouped_result()?;
            let mut requests = Vec::with_capacity(rows.len());
            for &index in rows {
                let row = result.rows.get(index).ok_or_else(|| {
                    SearchError::InvalidState(format!("row {index} out of range"))
                })?;
                let filters = group_filters(row, &result.columns, snapshot);
                requests.push(to_query_entities_request(&snapshot.query_key, &filters, &[], None));
            }
            requests
        };

        let mut entities = Vec::new();
        for request in &requests {
            debug!(query = %request.query_key, filters = request.filters.len(), "querying grouped row entities");
            entities.extend(self.transport.query_entities(request).await?);
        }
        Ok(entities)
    }

    /// Find options listing the rows behind one grouped result row.
    pub fn drill_down(&self, row: usize) -> Result<FindOptions, SearchError> {
        let state = self.state();
        let (result, snapshot) = state.grouped_result()?;
        let row = result
            .rows
            .get(row)
            .ok_or_else(|| SearchError::InvalidState(format!("row {row} out of range")))?;

        let filters = group_filters(row, &result.columns, snapshot);
        let mut fo = FindOptions::new(snapshot.query_key.clone());
        fo.filter_options = to_filter_options(&filters);
        fo.column_options_mode = ColumnOptionsMode::Add;
        fo.column_options = aggregate_parent_columns(snapshot);
        fo.system_time = snapshot.system_time.clone();
        Ok(fo)
    }

    /// Number of rows matching the current filters.
    pub async fn count(&self) -> Result<u64, SearchError> {
        let request = to_query_value_request(&self.state().options, None);
        let value = self.transport.query_value(&request).await?;
        value.as_u64().ok_or_else(|| {
            SearchError::Request(TransportError::Serialization(format!(
                "expected a row count, got {value}"
            )))
        })
    }
}
