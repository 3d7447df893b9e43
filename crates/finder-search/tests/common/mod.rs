#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use finder_query::{
    ColumnDescription, ColumnOption, ColumnOptionsMode, FilterType, FindOptions, Lite, Pagination,
    QueryDescription, QueryEntitiesRequest, QueryError, QueryRequest, QuerySchema, QueryToken,
    QueryValueRequest, ResultRow, ResultTable, TokenRequest, TokenResolver, TypeCatalog,
    TypeInfo, TypeKind, TypeReference, type_names,
};
use finder_search::{AbortSignal, QueryTransport, SearchConfig, SearchController, TransportError};
use serde_json::Value;
use tokio::sync::oneshot;

pub const QUERY: &str = "Order";

pub fn order_schema() -> QuerySchema {
    let description = QueryDescription::new(
        QUERY,
        [
            ColumnDescription::new("Entity", TypeReference::new("Order").lite(), Some(FilterType::Lite)),
            ColumnDescription::new("Id", TypeReference::new(type_names::NUMBER), Some(FilterType::Integer))
                .groupable(),
            ColumnDescription::new("Status", TypeReference::new(type_names::STRING), Some(FilterType::String))
                .groupable(),
            ColumnDescription::new("Amount", TypeReference::new(type_names::DECIMAL), Some(FilterType::Decimal)),
            ColumnDescription::new("Customer", TypeReference::new("Customer").lite(), Some(FilterType::Lite))
                .groupable(),
            ColumnDescription::new(
                "Lines",
                TypeReference::new("OrderLine").embedded().collection(),
                None,
            ),
        ],
    );
    let catalog = TypeCatalog::new()
        .with(TypeInfo::new(
            "Customer",
            TypeKind::Entity,
            [ColumnDescription::new("Name", TypeReference::new(type_names::STRING), Some(FilterType::String))
                .groupable()],
        ))
        .with(TypeInfo::new(
            "OrderLine",
            TypeKind::Embedded,
            [ColumnDescription::new("Quantity", TypeReference::new(type_names::NUMBER), Some(FilterType::Integer))],
        ));
    QuerySchema::new(description, catalog)
}

/// Scripted answer to one `execute_query` call.
pub enum Reply {
    Table(ResultTable),
    Fail(String),
    /// Waits for the gate, returning `Aborted` if the signal fires first.
    Gated(oneshot::Receiver<()>, ResultTable),
    /// Waits for the gate and answers even when aborted.
    Stubborn(oneshot::Receiver<()>, ResultTable),
}

#[derive(Default)]
pub struct Recorded {
    pub queries: Vec<QueryRequest>,
    pub entities: Vec<QueryEntitiesRequest>,
    pub values: Vec<QueryValueRequest>,
    pub token_batches: usize,
}

pub struct FakeTransport {
    schema: QuerySchema,
    replies: Mutex<VecDeque<Reply>>,
    /// Each token batch waits on the next gate, if one is queued.
    token_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    pub recorded: Arc<Mutex<Recorded>>,
    pub entities: Vec<Lite>,
    pub value: Value,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            schema: order_schema(),
            replies: Mutex::new(VecDeque::new()),
            token_gates: Mutex::new(VecDeque::new()),
            recorded: Arc::new(Mutex::new(Recorded::default())),
            entities: vec![Lite::new("Order", 1)],
            value: Value::from(42),
        }
    }

    pub fn reply(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn gate_tokens(&self, gate: oneshot::Receiver<()>) {
        self.token_gates.lock().unwrap().push_back(gate);
    }

    pub fn token_batches(&self) -> usize {
        self.recorded.lock().unwrap().token_batches
    }

    pub fn query_calls(&self) -> usize {
        self.recorded.lock().unwrap().queries.len()
    }

    pub fn last_query(&self) -> QueryRequest {
        self.recorded.lock().unwrap().queries.last().cloned().unwrap()
    }
}

#[async_trait]
impl TokenResolver for FakeTransport {
    async fn parse_tokens(
        &self,
        query_key: &str,
        requests: &[TokenRequest],
    ) -> Result<Vec<Arc<QueryToken>>, QueryError> {
        self.recorded.lock().unwrap().token_batches += 1;
        let gate = self.token_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.schema.parse_tokens(query_key, requests).await
    }
}

#[async_trait]
impl QueryTransport for FakeTransport {
    async fn execute_query(
        &self,
        request: &QueryRequest,
        mut signal: AbortSignal,
    ) -> Result<ResultTable, TransportError> {
        self.recorded.lock().unwrap().queries.push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Table(table)) => Ok(table),
            Some(Reply::Fail(message)) => Err(TransportError::Failed(message)),
            Some(Reply::Gated(gate, table)) => {
                tokio::select! {
                    _ = gate => Ok(table),
                    _ = signal.aborted() => Err(TransportError::Aborted),
                }
            }
            Some(Reply::Stubborn(gate, table)) => {
                let _ = gate.await;
                Ok(table)
            }
            None => Ok(table(request, Vec::new(), 0)),
        }
    }

    async fn query_entities(&self, request: &QueryEntitiesRequest) -> Result<Vec<Lite>, TransportError> {
        self.recorded.lock().unwrap().entities.push(request.clone());
        Ok(self.entities.clone())
    }

    async fn query_value(&self, request: &QueryValueRequest) -> Result<Value, TransportError> {
        self.recorded.lock().unwrap().values.push(request.clone());
        Ok(self.value.clone())
    }
}

/// A result table echoing the request's columns.
pub fn table(request: &QueryRequest, rows: Vec<ResultRow>, total_elements: u64) -> ResultTable {
    ResultTable {
        query_key: request.query_key.clone(),
        entity_column: "Entity".into(),
        columns: request.columns.iter().map(|c| c.token.clone()).collect(),
        rows,
        pagination: request.pagination.clone(),
        total_elements,
    }
}

/// A table with `columns` and one marker total, independent of any request.
pub fn marked(columns: &[&str], rows: Vec<ResultRow>, total_elements: u64) -> ResultTable {
    ResultTable {
        query_key: QUERY.into(),
        entity_column: "Entity".into(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
        pagination: Pagination::default(),
        total_elements,
    }
}

pub fn row(entity: Option<Lite>, values: Vec<Value>) -> ResultRow {
    ResultRow {
        entity,
        columns: values,
    }
}

pub fn find_options(columns: &[&str]) -> FindOptions {
    columns.iter().fold(
        FindOptions::new(QUERY).columns_mode(ColumnOptionsMode::Replace),
        |fo, c| fo.column(ColumnOption::new(*c)),
    )
}

pub fn controller(fo: &FindOptions) -> SearchController<FakeTransport> {
    SearchController::from_find_options(FakeTransport::new(), &order_schema(), fo, SearchConfig::default())
        .unwrap()
}
