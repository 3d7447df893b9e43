use async_trait::async_trait;
use finder_query::{
    Lite, QueryEntitiesRequest, QueryRequest, QueryValueRequest, ResultTable, TokenResolver,
};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("request aborted")]
    Aborted,

    #[error("{0}")]
    Failed(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Serialization(e.to_string())
    }
}

/// Receiving side of a per-request cancellation.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once the request is aborted. Never completes otherwise.
    pub async fn aborted(&mut self) {
        let fired = self.rx.wait_for(|aborted| *aborted).await.is_ok();
        if !fired {
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

/// Data-access layer the controller talks to.
///
/// Token resolution goes through the same transport so a remote schema
/// service can answer the batched lookups of a grouping toggle.
#[async_trait]
pub trait QueryTransport: TokenResolver {
    /// Runs a search. Implementations should stop early once `signal` fires.
    async fn execute_query(
        &self,
        request: &QueryRequest,
        signal: AbortSignal,
    ) -> Result<ResultTable, TransportError>;

    async fn query_entities(&self, request: &QueryEntitiesRequest) -> Result<Vec<Lite>, TransportError>;

    async fn query_value(&self, request: &QueryValueRequest) -> Result<Value, TransportError>;
}
