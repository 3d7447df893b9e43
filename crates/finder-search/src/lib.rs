mod config;
mod controller;
mod error;
mod transport;

pub use config::SearchConfig;
pub use controller::{SearchController, SearchOutcome};
pub use error::SearchError;
pub use transport::{AbortHandle, AbortSignal, QueryTransport, TransportError, abort_pair};
