mod flow;
mod types;

pub use flow::Orchestrator;
pub use types::{AcquiredDocument, RetryPolicy, UiState};
