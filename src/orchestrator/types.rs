use crate::domain::{AnalysisResult, DocumentCategory, TabId};
use crate::protocol::ChannelError;

/// A document the acquisition flow pulled out of a tab, ready for analysis.
#[derive(Debug, Clone)]
pub struct AcquiredDocument {
    pub tab: TabId,
    pub category: DocumentCategory,
    pub content: String,
    pub url: String,
    pub title: String,
}

/// What the user-facing surface shows. Terminal states are mutually
/// exclusive; `Loading` only exists while a flow is in flight.
#[derive(Debug, Clone)]
pub enum UiState {
    Loading,
    NoDocuments,
    DetectedAwaitingAnalysis { document: AcquiredDocument },
    AnalysisComplete { result: AnalysisResult },
    Error { message: String },
}

impl UiState {
    pub fn error(message: impl Into<String>) -> Self {
        UiState::Error {
            message: message.into(),
        }
    }
}

/// Retry budget for the acquisition flow. Only connection-class failures
/// are worth retrying; a timeout means the other side exists but is stuck,
/// and injecting again will not unstick it.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 1 }
    }
}

impl RetryPolicy {
    pub fn should_retry(&self, err: &ChannelError, attempts_used: u32) -> bool {
        attempts_used < self.max_attempts && matches!(err, ChannelError::ConnectionUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn connection_failures_get_one_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(&ChannelError::ConnectionUnavailable, 0));
        assert!(!policy.should_retry(&ChannelError::ConnectionUnavailable, 1));
    }

    #[test]
    fn timeouts_are_never_retried() {
        let policy = RetryPolicy::default();
        let timeout = ChannelError::Timeout {
            budget: Duration::from_secs(5),
        };
        assert!(!policy.should_retry(&timeout, 0));
    }
}
