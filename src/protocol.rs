//! Message contract between the three runtime contexts. Requests carry a
//! oneshot reply slot; events are fire-and-forget broadcasts. Timeouts are
//! owned by callers, never by the handlers.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{AnalysisRequest, AnalysisResult, DocumentCategory, TabId};

pub type Reply<T> = oneshot::Sender<T>;

/// Bare acknowledgement for requests with no payload.
#[derive(Debug, Clone, Copy)]
pub struct Ack;

/// Requests served by the detector living in one tab.
#[derive(Debug)]
pub enum TabRequest {
    /// Liveness probe.
    Ping { reply: Reply<Ack> },
    /// Classify the page and hand back its content when it looks legal.
    GetPageContent { reply: Reply<PageContentReply> },
    /// Acknowledge, then re-run the detection pass.
    ManualScan { reply: Reply<Ack> },
}

#[derive(Debug, Clone)]
pub struct PageContentReply {
    pub is_legal_page: bool,
    pub category: Option<DocumentCategory>,
    pub content: Option<String>,
    pub url: String,
    pub title: String,
}

/// Requests served by the coordinator.
#[derive(Debug)]
pub enum CoordinatorRequest {
    AnalyzeDocument {
        request: AnalysisRequest,
        reply: Reply<Result<AnalysisResult, AnalysisError>>,
    },
    SetBadge {
        tab: TabId,
        reply: Reply<Ack>,
    },
    StopBadge {
        tab: TabId,
        reply: Reply<Ack>,
    },
    /// A tab navigated. Fire-and-forget.
    TabUpdated {
        tab: TabId,
        url: String,
    },
    /// A tab is gone. Fire-and-forget.
    TabRemoved {
        tab: TabId,
    },
}

/// Detection outcomes published to whoever listens. Losing one is harmless;
/// state can always be re-derived with a fresh content request.
#[derive(Debug, Clone)]
pub enum DetectionEvent {
    DocumentDetected {
        tab: TabId,
        category: DocumentCategory,
        url: String,
    },
    NoDocumentFound {
        tab: TabId,
    },
}

/// Why a request never produced a reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// No receiver on the other end: the detector was never injected,
    /// or died with the page it lived in. Recoverable by injecting.
    #[error("could not establish connection: receiving end does not exist")]
    ConnectionUnavailable,
    /// A receiver exists but did not answer within the budget.
    #[error("no reply within {budget:?}")]
    Timeout { budget: Duration },
}

/// Failures of the remote analysis exchange.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("cannot connect to the analysis service at {endpoint}; make sure the API server is running")]
    ServiceUnreachable { endpoint: String },
    #[error("analysis service returned HTTP {status}: {body}")]
    ServiceError { status: u16, body: String },
    #[error("no document content available to analyze")]
    NoContent,
}
