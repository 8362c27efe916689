//! The request flows a user action kicks off: acquire what the current
//! tab knows, send it for analysis, or ask for a fresh scan. Every await
//! here sits under a timeout owned by this side; the other contexts never
//! time out on our behalf.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::browser::{BrowserBus, TabRuntime, tabs};
use crate::config::env::ProbeConfig;
use crate::domain::{AnalysisRequest, TabId};
use crate::orchestrator::types::{AcquiredDocument, RetryPolicy, UiState};
use crate::protocol::{AnalysisError, ChannelError, PageContentReply};

pub struct Orchestrator {
    bus: BrowserBus,
    tabs: Arc<TabRuntime>,
    probe: ProbeConfig,
    analyze_timeout: Duration,
    retry: RetryPolicy,
}

impl Orchestrator {
    pub fn new(
        bus: BrowserBus,
        tabs: Arc<TabRuntime>,
        probe: ProbeConfig,
        analyze_timeout: Duration,
    ) -> Self {
        Self {
            bus,
            tabs,
            probe,
            analyze_timeout,
            retry: RetryPolicy::default(),
        }
    }

    /// Pull the detection verdict and document content out of a tab,
    /// injecting a detector first when none is there.
    pub async fn acquire(&self, tab: TabId) -> UiState {
        let Some(url) = self.tabs.page_url(tab) else {
            return UiState::error("no active tab found");
        };
        if !tabs::is_injectable(&url) {
            tracing::debug!(target: "orchestrator", tab = %tab, url = %url, "privileged page, not scanning");
            return UiState::NoDocuments;
        }

        // Liveness probe. No receiver is the recoverable case: inject and
        // give the detector a moment to come up. That injection consumes
        // the one retry the whole acquisition gets.
        let mut attempts_used = 0;
        match timeout(self.probe.probe_timeout, self.bus.ping(tab)).await {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => {
                if let Err(err) = self.inject_and_settle(tab).await {
                    return UiState::error(format!("cannot scan this page: {err}"));
                }
                attempts_used = 1;
            }
            Err(_) => {
                let err = ChannelError::Timeout {
                    budget: self.probe.probe_timeout,
                };
                return UiState::error(format!("unable to scan this page: {err}"));
            }
        }

        self.request_content(tab, attempts_used).await
    }

    /// Hand a previously acquired document to the analysis service.
    pub async fn analyze(&self, document: Option<&AcquiredDocument>) -> UiState {
        let Some(document) = document else {
            return UiState::error(AnalysisError::NoContent.to_string());
        };
        if document.content.is_empty() {
            return UiState::error(AnalysisError::NoContent.to_string());
        }

        let request = AnalysisRequest {
            content: document.content.clone(),
            category: Some(document.category),
        };
        match timeout(self.analyze_timeout, self.bus.analyze_document(request)).await {
            Ok(Ok(Ok(result))) => UiState::AnalysisComplete { result },
            Ok(Ok(Err(err))) => UiState::error(err.to_string()),
            Ok(Err(err)) => UiState::error(format!("analysis request failed: {err}")),
            Err(_) => {
                let err = ChannelError::Timeout {
                    budget: self.analyze_timeout,
                };
                UiState::error(format!("analysis request failed: {err}"))
            }
        }
    }

    /// Ask the resident detector to re-run detection, then read the fresh
    /// verdict. Assumes a detector is present; the content request still
    /// carries the usual retry if it is not.
    pub async fn rescan(&self, tab: TabId) -> UiState {
        match timeout(self.probe.probe_timeout, self.bus.manual_scan(tab)).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                return UiState::error(format!("failed to trigger a rescan: {err}"));
            }
            Err(_) => {
                let err = ChannelError::Timeout {
                    budget: self.probe.probe_timeout,
                };
                return UiState::error(format!("failed to trigger a rescan: {err}"));
            }
        }
        sleep(self.probe.settle_delay).await;
        self.request_content(tab, 0).await
    }

    async fn request_content(&self, tab: TabId, mut attempts_used: u32) -> UiState {
        loop {
            let budget = if attempts_used == 0 {
                self.probe.probe_timeout
            } else {
                self.probe.retry_timeout
            };
            match timeout(budget, self.bus.get_page_content(tab)).await {
                Ok(Ok(reply)) => return state_from_reply(tab, reply),
                Ok(Err(err)) => {
                    if self.retry.should_retry(&err, attempts_used) {
                        attempts_used += 1;
                        tracing::info!(
                            target: "orchestrator",
                            tab = %tab,
                            "detector unreachable, injecting and retrying"
                        );
                        if let Err(inject_err) = self.inject_and_settle(tab).await {
                            return UiState::error(format!("cannot scan this page: {inject_err}"));
                        }
                        continue;
                    }
                    return UiState::error(format!("unable to scan this page: {err}"));
                }
                Err(_) => {
                    let err = ChannelError::Timeout { budget };
                    return UiState::error(format!("unable to scan this page: {err}"));
                }
            }
        }
    }

    async fn inject_and_settle(&self, tab: TabId) -> Result<(), crate::browser::InjectError> {
        self.tabs.inject(tab)?;
        sleep(self.probe.settle_delay).await;
        Ok(())
    }
}

fn state_from_reply(tab: TabId, reply: PageContentReply) -> UiState {
    match (reply.is_legal_page, reply.category, reply.content) {
        (true, Some(category), Some(content)) => UiState::DetectedAwaitingAnalysis {
            document: AcquiredDocument {
                tab,
                category,
                content,
                url: reply.url,
                title: reply.title,
            },
        },
        _ => UiState::NoDocuments,
    }
}
