//! Per-tab detector. One agent lives in every injectable tab, classifies
//! the page once on startup and then serves requests until the tab
//! navigates away or closes, which drops its channel and ends the task.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::browser::BrowserBus;
use crate::config::env::DetectionConfig;
use crate::detector::classify;
use crate::domain::{DocumentCategory, PageSnapshot, TabId};
use crate::protocol::{Ack, DetectionEvent, PageContentReply, TabRequest};

pub struct DetectorAgent {
    tab: TabId,
    page: PageSnapshot,
    bus: BrowserBus,
    config: DetectionConfig,
}

impl DetectorAgent {
    pub fn new(tab: TabId, page: PageSnapshot, bus: BrowserBus, config: DetectionConfig) -> Self {
        Self {
            tab,
            page,
            bus,
            config,
        }
    }

    pub fn spawn(self, requests: mpsc::Receiver<TabRequest>) -> JoinHandle<()> {
        tokio::spawn(self.run(requests))
    }

    async fn run(self, mut requests: mpsc::Receiver<TabRequest>) {
        // Initial pass, the equivalent of scanning on page load.
        self.scan_and_notify().await;

        while let Some(request) = requests.recv().await {
            match request {
                TabRequest::Ping { reply } => {
                    let _ = reply.send(Ack);
                }
                TabRequest::GetPageContent { reply } => {
                    let _ = reply.send(self.page_content());
                }
                TabRequest::ManualScan { reply } => {
                    let _ = reply.send(Ack);
                    self.scan_and_notify().await;
                }
            }
        }

        tracing::debug!(target: "detector", tab = %self.tab, "detector stopped");
    }

    fn classify_page(&self) -> Option<DocumentCategory> {
        let signal = self.page.signal(self.config.content_prefix_chars);
        classify::classify(&signal, self.config.content_match_threshold)
    }

    fn page_content(&self) -> PageContentReply {
        let category = self.classify_page();
        PageContentReply {
            is_legal_page: category.is_some(),
            category,
            content: category.map(|_| self.page.content()),
            url: self.page.url.as_str().to_string(),
            title: self.page.title.clone(),
        }
    }

    async fn scan_and_notify(&self) {
        match self.classify_page() {
            Some(category) => {
                tracing::info!(
                    target: "detector",
                    tab = %self.tab,
                    category = category.as_str(),
                    url = %self.page.url,
                    "legal document detected"
                );
                if let Err(err) = self.bus.set_badge(self.tab).await {
                    tracing::warn!(target: "detector", tab = %self.tab, error = %err, "badge request failed");
                }
                self.bus.publish(DetectionEvent::DocumentDetected {
                    tab: self.tab,
                    category,
                    url: self.page.url.as_str().to_string(),
                });
            }
            None => {
                tracing::debug!(target: "detector", tab = %self.tab, "no legal document");
                if let Err(err) = self.bus.stop_badge(self.tab).await {
                    tracing::warn!(target: "detector", tab = %self.tab, error = %err, "badge request failed");
                }
                self.bus
                    .publish(DetectionEvent::NoDocumentFound { tab: self.tab });
            }
        }
    }
}
