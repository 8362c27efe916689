//! Tab lifecycle. Owns the mapping of open tabs to their current page and
//! handles detector injection, including the automatic injection that
//! follows every navigation into an ordinary web page.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

use crate::browser::bus::{BrowserBus, TAB_CHANNEL_CAPACITY};
use crate::config::env::DetectionConfig;
use crate::detector::DetectorAgent;
use crate::domain::{PageSnapshot, TabId};

/// Schemes the browser refuses to run injected code on.
pub const PRIVILEGED_SCHEMES: &[&str] = &["chrome", "chrome-extension", "edge", "about"];

pub fn is_injectable(url: &Url) -> bool {
    !PRIVILEGED_SCHEMES.contains(&url.scheme())
}

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("cannot inject a detector into this page")]
    PrivilegedScheme,
    #[error("no tab with id {0}")]
    NoSuchTab(TabId),
}

pub struct TabRuntime {
    bus: BrowserBus,
    pages: RwLock<HashMap<TabId, PageSnapshot>>,
    next_id: AtomicU32,
    injections: AtomicU32,
    detection: DetectionConfig,
}

impl TabRuntime {
    pub fn new(bus: BrowserBus, detection: DetectionConfig) -> Arc<Self> {
        Arc::new(Self {
            bus,
            pages: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            injections: AtomicU32::new(0),
            detection,
        })
    }

    /// Open a tab on the given page. The tab id is fresh, never reused.
    pub async fn open_tab(&self, page: PageSnapshot) -> TabId {
        let tab = TabId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.navigate(tab, page).await;
        tab
    }

    /// Point an existing (or new) tab at a page. The old detector dies with
    /// the old page; the update notification goes out before any new
    /// detector can run, so badge cleanup is ordered before re-detection.
    pub async fn navigate(&self, tab: TabId, page: PageSnapshot) {
        self.bus.unregister_detector(tab);
        let url = page.url.as_str().to_string();
        self.pages.write().insert(tab, page);
        self.bus.notify_tab_updated(tab, url).await;

        if self.detection.auto_inject {
            if let Err(err) = self.inject(tab) {
                tracing::debug!(target: "tabs", tab = %tab, error = %err, "auto-inject skipped");
            }
        }
    }

    pub async fn remove_tab(&self, tab: TabId) {
        self.bus.unregister_detector(tab);
        self.pages.write().remove(&tab);
        self.bus.notify_tab_removed(tab).await;
        tracing::debug!(target: "tabs", tab = %tab, "tab removed");
    }

    /// Put a detector into the tab. No-op when a live one is already there;
    /// a dead one (closed channel) gets replaced.
    pub fn inject(&self, tab: TabId) -> Result<(), InjectError> {
        let page = self
            .pages
            .read()
            .get(&tab)
            .cloned()
            .ok_or(InjectError::NoSuchTab(tab))?;
        if !is_injectable(&page.url) {
            return Err(InjectError::PrivilegedScheme);
        }
        if self.bus.has_detector(tab) {
            return Ok(());
        }

        let (sender, receiver) = mpsc::channel(TAB_CHANNEL_CAPACITY);
        self.bus.register_detector(tab, sender);
        DetectorAgent::new(tab, page, self.bus.clone(), self.detection).spawn(receiver);
        self.injections.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(target: "tabs", tab = %tab, "detector injected");
        Ok(())
    }

    pub fn page_url(&self, tab: TabId) -> Option<Url> {
        self.pages.read().get(&tab).map(|page| page.url.clone())
    }

    #[cfg(test)]
    pub fn has_detector(&self, tab: TabId) -> bool {
        self.bus.has_detector(tab)
    }

    /// Total number of detector injections so far.
    #[cfg(test)]
    pub fn injection_count(&self) -> u32 {
        self.injections.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::{Ack, CoordinatorRequest};

    fn detection_config() -> DetectionConfig {
        DetectionConfig {
            content_match_threshold: 2,
            content_prefix_chars: 2_000,
            auto_inject: true,
        }
    }

    fn page(url: &str) -> PageSnapshot {
        PageSnapshot::empty(Url::parse(url).unwrap())
    }

    /// Coordinator stub that acks badge traffic and records lifecycle
    /// notifications.
    fn stub_coordinator() -> (
        mpsc::Sender<CoordinatorRequest>,
        mpsc::UnboundedReceiver<CoordinatorRequest>,
    ) {
        let (tx, mut rx) = mpsc::channel(16);
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                match request {
                    CoordinatorRequest::SetBadge { reply, .. }
                    | CoordinatorRequest::StopBadge { reply, .. } => {
                        let _ = reply.send(Ack);
                    }
                    other => {
                        let _ = seen_tx.send(other);
                    }
                }
            }
        });
        (tx, seen_rx)
    }

    #[tokio::test]
    async fn open_tab_injects_into_ordinary_pages() {
        let (coord_tx, _seen) = stub_coordinator();
        let bus = BrowserBus::new(coord_tx);
        let tabs = TabRuntime::new(bus.clone(), detection_config());

        let tab = tabs.open_tab(page("https://example.com/")).await;
        assert!(tabs.has_detector(tab));
        assert_eq!(tabs.injection_count(), 1);
    }

    #[tokio::test]
    async fn privileged_pages_never_get_detectors() {
        let (coord_tx, _seen) = stub_coordinator();
        let bus = BrowserBus::new(coord_tx);
        let tabs = TabRuntime::new(bus.clone(), detection_config());

        let tab = tabs.open_tab(page("about:blank")).await;
        assert!(!tabs.has_detector(tab));
        assert!(matches!(tabs.inject(tab), Err(InjectError::PrivilegedScheme)));
    }

    #[tokio::test]
    async fn inject_is_a_no_op_while_a_detector_lives() {
        let (coord_tx, _seen) = stub_coordinator();
        let bus = BrowserBus::new(coord_tx);
        let tabs = TabRuntime::new(bus.clone(), detection_config());

        let tab = tabs.open_tab(page("https://example.com/")).await;
        tabs.inject(tab).unwrap();
        tabs.inject(tab).unwrap();
        assert_eq!(tabs.injection_count(), 1);
    }

    #[tokio::test]
    async fn inject_into_unknown_tab_fails() {
        let (coord_tx, _seen) = stub_coordinator();
        let bus = BrowserBus::new(coord_tx);
        let tabs = TabRuntime::new(bus, detection_config());

        assert!(matches!(
            tabs.inject(TabId(99)),
            Err(InjectError::NoSuchTab(TabId(99)))
        ));
    }

    #[tokio::test]
    async fn navigation_notifies_before_reinjecting() {
        let (coord_tx, mut seen) = stub_coordinator();
        let bus = BrowserBus::new(coord_tx);
        let tabs = TabRuntime::new(bus.clone(), detection_config());

        let tab = tabs.open_tab(page("https://example.com/a")).await;
        tabs.navigate(tab, page("https://example.com/b")).await;

        let first = seen.recv().await.unwrap();
        assert!(matches!(first, CoordinatorRequest::TabUpdated { .. }));
        match seen.recv().await.unwrap() {
            CoordinatorRequest::TabUpdated { url, .. } => {
                assert_eq!(url, "https://example.com/b");
            }
            other => panic!("unexpected request: {other:?}"),
        }
        assert_eq!(tabs.injection_count(), 2);
    }

    #[tokio::test]
    async fn removal_drops_page_and_detector() {
        let (coord_tx, mut seen) = stub_coordinator();
        let bus = BrowserBus::new(coord_tx);
        let tabs = TabRuntime::new(bus.clone(), detection_config());

        let tab = tabs.open_tab(page("https://example.com/")).await;
        tabs.remove_tab(tab).await;

        assert!(tabs.page_url(tab).is_none());
        assert!(!tabs.has_detector(tab));
        // TabUpdated from open, then TabRemoved.
        let _ = seen.recv().await.unwrap();
        assert!(matches!(
            seen.recv().await.unwrap(),
            CoordinatorRequest::TabRemoved { .. }
        ));
    }
}
