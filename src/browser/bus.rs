//! In-process stand-in for the browser's message plumbing. Detectors hang
//! off per-tab mpsc channels, the coordinator owns one shared channel, and
//! detection events go out on a broadcast nobody has to listen to.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::domain::{AnalysisRequest, AnalysisResult, TabId};
use crate::protocol::{
    Ack, AnalysisError, ChannelError, CoordinatorRequest, DetectionEvent, PageContentReply,
    TabRequest,
};

const EVENT_CAPACITY: usize = 64;
pub const TAB_CHANNEL_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct BrowserBus {
    detectors: Arc<RwLock<HashMap<TabId, mpsc::Sender<TabRequest>>>>,
    coordinator: mpsc::Sender<CoordinatorRequest>,
    events: broadcast::Sender<DetectionEvent>,
}

impl BrowserBus {
    pub fn new(coordinator: mpsc::Sender<CoordinatorRequest>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            detectors: Arc::new(RwLock::new(HashMap::new())),
            coordinator,
            events,
        }
    }

    pub fn register_detector(&self, tab: TabId, sender: mpsc::Sender<TabRequest>) {
        self.detectors.write().insert(tab, sender);
    }

    pub fn unregister_detector(&self, tab: TabId) {
        self.detectors.write().remove(&tab);
    }

    /// A detector counts as present only while its channel is open. A dead
    /// detector that was never unregistered does not count.
    pub fn has_detector(&self, tab: TabId) -> bool {
        self.detectors
            .read()
            .get(&tab)
            .map(|sender| !sender.is_closed())
            .unwrap_or(false)
    }

    pub async fn ping(&self, tab: TabId) -> Result<Ack, ChannelError> {
        self.tab_request(tab, |reply| TabRequest::Ping { reply }).await
    }

    pub async fn get_page_content(&self, tab: TabId) -> Result<PageContentReply, ChannelError> {
        self.tab_request(tab, |reply| TabRequest::GetPageContent { reply })
            .await
    }

    pub async fn manual_scan(&self, tab: TabId) -> Result<Ack, ChannelError> {
        self.tab_request(tab, |reply| TabRequest::ManualScan { reply })
            .await
    }

    pub async fn set_badge(&self, tab: TabId) -> Result<Ack, ChannelError> {
        self.coordinator_request(|reply| CoordinatorRequest::SetBadge { tab, reply })
            .await
    }

    pub async fn stop_badge(&self, tab: TabId) -> Result<Ack, ChannelError> {
        self.coordinator_request(|reply| CoordinatorRequest::StopBadge { tab, reply })
            .await
    }

    /// Ask the coordinator to run one analysis exchange. The outer error is
    /// the channel failing, the inner one the analysis itself.
    pub async fn analyze_document(
        &self,
        request: AnalysisRequest,
    ) -> Result<Result<AnalysisResult, AnalysisError>, ChannelError> {
        self.coordinator_request(|reply| CoordinatorRequest::AnalyzeDocument { request, reply })
            .await
    }

    pub async fn notify_tab_updated(&self, tab: TabId, url: String) {
        let _ = self
            .coordinator
            .send(CoordinatorRequest::TabUpdated { tab, url })
            .await;
    }

    pub async fn notify_tab_removed(&self, tab: TabId) {
        let _ = self.coordinator.send(CoordinatorRequest::TabRemoved { tab }).await;
    }

    pub fn publish(&self, event: DetectionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DetectionEvent> {
        self.events.subscribe()
    }

    async fn tab_request<T>(
        &self,
        tab: TabId,
        make: impl FnOnce(oneshot::Sender<T>) -> TabRequest,
    ) -> Result<T, ChannelError> {
        let sender = self
            .detectors
            .read()
            .get(&tab)
            .cloned()
            .ok_or(ChannelError::ConnectionUnavailable)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        sender
            .send(make(reply_tx))
            .await
            .map_err(|_| ChannelError::ConnectionUnavailable)?;
        // A dropped reply slot means the detector died mid-request.
        reply_rx.await.map_err(|_| ChannelError::ConnectionUnavailable)
    }

    async fn coordinator_request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> CoordinatorRequest,
    ) -> Result<T, ChannelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.coordinator
            .send(make(reply_tx))
            .await
            .map_err(|_| ChannelError::ConnectionUnavailable)?;
        reply_rx.await.map_err(|_| ChannelError::ConnectionUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> (BrowserBus, mpsc::Receiver<CoordinatorRequest>) {
        let (tx, rx) = mpsc::channel(8);
        (BrowserBus::new(tx), rx)
    }

    #[tokio::test]
    async fn request_to_unknown_tab_is_connection_unavailable() {
        let (bus, _rx) = bus();
        let err = bus.ping(TabId(1)).await.unwrap_err();
        assert_eq!(err, ChannelError::ConnectionUnavailable);
    }

    #[tokio::test]
    async fn request_to_closed_channel_is_connection_unavailable() {
        let (bus, _rx) = bus();
        let (tab_tx, tab_rx) = mpsc::channel(1);
        bus.register_detector(TabId(1), tab_tx);
        drop(tab_rx);

        assert!(!bus.has_detector(TabId(1)));
        let err = bus.ping(TabId(1)).await.unwrap_err();
        assert_eq!(err, ChannelError::ConnectionUnavailable);
    }

    #[tokio::test]
    async fn ping_round_trips_through_a_live_detector() {
        let (bus, _rx) = bus();
        let (tab_tx, mut tab_rx) = mpsc::channel(1);
        bus.register_detector(TabId(7), tab_tx);

        tokio::spawn(async move {
            if let Some(TabRequest::Ping { reply }) = tab_rx.recv().await {
                let _ = reply.send(Ack);
            }
        });

        assert!(bus.has_detector(TabId(7)));
        bus.ping(TabId(7)).await.unwrap();
    }

    #[tokio::test]
    async fn dropped_reply_slot_is_connection_unavailable() {
        let (bus, _rx) = bus();
        let (tab_tx, mut tab_rx) = mpsc::channel(1);
        bus.register_detector(TabId(3), tab_tx);

        tokio::spawn(async move {
            if let Some(TabRequest::Ping { reply }) = tab_rx.recv().await {
                drop(reply);
            }
        });

        let err = bus.ping(TabId(3)).await.unwrap_err();
        assert_eq!(err, ChannelError::ConnectionUnavailable);
    }

    #[tokio::test]
    async fn events_reach_subscribers() {
        let (bus, _rx) = bus();
        let mut events = bus.subscribe();
        bus.publish(DetectionEvent::NoDocumentFound { tab: TabId(4) });

        match events.recv().await.unwrap() {
            DetectionEvent::NoDocumentFound { tab } => assert_eq!(tab, TabId(4)),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_fine() {
        let (bus, _rx) = bus();
        bus.publish(DetectionEvent::NoDocumentFound { tab: TabId(9) });
    }
}
