//! The coordinator task. Single owner of all badge state; requests,
//! lifecycle notifications and timer ticks are interleaved on one loop so
//! per-tab transitions are strictly sequential. Analysis exchanges run on
//! detached tasks and reply straight into the caller's slot, so they never
//! stall badge handling.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::env::BadgeConfig;
use crate::coordinator::analysis::AnalysisClient;
use crate::coordinator::badge::{BadgeStateMachine, BadgeSurface, TimerFire};
use crate::infrastructure::shutdown::ShutdownListener;
use crate::protocol::{Ack, CoordinatorRequest};

const REQUEST_CAPACITY: usize = 64;

pub struct Coordinator {
    requests: mpsc::Receiver<CoordinatorRequest>,
    timers: mpsc::UnboundedReceiver<TimerFire>,
    badges: BadgeStateMachine,
    analysis: AnalysisClient,
}

impl Coordinator {
    pub fn new(
        analysis: AnalysisClient,
        surface: Arc<dyn BadgeSurface>,
        badge_config: BadgeConfig,
    ) -> (Self, mpsc::Sender<CoordinatorRequest>) {
        let (request_tx, requests) = mpsc::channel(REQUEST_CAPACITY);
        let (badges, timers) = BadgeStateMachine::new(surface, badge_config);
        (
            Self {
                requests,
                timers,
                badges,
                analysis,
            },
            request_tx,
        )
    }

    pub fn spawn(self, shutdown: ShutdownListener) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(mut self, mut shutdown: ShutdownListener) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                fire = self.timers.recv() => match fire {
                    Some(fire) => self.badges.on_timer(fire),
                    None => break,
                },
                request = self.requests.recv() => match request {
                    Some(request) => self.handle(request),
                    None => break,
                },
            }
        }
        tracing::info!(target: "coordinator", "coordinator stopped");
    }

    fn handle(&mut self, request: CoordinatorRequest) {
        match request {
            CoordinatorRequest::AnalyzeDocument { request, reply } => {
                let client = self.analysis.clone();
                tokio::spawn(async move {
                    let _ = reply.send(client.analyze(&request).await);
                });
            }
            CoordinatorRequest::SetBadge { tab, reply } => {
                self.badges.start(tab);
                let _ = reply.send(Ack);
            }
            CoordinatorRequest::StopBadge { tab, reply } => {
                self.badges.stop(tab, false);
                let _ = reply.send(Ack);
            }
            CoordinatorRequest::TabUpdated { tab, url } => {
                tracing::debug!(target: "coordinator", tab = %tab, url = %url, "tab updated");
                self.badges.tab_updated(tab);
            }
            CoordinatorRequest::TabRemoved { tab } => {
                self.badges.tab_removed(tab);
            }
        }
    }
}
