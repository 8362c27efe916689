use std::{sync::Arc, time::Duration};

use anyhow::Result;
use reqwest::Client;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::timeout,
};
use tokio_cron_scheduler::JobScheduler;

use crate::{
    browser::{BrowserBus, TabRuntime},
    config::AppConfig,
    coordinator::{AnalysisClient, BadgeSurface, Coordinator, LogBadgeSurface},
    infrastructure::shutdown::Shutdown,
    orchestrator::Orchestrator,
    page_fetch::PageFetcher,
    scheduler::{SweepCallback, configure_sweep_jobs},
    session::{self, Session},
};

pub struct FinePrintApp {
    scheduler: JobScheduler,
    coordinator_handle: JoinHandle<()>,
    event_logger_handle: JoinHandle<()>,
    session: Session,
    sweep_rx: mpsc::Receiver<()>,
    shutdown: Shutdown,
}

impl FinePrintApp {
    pub async fn initialize(config: AppConfig, shutdown: Shutdown) -> Result<Self> {
        let config = Arc::new(config);

        let http_client = Client::builder()
            .user_agent(format!("fineprint-guard/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let analysis = AnalysisClient::new(http_client.clone(), config.analysis.clone());
        tracing::info!(target: "analysis", endpoint = analysis.endpoint(), "analysis client ready");
        let surface: Arc<dyn BadgeSurface> = Arc::new(LogBadgeSurface);
        let (coordinator, coordinator_tx) =
            Coordinator::new(analysis, surface, config.badge.clone());
        let coordinator_handle = coordinator.spawn(shutdown.subscribe());

        let bus = BrowserBus::new(coordinator_tx);
        let tabs = TabRuntime::new(bus.clone(), config.detection);
        let orchestrator = Orchestrator::new(
            bus.clone(),
            tabs.clone(),
            config.probe.clone(),
            config.analysis.reply_timeout,
        );
        let fetcher = PageFetcher::new(http_client, config.fetch.clone());
        let session = Session::new(tabs, orchestrator, fetcher, config.session.clone());

        let event_logger_handle = session::spawn_event_logger(&bus, shutdown.subscribe());

        let (sweep_tx, sweep_rx) = mpsc::channel(4);
        let scheduler =
            configure_sweep_jobs(&config.scheduler.cron_specs, build_sweep_callback(sweep_tx))
                .await?;

        Ok(Self {
            scheduler,
            coordinator_handle,
            event_logger_handle,
            session,
            sweep_rx,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let FinePrintApp {
            mut scheduler,
            mut coordinator_handle,
            event_logger_handle,
            mut session,
            mut sweep_rx,
            shutdown,
        } = self;

        tracing::info!("fineprint guard started");

        session.open_watch_tabs().await;
        tracing::info!(tabs = session.watched_count(), "watch tabs opened");
        session.sweep().await;

        let mut shutdown_listener = shutdown.subscribe();
        let shutdown_timeout = Duration::from_secs(5);

        loop {
            if shutdown_listener.is_triggered() {
                break;
            }
            tokio::select! {
                _ = shutdown_listener.notified() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
                trigger = sweep_rx.recv() => match trigger {
                    Some(()) => session.sweep().await,
                    None => break,
                },
            }
        }

        shutdown.trigger();

        match timeout(shutdown_timeout, scheduler.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(?err, "scheduler shutdown failed");
            }
            Err(_) => {
                tracing::warn!(
                    target: "scheduler",
                    "scheduler did not stop within {:?}",
                    shutdown_timeout
                );
            }
        }

        let coordinator_sleep = tokio::time::sleep(shutdown_timeout);
        tokio::pin!(coordinator_sleep);
        tokio::select! {
            res = &mut coordinator_handle => {
                if let Err(err) = res {
                    if err.is_panic() {
                        tracing::error!("coordinator task panicked");
                    }
                }
            }
            _ = &mut coordinator_sleep => {
                tracing::warn!(
                    target: "coordinator",
                    "coordinator did not stop within {:?}; aborting",
                    shutdown_timeout
                );
                coordinator_handle.abort();
            }
        }

        if timeout(shutdown_timeout, event_logger_handle).await.is_err() {
            tracing::warn!(
                target: "session",
                "event logger did not stop within {:?}",
                shutdown_timeout
            );
        }

        tracing::info!("fineprint guard stopped");
        Ok(())
    }
}

fn build_sweep_callback(sweep_tx: mpsc::Sender<()>) -> SweepCallback {
    Arc::new(move || {
        // A full queue means sweeps are already pending; dropping the
        // trigger loses nothing.
        if let Err(err) = sweep_tx.try_send(()) {
            tracing::debug!(target: "scheduler", error = %err, "sweep trigger dropped");
        }
    })
}
