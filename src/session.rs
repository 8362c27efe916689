//! Drives the watch list: opens one tab per watched URL, runs the
//! scheduled sweeps and prints a report for whatever the sweep finds.
//! Reports go to stdout; everything else is structured logging.

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::browser::{BrowserBus, TabRuntime};
use crate::config::env::{SessionConfig, SweepMode};
use crate::domain::{AnalysisResult, TabId};
use crate::infrastructure::shutdown::ShutdownListener;
use crate::orchestrator::{Orchestrator, UiState};
use crate::page_fetch::PageFetcher;
use crate::protocol::DetectionEvent;

#[derive(Debug, Clone)]
struct WatchedTab {
    tab: TabId,
    url: String,
}

pub struct Session {
    tabs: Arc<TabRuntime>,
    orchestrator: Orchestrator,
    fetcher: PageFetcher,
    config: SessionConfig,
    watched: Vec<WatchedTab>,
}

impl Session {
    pub fn new(
        tabs: Arc<TabRuntime>,
        orchestrator: Orchestrator,
        fetcher: PageFetcher,
        config: SessionConfig,
    ) -> Self {
        Self {
            tabs,
            orchestrator,
            fetcher,
            config,
            watched: Vec::new(),
        }
    }

    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    /// Fetch every configured URL and open a tab for the ones that load.
    /// Failures are skipped with a warning; the session runs with what it
    /// has.
    pub async fn open_watch_tabs(&mut self) {
        if self.config.watch_urls.is_empty() {
            tracing::info!(target: "session", "no watch urls configured");
            return;
        }

        let urls = self.config.watch_urls.clone();
        let fetches = urls.iter().map(|url| self.fetcher.fetch(url));
        let pages = futures::future::join_all(fetches).await;

        for (url, page) in urls.into_iter().zip(pages) {
            match page {
                Ok(page) => {
                    let tab = self.tabs.open_tab(page).await;
                    tracing::info!(target: "session", tab = %tab, url = %url, "watching");
                    self.watched.push(WatchedTab { tab, url });
                }
                Err(err) => {
                    tracing::warn!(target: "session", url = %url, error = %format!("{err:#}"), "skipping watch url");
                }
            }
        }
    }

    /// Visit every watched tab once and report what came out.
    pub async fn sweep(&mut self) {
        if self.watched.is_empty() {
            tracing::info!(target: "session", "nothing to sweep");
            return;
        }

        tracing::info!(
            target: "session",
            tabs = self.watched.len(),
            mode = self.config.sweep_mode.as_str(),
            "sweep started"
        );
        let watched = self.watched.clone();
        for entry in &watched {
            self.report(entry, &UiState::Loading);
            let state = self.visit(entry).await;
            self.report(entry, &state);
        }
        tracing::info!(target: "session", "sweep finished");
    }

    async fn visit(&self, entry: &WatchedTab) -> UiState {
        tracing::debug!(target: "session", tab = %entry.tab, url = %entry.url, "visiting");

        let acquired = match self.config.sweep_mode {
            SweepMode::Reload => {
                match self.fetcher.fetch(&entry.url).await {
                    Ok(page) => self.tabs.navigate(entry.tab, page).await,
                    Err(err) => {
                        return UiState::error(format!("failed to reload {}: {err:#}", entry.url));
                    }
                }
                self.orchestrator.acquire(entry.tab).await
            }
            SweepMode::Rescan => self.orchestrator.rescan(entry.tab).await,
        };

        match acquired {
            UiState::DetectedAwaitingAnalysis { document } => {
                tracing::info!(
                    target: "session",
                    tab = %entry.tab,
                    category = document.category.as_str(),
                    "document detected, requesting analysis"
                );
                println!("[{}] {} detected", entry.url, document.category.label());
                self.orchestrator.analyze(Some(&document)).await
            }
            other => other,
        }
    }

    fn report(&self, entry: &WatchedTab, state: &UiState) {
        match state {
            UiState::AnalysisComplete { result } => {
                if self.config.json_reports {
                    match serde_json::to_string_pretty(result) {
                        Ok(json) => println!("{json}"),
                        Err(err) => {
                            tracing::warn!(target: "session", error = %err, "failed to encode report")
                        }
                    }
                    return;
                }
                println!("{}", self.format_report(entry, result));
            }
            UiState::NoDocuments => {
                println!("[{}] no legal documents detected", entry.url);
            }
            UiState::Error { message } => {
                tracing::warn!(target: "session", url = %entry.url, error = %message, "scan failed");
                println!("[{}] scan failed: {}", entry.url, message);
            }
            UiState::Loading => {
                println!("[{}] scanning...", entry.url);
            }
            // visit() resolves detection straight into an analysis outcome.
            UiState::DetectedAwaitingAnalysis { .. } => {}
        }
    }

    fn format_report(&self, entry: &WatchedTab, result: &AnalysisResult) -> String {
        let tz: Tz = self
            .config
            .report_timezone
            .parse()
            .unwrap_or(chrono_tz::UTC);
        let scanned_at = Utc::now().with_timezone(&tz);

        let mut report = format!(
            "==== legal document report ====\n\
             url: {}\n\
             scanned: {}\n\
             summary: {}\n",
            entry.url,
            scanned_at.format("%Y-%m-%d %H:%M:%S %Z"),
            result.short_summary,
        );
        report.push_str(&format!("risky points ({}):\n", result.risky_points.len()));
        for (index, point) in result.risky_points.iter().enumerate() {
            report.push_str(&format!("  {}. {}\n", index + 1, point));
        }
        report.push_str(&format!(
            "favourable points ({}):\n",
            result.favourable_points.len()
        ));
        for (index, point) in result.favourable_points.iter().enumerate() {
            report.push_str(&format!("  {}. {}\n", index + 1, point));
        }
        report.push_str("===============================");
        report
    }
}

/// Logs detection events as they happen, independent of sweeps.
pub fn spawn_event_logger(bus: &BrowserBus, mut shutdown: ShutdownListener) -> JoinHandle<()> {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                event = events.recv() => match event {
                    Ok(DetectionEvent::DocumentDetected { tab, category, url }) => {
                        tracing::info!(
                            target: "session",
                            tab = %tab,
                            category = category.as_str(),
                            url = %url,
                            "legal document detected"
                        );
                    }
                    Ok(DetectionEvent::NoDocumentFound { tab }) => {
                        tracing::debug!(target: "session", tab = %tab, "no documents in tab");
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(target: "session", skipped, "event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    })
}
