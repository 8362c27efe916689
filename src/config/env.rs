use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub badge: BadgeConfig,
    pub probe: ProbeConfig,
    pub detection: DetectionConfig,
    pub fetch: PageFetchConfig,
    pub session: SessionConfig,
    pub scheduler: SchedulerConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub endpoint: Url,
    /// Whole-call budget the orchestrator allows one analysis exchange.
    pub reply_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct BadgeConfig {
    pub blink_interval: Duration,
    pub auto_stop_after: Duration,
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// First attempt at reaching a detector.
    pub probe_timeout: Duration,
    /// Shorter budget for the single retry after re-injection.
    pub retry_timeout: Duration,
    /// Grace period for a freshly injected detector to come up.
    pub settle_delay: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct DetectionConfig {
    /// Distinct phrase hits a category needs before body text counts.
    pub content_match_threshold: usize,
    /// How much of the body text a classification pass reads.
    pub content_prefix_chars: usize,
    /// Spawn a detector automatically on every navigation into an
    /// injectable page. Off means detectors only appear on demand.
    pub auto_inject: bool,
}

#[derive(Debug, Clone)]
pub struct PageFetchConfig {
    pub fetch_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub watch_urls: Vec<String>,
    pub sweep_mode: SweepMode,
    pub report_timezone: String,
    pub json_reports: bool,
}

/// What a scheduled sweep does with each watched tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    /// Re-fetch the page and run the full acquisition flow.
    Reload,
    /// Ask the resident detector to re-scan what it already has.
    Rescan,
}

impl SweepMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepMode::Reload => "reload",
            SweepMode::Rescan => "rescan",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub cron_specs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
