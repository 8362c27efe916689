use std::env;
use std::time::Duration;

use url::Url;

use super::env::{
    AnalysisConfig, AppConfig, BadgeConfig, ConfigError, DetectionConfig, DirectoryConfig,
    LoggingConfig, PageFetchConfig, ProbeConfig, SchedulerConfig, SessionConfig, SweepMode,
};

const DEFAULT_ANALYZE_ENDPOINT: &str = "http://localhost:8000/scanner/quick-analyze/";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let endpoint_raw =
            env::var("ANALYZE_API_URL").unwrap_or_else(|_| DEFAULT_ANALYZE_ENDPOINT.to_string());
        let endpoint = Url::parse(&endpoint_raw).map_err(|err| ConfigError::Invalid {
            key: "ANALYZE_API_URL",
            reason: err.to_string(),
        })?;

        let analysis = AnalysisConfig {
            endpoint,
            reply_timeout: parse_millis("ANALYZE_TIMEOUT_MS", 30_000),
        };

        let badge = BadgeConfig {
            blink_interval: parse_millis("BADGE_BLINK_INTERVAL_MS", 500),
            auto_stop_after: parse_millis("BADGE_AUTO_STOP_MS", 10_000),
        };

        let probe = ProbeConfig {
            probe_timeout: parse_millis("PROBE_TIMEOUT_MS", 5_000),
            retry_timeout: parse_millis("PROBE_RETRY_TIMEOUT_MS", 3_000),
            settle_delay: parse_millis("INJECT_SETTLE_MS", 1_000),
        };

        let detection = DetectionConfig {
            content_match_threshold: parse_usize("CONTENT_MATCH_THRESHOLD", 2).max(1),
            content_prefix_chars: parse_usize("CONTENT_PREFIX_CHARS", 2_000),
            auto_inject: parse_bool("AUTO_INJECT", true),
        };

        let fetch = PageFetchConfig {
            fetch_timeout: parse_millis("PAGE_FETCH_TIMEOUT_MS", 10_000),
        };

        let session = SessionConfig {
            watch_urls: env::var("WATCH_URLS")
                .map(|value| {
                    value
                        .split(',')
                        .map(|part| part.trim().to_string())
                        .filter(|part| !part.is_empty())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
            sweep_mode: parse_sweep_mode()?,
            report_timezone: env::var("REPORT_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
            json_reports: parse_bool("REPORT_JSON", false),
        };

        let scheduler = SchedulerConfig {
            cron_specs: env::var("RESCAN_CRONS")
                .map(|value| {
                    value
                        .split(';')
                        .map(|part| part.trim().to_string())
                        .filter(|part| !part.is_empty())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_else(|_| vec!["0 0 9 * * *".to_string()]),
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            analysis,
            badge,
            probe,
            detection,
            fetch,
            session,
            scheduler,
            directories,
            logging,
        })
    }
}

fn parse_sweep_mode() -> Result<SweepMode, ConfigError> {
    match env::var("SWEEP_MODE") {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "reload" | "" => Ok(SweepMode::Reload),
            "rescan" => Ok(SweepMode::Rescan),
            other => Err(ConfigError::Invalid {
                key: "SWEEP_MODE",
                reason: format!("expected \"reload\" or \"rescan\", got \"{other}\""),
            }),
        },
        Err(_) => Ok(SweepMode::Reload),
    }
}

fn parse_millis(key: &str, default: u64) -> Duration {
    Duration::from_millis(
        env::var(key)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(default),
    )
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}
