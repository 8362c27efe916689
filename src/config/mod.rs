pub mod env;
mod loader;

pub use env::{
    AnalysisConfig, AppConfig, BadgeConfig, DetectionConfig, PageFetchConfig, ProbeConfig,
    SessionConfig, SweepMode,
};
pub use loader::load_config;
