pub mod analysis;
pub mod badge;
pub mod service;

pub use analysis::AnalysisClient;
pub use badge::{BadgeSurface, LogBadgeSurface};
pub use service::Coordinator;
