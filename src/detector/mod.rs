pub mod agent;
pub mod classify;
pub mod extract;
pub mod keywords;

pub use agent::DetectorAgent;
