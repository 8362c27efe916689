pub mod bus;
pub mod tabs;

pub use bus::BrowserBus;
pub use tabs::{InjectError, TabRuntime};
