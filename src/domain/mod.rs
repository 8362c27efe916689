pub mod page;
pub mod types;

pub use page::{PageSignal, PageSnapshot};
pub use types::{AnalysisRequest, AnalysisResult, BadgeView, DocumentCategory, TabId};
