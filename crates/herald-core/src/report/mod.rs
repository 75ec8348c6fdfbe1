pub mod console;
pub mod json;
pub mod junit;
pub mod summary;
pub mod text;

pub use json::SummaryDocument;
pub use summary::{RunSummary, SummaryLimits, MAX_FAILURES, MAX_SLOWEST};
