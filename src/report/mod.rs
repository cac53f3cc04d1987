//! Data reference report
//!
//! Renders a [`Summary`](crate::types::Summary) as Markdown and writes it
//! to disk.

mod markdown;
mod writer;

pub use markdown::{render_markdown, COMMON_FUNCTION_LIMIT};
pub use writer::{write_report, ReportWriteError};
