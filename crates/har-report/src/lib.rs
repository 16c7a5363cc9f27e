//! HTML report for HAR comparisons
//!
//! Produces one standalone page with two tabs (added/removed and changed),
//! per-domain filter checkboxes, live search over request names and
//! expandable detail rows.

mod error;
mod render;
mod view;

pub use error::{ReportError, ReportResult};
pub use render::{ReportOptions, ReportRenderer};
