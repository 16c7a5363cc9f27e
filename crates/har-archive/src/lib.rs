//! HTTP Archive reader
//!
//! Reads the `log.entries` of a HAR 1.2 document into [`RawExchange`]s.
//! Parsing is lenient: missing or `null` fields take defaults, an empty
//! method becomes `GET`, and a status outside `0..=999` becomes
//! [`har_core::STATUS_NO_RESPONSE`]. Base64 response bodies are kept
//! verbatim with their encoding recorded.
//!
//! [`RawExchange`]: har_core::RawExchange

mod error;
mod model;
mod reader;

pub use error::{ArchiveError, ArchiveResult};
pub use reader::{load_archive, parse_archive};
