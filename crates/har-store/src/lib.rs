//! Comparison history in SQLite
//!
//! Each [`ComparisonStore::record`] call writes a run (ULID id), the
//! normalized exchanges of both logs, and one outcome row per added,
//! removed, changed or unchanged entry.

mod error;
mod store;

pub use error::{StoreError, StoreResult};
pub use store::{ComparisonStore, RunRecord};
