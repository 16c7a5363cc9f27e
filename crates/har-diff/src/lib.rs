//! Matching and diffing of captured HTTP exchanges
//!
//! The comparison runs in four stages, each a pure function of its inputs:
//!
//! ```text
//!  RawExchange ──► Normalizer ──► match_exchanges ──► DiffEngine ──► aggregate
//!                  (per log)      (MatchResult)       (DiffRecord)   (Summary)
//! ```
//!
//! [`Comparator`] wires the stages together under one [`CompareConfig`].
//!
//! # Example
//!
//! ```ignore
//! use har_diff::Comparator;
//! use har_config::CompareConfig;
//!
//! let comparator = Comparator::new(CompareConfig::default())?;
//! let comparison = comparator.compare(&baseline, &candidate);
//! for (pair, diff) in comparison.changed() {
//!     println!("{} status {} -> {}", diff.name, diff.old_status, diff.new_status);
//! }
//! ```
//!
//! [`CompareConfig`]: har_config::CompareConfig

mod aggregate;
mod diff;
mod matcher;
mod normalize;
mod pipeline;

pub use aggregate::{aggregate, ChangeCounts, DomainSummary, Summary};
pub use diff::{
    diff_graphql, diff_headers, ChangeKind, Classification, DiffEngine, DiffRecord, GraphQlDiff,
    HeaderDiff, HeaderScope,
};
pub use matcher::{match_exchanges, MatchResult, MatchedPair};
pub use normalize::Normalizer;
pub use pipeline::{compare, Comparator, Comparison};
