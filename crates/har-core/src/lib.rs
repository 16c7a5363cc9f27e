//! Core types for HAR comparison
//!
//! This crate provides the fundamental types shared by every stage of the
//! comparison: the captured [`RawExchange`], its canonical
//! [`NormalizedExchange`], the closed [`ExchangeKind`] variant and the
//! [`MatchKey`] used to pair exchanges across two logs.

mod exchange;
mod headers;
mod match_key;

pub use exchange::{ExchangeKind, GraphQlCall, NormalizedExchange, RawExchange};
pub use headers::Headers;
pub use match_key::MatchKey;

/// Status recorded when a capture has no response (aborted, blocked, offline)
pub const STATUS_NO_RESPONSE: u16 = 0;

/// Collapse every run of whitespace to a single space and trim both ends
///
/// Used to compare GraphQL query text independently of formatting.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("  query {\n\tuser  { name }\n}  "),
            "query { user { name } }"
        );
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace(" \n\t "), "");
    }
}
