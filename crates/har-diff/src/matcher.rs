//! Pairing of exchanges across two logs
//!
//! Exchanges are grouped by [`MatchKey`]. Within a key, baseline exchanges
//! form a FIFO queue so the earliest-captured baseline exchange pairs with
//! the earliest-captured comparison exchange. Repeated calls (polling,
//! retries) therefore pair up in order instead of producing spurious
//! added/removed entries.

use har_core::{MatchKey, NormalizedExchange};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

/// A baseline exchange paired with its comparison counterpart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub baseline: NormalizedExchange,
    pub comparison: NormalizedExchange,
}

/// Outcome of matching two logs
///
/// Every input exchange lands in exactly one of the three collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Comparison exchanges with no baseline counterpart, in comparison order
    pub added: Vec<NormalizedExchange>,
    /// Baseline exchanges left unmatched, in baseline order
    pub removed: Vec<NormalizedExchange>,
    /// Pairs in comparison order
    pub matched: Vec<MatchedPair>,
}

impl MatchResult {
    /// Number of baseline exchanges that went into the match
    pub fn baseline_len(&self) -> usize {
        self.removed.len() + self.matched.len()
    }

    /// Number of comparison exchanges that went into the match
    pub fn comparison_len(&self) -> usize {
        self.added.len() + self.matched.len()
    }
}

/// Pair up `baseline` and `comparison` exchanges
///
/// Single pass over each side, O(n + m) time with an O(n) key index. Total
/// over any inputs: an empty baseline makes everything added, an empty
/// comparison makes everything removed.
pub fn match_exchanges(
    baseline: Vec<NormalizedExchange>,
    comparison: Vec<NormalizedExchange>,
) -> MatchResult {
    let mut queues: HashMap<MatchKey, VecDeque<usize>> = HashMap::new();
    for (slot, exchange) in baseline.iter().enumerate() {
        queues
            .entry(exchange.match_key())
            .or_default()
            .push_back(slot);
    }

    let mut slots: Vec<Option<NormalizedExchange>> = baseline.into_iter().map(Some).collect();
    let mut added = Vec::new();
    let mut matched = Vec::new();

    for exchange in comparison {
        let key = exchange.match_key();
        let partner = queues
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .and_then(|slot| slots[slot].take());

        match partner {
            Some(baseline) => {
                trace!(
                    key = %key,
                    baseline = baseline.index,
                    comparison = exchange.index,
                    "Matched exchange"
                );
                matched.push(MatchedPair {
                    baseline,
                    comparison: exchange,
                });
            }
            None => {
                trace!(key = %key, comparison = exchange.index, "Added exchange");
                added.push(exchange);
            }
        }
    }

    let removed: Vec<_> = slots.into_iter().flatten().collect();

    debug!(
        matched = matched.len(),
        added = added.len(),
        removed = removed.len(),
        "Matched exchange logs"
    );

    MatchResult {
        added,
        removed,
        matched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use har_core::{ExchangeKind, Headers};

    fn exchange(index: usize, method: &str, url: &str) -> NormalizedExchange {
        NormalizedExchange {
            index,
            method: method.to_string(),
            url: url.to_string(),
            normalized_url: url.to_string(),
            domain: "a.test".to_string(),
            path: "/".to_string(),
            kind: ExchangeKind::Api,
            request_headers: Headers::default(),
            response_headers: Headers::default(),
            status: 200,
            timing_ms: 0.0,
            started_at: None,
            request_body: None,
            response_body: None,
        }
    }

    fn indices(exchanges: &[NormalizedExchange]) -> Vec<usize> {
        exchanges.iter().map(|e| e.index).collect()
    }

    #[test]
    fn test_both_empty() {
        let result = match_exchanges(vec![], vec![]);
        assert_eq!(result, MatchResult::default());
    }

    #[test]
    fn test_empty_baseline_is_all_added() {
        let result = match_exchanges(
            vec![],
            vec![exchange(0, "GET", "/a"), exchange(1, "GET", "/b")],
        );
        assert_eq!(indices(&result.added), vec![0, 1]);
        assert!(result.removed.is_empty());
        assert!(result.matched.is_empty());
    }

    #[test]
    fn test_empty_comparison_is_all_removed() {
        let result = match_exchanges(
            vec![exchange(0, "GET", "/a"), exchange(1, "GET", "/b")],
            vec![],
        );
        assert_eq!(indices(&result.removed), vec![0, 1]);
        assert!(result.added.is_empty());
    }

    #[test]
    fn test_reordered_exchanges_match() {
        let result = match_exchanges(
            vec![exchange(0, "GET", "/a"), exchange(1, "GET", "/b")],
            vec![exchange(0, "GET", "/b"), exchange(1, "GET", "/a")],
        );
        assert_eq!(result.matched.len(), 2);
        assert_eq!(result.matched[0].baseline.index, 1);
        assert_eq!(result.matched[0].comparison.index, 0);
        assert_eq!(result.matched[1].baseline.index, 0);
    }

    #[test]
    fn test_method_is_part_of_key() {
        let result = match_exchanges(
            vec![exchange(0, "GET", "/a")],
            vec![exchange(0, "POST", "/a")],
        );
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.removed.len(), 1);
        assert!(result.matched.is_empty());
    }

    #[test]
    fn test_duplicates_pair_fifo() {
        let result = match_exchanges(
            vec![
                exchange(0, "GET", "/poll"),
                exchange(1, "GET", "/other"),
                exchange(2, "GET", "/poll"),
                exchange(3, "GET", "/poll"),
            ],
            vec![exchange(0, "GET", "/poll"), exchange(1, "GET", "/poll")],
        );

        let pairs: Vec<_> = result
            .matched
            .iter()
            .map(|p| (p.baseline.index, p.comparison.index))
            .collect();
        assert_eq!(pairs, vec![(0, 0), (2, 1)]);
        assert_eq!(indices(&result.removed), vec![1, 3]);
    }

    #[test]
    fn test_extra_duplicates_in_comparison_are_added() {
        let result = match_exchanges(
            vec![exchange(0, "GET", "/poll")],
            vec![
                exchange(0, "GET", "/poll"),
                exchange(1, "GET", "/poll"),
                exchange(2, "GET", "/poll"),
            ],
        );
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].comparison.index, 0);
        assert_eq!(indices(&result.added), vec![1, 2]);
    }

    #[test]
    fn test_conservation() {
        let baseline = vec![
            exchange(0, "GET", "/a"),
            exchange(1, "GET", "/a"),
            exchange(2, "GET", "/b"),
            exchange(3, "DELETE", "/c"),
        ];
        let comparison = vec![
            exchange(0, "GET", "/a"),
            exchange(1, "GET", "/d"),
            exchange(2, "GET", "/b"),
        ];
        let result = match_exchanges(baseline, comparison);
        assert_eq!(result.baseline_len(), 4);
        assert_eq!(result.comparison_len(), 3);
        assert_eq!(result.matched.len(), 2);
    }
}
