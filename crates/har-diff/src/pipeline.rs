//! End-to-end comparison: normalize, match, diff, aggregate

use crate::aggregate::{aggregate, Summary};
use crate::diff::{DiffEngine, DiffRecord};
use crate::matcher::{match_exchanges, MatchResult, MatchedPair};
use crate::normalize::Normalizer;
use har_config::{CompareConfig, ConfigResult};
use har_core::{NormalizedExchange, RawExchange};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything a comparison produces
///
/// `diffs[i]` describes `result.matched[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub result: MatchResult,
    pub diffs: Vec<DiffRecord>,
    pub summary: Summary,
}

impl Comparison {
    /// Pairs classified as changed, with their diff
    pub fn changed(&self) -> impl Iterator<Item = (&MatchedPair, &DiffRecord)> {
        self.result
            .matched
            .iter()
            .zip(&self.diffs)
            .filter(|(_, diff)| diff.is_changed())
    }
}

/// Runs the full pipeline under one configuration
#[derive(Debug, Clone)]
pub struct Comparator {
    normalizer: Normalizer,
    engine: DiffEngine,
}

impl Comparator {
    pub fn new(config: CompareConfig) -> ConfigResult<Self> {
        let engine = DiffEngine::from_config(&config);
        let normalizer = Normalizer::new(config)?;
        Ok(Self { normalizer, engine })
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn engine(&self) -> &DiffEngine {
        &self.engine
    }

    /// Compare two captured logs
    pub fn compare(&self, baseline: &[RawExchange], comparison: &[RawExchange]) -> Comparison {
        self.compare_normalized(
            self.normalizer.normalize_all(baseline),
            self.normalizer.normalize_all(comparison),
        )
    }

    /// Compare two logs that were normalized separately (e.g. on worker threads)
    pub fn compare_normalized(
        &self,
        baseline: Vec<NormalizedExchange>,
        comparison: Vec<NormalizedExchange>,
    ) -> Comparison {
        let result = match_exchanges(baseline, comparison);
        let diffs = self.engine.diff_all(&result);
        let summary = aggregate(&result, &diffs);

        info!(
            added = summary.totals.added,
            removed = summary.totals.removed,
            changed = summary.totals.changed,
            unchanged = summary.totals.unchanged,
            domains = summary.domains.len(),
            "Comparison complete"
        );

        Comparison {
            result,
            diffs,
            summary,
        }
    }
}

/// Compare two logs with the given configuration
pub fn compare(
    baseline: &[RawExchange],
    comparison: &[RawExchange],
    config: CompareConfig,
) -> ConfigResult<Comparison> {
    Ok(Comparator::new(config)?.compare(baseline, comparison))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changed_filters_unchanged_pairs() {
        let baseline = vec![
            RawExchange::new("GET", "https://a.test/same"),
            RawExchange::new("GET", "https://a.test/broken"),
        ];
        let comparison = vec![
            RawExchange::new("GET", "https://a.test/same"),
            RawExchange::new("GET", "https://a.test/broken").with_status(500),
        ];

        let comparison = compare(&baseline, &comparison, CompareConfig::default()).unwrap();
        assert_eq!(comparison.diffs.len(), 2);

        let changed: Vec<_> = comparison.changed().collect();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].0.comparison.path, "/broken");
        assert_eq!(changed[0].1.new_status, 500);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let config = CompareConfig::default().with_timing_threshold_ms(-3.0);
        assert!(compare(&[], &[], config).is_err());
    }
}
