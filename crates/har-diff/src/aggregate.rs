//! Per-domain grouping of comparison outcomes

use crate::diff::DiffRecord;
use crate::matcher::MatchResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl ChangeCounts {
    /// Added, removed and changed (what a report lists)
    pub fn reported(&self) -> usize {
        self.added + self.removed + self.changed
    }

    pub fn total(&self) -> usize {
        self.reported() + self.unchanged
    }

    fn merge(&mut self, other: &ChangeCounts) {
        self.added += other.added;
        self.removed += other.removed;
        self.changed += other.changed;
        self.unchanged += other.unchanged;
    }
}

/// Outcomes for one domain
///
/// Index lists point into [`MatchResult::added`], [`MatchResult::removed`]
/// and the diff record sequence respectively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSummary {
    pub counts: ChangeCounts,
    pub added: Vec<usize>,
    pub removed: Vec<usize>,
    pub changed: Vec<usize>,
}

/// Read-only roll-up of a comparison, keyed by domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub totals: ChangeCounts,
    pub domains: BTreeMap<String, DomainSummary>,
}

impl Summary {
    /// Sorted domain names, for filter controls
    pub fn domain_names(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    pub fn domain(&self, name: &str) -> Option<&DomainSummary> {
        self.domains.get(name)
    }

    /// Counts restricted to `domains`; unknown names contribute nothing
    pub fn counts_for(&self, domains: &BTreeSet<String>) -> ChangeCounts {
        let mut counts = ChangeCounts::default();
        for summary in domains.iter().filter_map(|d| self.domains.get(d)) {
            counts.merge(&summary.counts);
        }
        counts
    }
}

/// Group added, removed and changed exchanges by domain
pub fn aggregate(result: &MatchResult, diffs: &[DiffRecord]) -> Summary {
    let mut domains: BTreeMap<String, DomainSummary> = BTreeMap::new();

    for (i, exchange) in result.added.iter().enumerate() {
        let entry = domains.entry(exchange.domain.clone()).or_default();
        entry.counts.added += 1;
        entry.added.push(i);
    }

    for (i, exchange) in result.removed.iter().enumerate() {
        let entry = domains.entry(exchange.domain.clone()).or_default();
        entry.counts.removed += 1;
        entry.removed.push(i);
    }

    for (i, record) in diffs.iter().enumerate() {
        let entry = domains.entry(record.domain.clone()).or_default();
        if record.is_changed() {
            entry.counts.changed += 1;
            entry.changed.push(i);
        } else {
            entry.counts.unchanged += 1;
        }
    }

    let mut totals = ChangeCounts::default();
    for summary in domains.values() {
        totals.merge(&summary.counts);
    }

    Summary { totals, domains }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffEngine;
    use crate::matcher::match_exchanges;
    use har_core::{ExchangeKind, Headers, NormalizedExchange};

    fn exchange(index: usize, domain: &str, path: &str, status: u16) -> NormalizedExchange {
        NormalizedExchange {
            index,
            method: "GET".to_string(),
            url: format!("https://{}{}", domain, path),
            normalized_url: format!("https://{}{}", domain, path),
            domain: domain.to_string(),
            path: path.to_string(),
            kind: ExchangeKind::Api,
            request_headers: Headers::default(),
            response_headers: Headers::default(),
            status,
            timing_ms: 0.0,
            started_at: None,
            request_body: None,
            response_body: None,
        }
    }

    fn summarize(
        baseline: Vec<NormalizedExchange>,
        comparison: Vec<NormalizedExchange>,
    ) -> Summary {
        let result = match_exchanges(baseline, comparison);
        let diffs = DiffEngine::new(100.0).diff_all(&result);
        aggregate(&result, &diffs)
    }

    #[test]
    fn test_empty() {
        let summary = summarize(vec![], vec![]);
        assert_eq!(summary.totals, ChangeCounts::default());
        assert_eq!(summary.domain_names().count(), 0);
    }

    #[test]
    fn test_groups_by_domain() {
        let summary = summarize(
            vec![
                exchange(0, "api.test", "/users", 200),
                exchange(1, "api.test", "/gone", 200),
                exchange(2, "cdn.test", "/same", 200),
            ],
            vec![
                exchange(0, "api.test", "/users", 500),
                exchange(1, "cdn.test", "/same", 200),
                exchange(2, "new.test", "/fresh", 200),
            ],
        );

        assert_eq!(
            summary.domain_names().collect::<Vec<_>>(),
            vec!["api.test", "cdn.test", "new.test"]
        );

        let api = summary.domain("api.test").unwrap();
        assert_eq!(api.counts.changed, 1);
        assert_eq!(api.counts.removed, 1);
        assert_eq!(api.changed, vec![0]);
        assert_eq!(api.removed, vec![0]);

        let cdn = summary.domain("cdn.test").unwrap();
        assert_eq!(cdn.counts.unchanged, 1);
        assert_eq!(cdn.counts.reported(), 0);

        assert_eq!(summary.domain("new.test").unwrap().added, vec![0]);

        assert_eq!(
            summary.totals,
            ChangeCounts {
                added: 1,
                removed: 1,
                changed: 1,
                unchanged: 1,
            }
        );
        assert_eq!(summary.totals.total(), 4);
    }

    #[test]
    fn test_counts_for_subset() {
        let summary = summarize(
            vec![exchange(0, "a.test", "/x", 200)],
            vec![exchange(0, "b.test", "/y", 200)],
        );
        let only_b: BTreeSet<String> = ["b.test".to_string(), "zzz".to_string()].into();
        let counts = summary.counts_for(&only_b);
        assert_eq!(counts.added, 1);
        assert_eq!(counts.removed, 0);
    }
}
