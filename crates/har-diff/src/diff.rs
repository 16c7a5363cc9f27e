//! Structured differences between matched exchanges

use crate::matcher::{MatchResult, MatchedPair};
use har_config::CompareConfig;
use har_core::{GraphQlCall, Headers, NormalizedExchange};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

static NULL: Value = Value::Null;

/// How an individual header (or variable) differs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

impl ChangeKind {
    /// The kind seen from the other side of the comparison
    pub fn inverse(self) -> Self {
        match self {
            ChangeKind::Added => ChangeKind::Removed,
            ChangeKind::Removed => ChangeKind::Added,
            ChangeKind::Changed => ChangeKind::Changed,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Removed => write!(f, "removed"),
            ChangeKind::Changed => write!(f, "changed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderScope {
    Request,
    Response,
}

impl fmt::Display for HeaderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderScope::Request => write!(f, "request"),
            HeaderScope::Response => write!(f, "response"),
        }
    }
}

/// One header that differs between baseline and comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderDiff {
    pub scope: HeaderScope,
    /// Lowercased header name
    pub name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub kind: ChangeKind,
}

/// Differences between the GraphQL payloads of a pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQlDiff {
    /// Query text differs after whitespace normalization
    pub query_changed: bool,
    /// Variables differ structurally
    pub variables_changed: bool,
    /// Human-readable lines, e.g. `variable 'id' changed: "1" -> "2"`
    pub details: Vec<String>,
}

impl GraphQlDiff {
    pub fn has_changes(&self) -> bool {
        self.query_changed || self.variables_changed
    }
}

/// Classification of a matched pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Changed,
    Unchanged,
}

/// Structured difference for one matched pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    /// Display name of the comparison side
    pub name: String,
    /// Domain used for grouping (comparison side, falling back to baseline)
    pub domain: String,
    pub baseline_index: usize,
    pub comparison_index: usize,
    pub old_status: u16,
    pub new_status: u16,
    pub status_changed: bool,
    pub old_timing_ms: f64,
    pub new_timing_ms: f64,
    /// `comparison - baseline`
    pub timing_delta_ms: f64,
    pub timing_significant: bool,
    pub header_diffs: Vec<HeaderDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphql_diff: Option<GraphQlDiff>,
    /// Static assets are never reported as changed
    pub eligible: bool,
}

impl DiffRecord {
    /// Whether any category differs, regardless of eligibility
    pub fn has_changes(&self) -> bool {
        self.status_changed
            || self.timing_significant
            || !self.header_diffs.is_empty()
            || self.graphql_diff.as_ref().is_some_and(GraphQlDiff::has_changes)
    }

    pub fn classification(&self) -> Classification {
        if self.eligible && self.has_changes() {
            Classification::Changed
        } else {
            Classification::Unchanged
        }
    }

    pub fn is_changed(&self) -> bool {
        self.classification() == Classification::Changed
    }

    pub fn headers_changed(&self) -> bool {
        !self.header_diffs.is_empty()
    }

    pub fn header_diffs_in(&self, scope: HeaderScope) -> impl Iterator<Item = &HeaderDiff> {
        self.header_diffs.iter().filter(move |d| d.scope == scope)
    }
}

/// Computes [`DiffRecord`]s for matched pairs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffEngine {
    timing_threshold_ms: f64,
}

impl DiffEngine {
    pub fn new(timing_threshold_ms: f64) -> Self {
        Self {
            timing_threshold_ms,
        }
    }

    pub fn from_config(config: &CompareConfig) -> Self {
        Self::new(config.timing_threshold_ms)
    }

    pub fn timing_threshold_ms(&self) -> f64 {
        self.timing_threshold_ms
    }

    /// One record per matched pair, in pair order
    pub fn diff_all(&self, result: &MatchResult) -> Vec<DiffRecord> {
        result.matched.iter().map(|pair| self.diff_pair(pair)).collect()
    }

    pub fn diff_pair(&self, pair: &MatchedPair) -> DiffRecord {
        self.diff(&pair.baseline, &pair.comparison)
    }

    pub fn diff(&self, baseline: &NormalizedExchange, comparison: &NormalizedExchange) -> DiffRecord {
        let timing_delta_ms = comparison.timing_ms - baseline.timing_ms;

        let mut header_diffs = Vec::new();
        diff_headers(
            HeaderScope::Request,
            &baseline.request_headers,
            &comparison.request_headers,
            &mut header_diffs,
        );
        diff_headers(
            HeaderScope::Response,
            &baseline.response_headers,
            &comparison.response_headers,
            &mut header_diffs,
        );

        let graphql_diff = if baseline.is_graphql() || comparison.is_graphql() {
            Some(diff_graphql(
                baseline.kind.graphql(),
                comparison.kind.graphql(),
            ))
        } else {
            None
        };

        let domain = if comparison.domain.is_empty() {
            baseline.domain.clone()
        } else {
            comparison.domain.clone()
        };

        DiffRecord {
            name: comparison.display_name(),
            domain,
            baseline_index: baseline.index,
            comparison_index: comparison.index,
            old_status: baseline.status,
            new_status: comparison.status,
            status_changed: baseline.status != comparison.status,
            old_timing_ms: baseline.timing_ms,
            new_timing_ms: comparison.timing_ms,
            timing_delta_ms,
            timing_significant: timing_delta_ms.abs() > self.timing_threshold_ms,
            header_diffs,
            graphql_diff,
            eligible: !(baseline.kind.is_static_asset() && comparison.kind.is_static_asset()),
        }
    }
}

/// Key-based symmetric difference of the comparable header views
///
/// Removed and changed entries follow baseline order, added entries follow
/// comparison order. Identical values are omitted.
pub fn diff_headers(
    scope: HeaderScope,
    old: &Headers,
    new: &Headers,
    differences: &mut Vec<HeaderDiff>,
) {
    let old = old.comparable();
    let new = new.comparable();

    for (name, old_value) in old {
        match new.get(name) {
            Some(new_value) if new_value == old_value => {}
            Some(new_value) => differences.push(HeaderDiff {
                scope,
                name: name.clone(),
                old_value: Some(old_value.clone()),
                new_value: Some(new_value.clone()),
                kind: ChangeKind::Changed,
            }),
            None => differences.push(HeaderDiff {
                scope,
                name: name.clone(),
                old_value: Some(old_value.clone()),
                new_value: None,
                kind: ChangeKind::Removed,
            }),
        }
    }

    for (name, new_value) in new {
        if !old.contains_key(name) {
            differences.push(HeaderDiff {
                scope,
                name: name.clone(),
                old_value: None,
                new_value: Some(new_value.clone()),
                kind: ChangeKind::Added,
            });
        }
    }
}

/// Compare GraphQL payloads; a missing side is an empty query with null variables
pub fn diff_graphql(old: Option<&GraphQlCall>, new: Option<&GraphQlCall>) -> GraphQlDiff {
    let old_query = old.map(GraphQlCall::normalized_query).unwrap_or_default();
    let new_query = new.map(GraphQlCall::normalized_query).unwrap_or_default();
    let old_vars = old.map(|c| &c.variables).unwrap_or(&NULL);
    let new_vars = new.map(|c| &c.variables).unwrap_or(&NULL);

    let mut diff = GraphQlDiff {
        query_changed: old_query != new_query,
        variables_changed: old_vars != new_vars,
        details: Vec::new(),
    };

    if diff.query_changed {
        diff.details.push("query text changed".to_string());
    }
    if diff.variables_changed {
        describe_variables(old_vars, new_vars, &mut diff.details);
    }

    diff
}

fn describe_variables(old: &Value, new: &Value, details: &mut Vec<String>) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            let keys: BTreeSet<&String> = old_map.keys().chain(new_map.keys()).collect();
            for key in keys {
                match (old_map.get(key), new_map.get(key)) {
                    (Some(_), None) => details.push(format!("variable '{}' removed", key)),
                    (None, Some(value)) => {
                        details.push(format!("variable '{}' added: {}", key, value))
                    }
                    (Some(a), Some(b)) if a != b => {
                        details.push(format!("variable '{}' changed: {} -> {}", key, a, b))
                    }
                    _ => {}
                }
            }
        }
        (Value::Null, _) => details.push(format!("variables added: {}", new)),
        (_, Value::Null) => details.push("variables removed".to_string()),
        _ => details.push(format!("variables changed: {} -> {}", old, new)),
    }
}
