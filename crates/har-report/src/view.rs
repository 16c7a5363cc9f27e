//! Template-facing view of a comparison
//!
//! The template only iterates and prints; every decision (which rows are
//! changed, which badges apply, how JSON is laid out) is made here.

use har_core::{GraphQlCall, Headers, NormalizedExchange};
use har_diff::{
    ChangeCounts, ChangeKind, Comparison, DiffRecord, HeaderDiff, HeaderScope, MatchedPair,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Serialize)]
pub(crate) struct ReportView {
    pub title: String,
    pub totals: ChangeCounts,
    pub domains: Vec<DomainOption>,
    /// Domains were chosen at render time; saved browser prefs must not override them
    pub domains_preselected: bool,
    pub added: Vec<ExchangeRow>,
    pub removed: Vec<ExchangeRow>,
    pub changed: Vec<ChangedRow>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DomainOption {
    pub name: String,
    pub label: String,
    pub checked: bool,
    pub counts: ChangeCounts,
}

/// An added or removed exchange
#[derive(Debug, Serialize)]
pub(crate) struct ExchangeRow {
    pub id: String,
    pub domain: String,
    pub name: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub timing_ms: f64,
    pub request_headers: Vec<(String, String)>,
    pub response_headers: Vec<(String, String)>,
    pub graphql: Option<GraphQlView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GraphQlView {
    pub operation: String,
    pub query: String,
    pub variables: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChangedRow {
    pub id: String,
    pub domain: String,
    pub name: String,
    pub method: String,
    pub url: String,
    pub old_status: u16,
    pub new_status: u16,
    pub status_changed: bool,
    pub old_timing_ms: f64,
    pub new_timing_ms: f64,
    pub timing_delta_ms: f64,
    pub timing_changed: bool,
    pub badges: Vec<&'static str>,
    pub request_header_diffs: Vec<HeaderDiffView>,
    pub response_header_diffs: Vec<HeaderDiffView>,
    pub graphql: Option<GraphQlChangeView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct HeaderDiffView {
    pub kind: ChangeKind,
    pub name: String,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GraphQlChangeView {
    pub old_operation: String,
    pub new_operation: String,
    pub operation_changed: bool,
    pub old_query: String,
    pub new_query: String,
    pub query_changed: bool,
    pub old_variables: Option<String>,
    pub new_variables: Option<String>,
    pub variables_changed: bool,
    pub details: Vec<String>,
}

impl ReportView {
    pub fn build(comparison: &Comparison, title: &str, selected: &BTreeSet<String>) -> Self {
        let domains = comparison
            .summary
            .domains
            .iter()
            .map(|(name, summary)| DomainOption {
                name: name.clone(),
                label: if name.is_empty() {
                    "(no domain)".to_string()
                } else {
                    name.clone()
                },
                checked: selected.is_empty() || selected.contains(name),
                counts: summary.counts,
            })
            .collect();

        let added = comparison
            .result
            .added
            .iter()
            .enumerate()
            .map(|(i, e)| exchange_row(format!("add-{}", i), e))
            .collect();

        let removed = comparison
            .result
            .removed
            .iter()
            .enumerate()
            .map(|(i, e)| exchange_row(format!("rem-{}", i), e))
            .collect();

        let changed = comparison
            .changed()
            .enumerate()
            .map(|(i, (pair, diff))| changed_row(format!("chg-{}", i), pair, diff))
            .collect();

        Self {
            title: title.to_string(),
            totals: comparison.summary.totals,
            domains,
            domains_preselected: !selected.is_empty(),
            added,
            removed,
            changed,
        }
    }
}

fn exchange_row(id: String, exchange: &NormalizedExchange) -> ExchangeRow {
    ExchangeRow {
        id,
        domain: exchange.domain.clone(),
        name: exchange.display_name(),
        method: exchange.method.clone(),
        url: exchange.url.clone(),
        status: exchange.status,
        timing_ms: exchange.timing_ms,
        request_headers: header_pairs(&exchange.request_headers),
        response_headers: header_pairs(&exchange.response_headers),
        graphql: exchange.kind.graphql().map(|call| GraphQlView {
            operation: call.operation_name.clone(),
            query: call.query.clone(),
            variables: pretty_variables(&call.variables),
        }),
    }
}

fn changed_row(id: String, pair: &MatchedPair, diff: &DiffRecord) -> ChangedRow {
    let graphql = diff.graphql_diff.as_ref().map(|gql| {
        let old = pair.baseline.kind.graphql();
        let new = pair.comparison.kind.graphql();
        let old_operation = operation(old);
        let new_operation = operation(new);
        GraphQlChangeView {
            operation_changed: old_operation != new_operation,
            old_operation,
            new_operation,
            old_query: old.map(|c| c.query.clone()).unwrap_or_default(),
            new_query: new.map(|c| c.query.clone()).unwrap_or_default(),
            query_changed: gql.query_changed,
            old_variables: old.and_then(|c| pretty_variables(&c.variables)),
            new_variables: new.and_then(|c| pretty_variables(&c.variables)),
            variables_changed: gql.variables_changed,
            details: gql.details.clone(),
        }
    });

    let mut badges = Vec::new();
    if diff.status_changed {
        badges.push("status");
    }
    if diff.timing_significant {
        badges.push("time");
    }
    if diff.headers_changed() {
        badges.push("headers");
    }
    if let Some(gql) = &diff.graphql_diff {
        if gql.query_changed {
            badges.push("gql:query");
        }
        if gql.variables_changed {
            badges.push("gql:variables");
        }
    }

    ChangedRow {
        id,
        domain: diff.domain.clone(),
        name: diff.name.clone(),
        method: pair.comparison.method.clone(),
        url: pair.comparison.url.clone(),
        old_status: diff.old_status,
        new_status: diff.new_status,
        status_changed: diff.status_changed,
        old_timing_ms: diff.old_timing_ms,
        new_timing_ms: diff.new_timing_ms,
        timing_delta_ms: diff.timing_delta_ms,
        timing_changed: diff.timing_significant,
        badges,
        request_header_diffs: header_diffs(diff, HeaderScope::Request),
        response_header_diffs: header_diffs(diff, HeaderScope::Response),
        graphql,
    }
}

fn header_pairs(headers: &Headers) -> Vec<(String, String)> {
    headers
        .display()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn header_diffs(diff: &DiffRecord, scope: HeaderScope) -> Vec<HeaderDiffView> {
    diff.header_diffs_in(scope).map(header_diff_view).collect()
}

fn header_diff_view(diff: &HeaderDiff) -> HeaderDiffView {
    HeaderDiffView {
        kind: diff.kind,
        name: diff.name.clone(),
        old_value: diff.old_value.clone().unwrap_or_default(),
        new_value: diff.new_value.clone().unwrap_or_default(),
    }
}

fn operation(call: Option<&GraphQlCall>) -> String {
    call.map(|c| c.operation_name.clone()).unwrap_or_default()
}

fn pretty_variables(variables: &Value) -> Option<String> {
    if variables.is_null() {
        return None;
    }
    serde_json::to_string_pretty(variables).ok()
}
