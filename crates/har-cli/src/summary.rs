use har_diff::{ChangeCounts, Summary};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Plain-text per-domain summary
///
/// With a non-empty `selected` set only those domains are listed and the
/// totals line covers them alone.
pub fn format_summary(summary: &Summary, selected: &BTreeSet<String>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== HAR Comparison Summary ===");

    let domains: Vec<_> = summary
        .domains
        .iter()
        .filter(|(name, _)| selected.is_empty() || selected.contains(*name))
        .collect();

    if domains.is_empty() {
        let _ = writeln!(out, "(no exchanges)");
    }

    let width = domains
        .iter()
        .map(|(name, _)| display_domain(name).len())
        .max()
        .unwrap_or(0);

    for (name, domain) in &domains {
        let _ = writeln!(
            out,
            "{:<width$}  {}",
            display_domain(name),
            counts_line(&domain.counts),
            width = width
        );
    }

    let totals = if selected.is_empty() {
        summary.totals
    } else {
        summary.counts_for(selected)
    };
    let _ = writeln!(out);
    let _ = writeln!(out, "Total: {}", counts_line(&totals));

    out
}

fn display_domain(name: &str) -> &str {
    if name.is_empty() {
        "(no domain)"
    } else {
        name
    }
}

fn counts_line(counts: &ChangeCounts) -> String {
    format!(
        "+{} added  -{} removed  ~{} changed  ={} unchanged",
        counts.added, counts.removed, counts.changed, counts.unchanged
    )
}
