//! HTML rendering of comparisons

use crate::error::{ReportError, ReportResult};
use crate::view::ReportView;
use har_diff::Comparison;
use minijinja::Environment;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

const TEMPLATE_NAME: &str = "report.html";
const TEMPLATE_SOURCE: &str = include_str!("../templates/report.html.j2");

/// What to show in a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Page title and heading
    pub title: String,
    /// Domains whose checkboxes start ticked; empty ticks every domain
    pub domains: BTreeSet<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "HAR Compare".to_string(),
            domains: BTreeSet::new(),
        }
    }
}

impl ReportOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains = domains.into_iter().map(Into::into).collect();
        self
    }
}

/// Renders comparisons into a single self-contained HTML page
///
/// The template is compiled once at construction. Autoescaping is on for
/// every interpolated value (template name ends in `.html`).
pub struct ReportRenderer {
    env: Environment<'static>,
}

impl ReportRenderer {
    pub fn new() -> ReportResult<Self> {
        let mut env = Environment::new();
        env.add_filter("ms", format_ms);
        env.add_filter("signed_ms", format_signed_ms);
        env.add_template(TEMPLATE_NAME, TEMPLATE_SOURCE)?;
        Ok(Self { env })
    }

    pub fn render(&self, comparison: &Comparison, options: &ReportOptions) -> ReportResult<String> {
        let view = ReportView::build(comparison, &options.title, &options.domains);
        debug!(
            added = view.added.len(),
            removed = view.removed.len(),
            changed = view.changed.len(),
            domains = view.domains.len(),
            "Rendering report"
        );

        let template = self.env.get_template(TEMPLATE_NAME)?;
        Ok(template.render(&view)?)
    }

    /// Render and write to `path`
    pub fn write(
        &self,
        comparison: &Comparison,
        options: &ReportOptions,
        path: impl AsRef<Path>,
    ) -> ReportResult<()> {
        let path = path.as_ref();
        let html = self.render(comparison, options)?;
        std::fs::write(path, html.as_bytes()).map_err(|source| ReportError::WriteFile {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), bytes = html.len(), "Wrote report");
        Ok(())
    }
}

fn format_ms(value: f64) -> String {
    format!("{:.0}ms", value)
}

fn format_signed_ms(value: f64) -> String {
    format!("{:+.0}ms", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use har_config::CompareConfig;
    use har_core::RawExchange;
    use har_diff::compare;

    fn comparison() -> Comparison {
        let baseline = vec![
            RawExchange::new("GET", "https://api.test/users")
                .with_response_header("X-Version", "1")
                .with_elapsed_ms(40.0),
            RawExchange::new("GET", "https://api.test/old"),
            RawExchange::new("POST", "https://api.test/graphql").with_request_body(
                "application/json",
                r#"{"query":"query Viewer { viewer { id } }","variables":{"first":10}}"#,
            ),
        ];
        let candidate = vec![
            RawExchange::new("GET", "https://api.test/users")
                .with_status(503)
                .with_response_header("X-Version", "2")
                .with_elapsed_ms(400.0),
            RawExchange::new("POST", "https://api.test/graphql").with_request_body(
                "application/json",
                r#"{"query":"query Viewer { viewer { id name } }","variables":{"first":20}}"#,
            ),
            RawExchange::new("GET", "https://other.test/new?q=<script>"),
        ];
        compare(&baseline, &candidate, CompareConfig::default()).unwrap()
    }

    #[test]
    fn test_render_sections() {
        let html = ReportRenderer::new()
            .unwrap()
            .render(&comparison(), &ReportOptions::default())
            .unwrap();

        assert!(html.starts_with("<!doctype html>"));
        assert!(html.contains("<title>HAR Compare</title>"));
        assert!(html.contains("Added/Removed"));
        assert!(html.contains("id=\"rem-0\""));
        assert!(html.contains("id=\"add-0\""));
        assert!(html.contains("id=\"chg-0\""));
        assert!(html.contains("id=\"chg-1\""));
        assert!(html.contains("[Viewer] POST"));
        assert!(html.contains("gql:variables"));
        assert!(html.contains("+360ms"));
    }

    #[test]
    fn test_values_are_escaped() {
        let html = ReportRenderer::new()
            .unwrap()
            .render(&comparison(), &ReportOptions::default())
            .unwrap();
        assert!(!html.contains("q=<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_domain_preselection() {
        let renderer = ReportRenderer::new().unwrap();

        let all = renderer
            .render(&comparison(), &ReportOptions::default())
            .unwrap();
        assert_eq!(all.matches("class=\"domain-checkbox\" value=").count(), 2);
        assert_eq!(all.matches("data-checked=\"true\"").count(), 2);

        let only_other = renderer
            .render(
                &comparison(),
                &ReportOptions::default()
                    .with_title("Release 42")
                    .with_domains(["other.test"]),
            )
            .unwrap();
        assert_eq!(only_other.matches("data-checked=\"true\"").count(), 1);
        assert!(only_other.contains("<title>Release 42</title>"));
    }

    #[test]
    fn test_filter_prefs_persisted() {
        let renderer = ReportRenderer::new().unwrap();

        let all = renderer
            .render(&comparison(), &ReportOptions::default())
            .unwrap();
        assert!(all.contains("localStorage.setItem(PREFS_KEY"));
        assert!(all.contains("function loadPrefs()"));
        assert!(all.contains("var DOMAINS_PRESELECTED = false;"));
        assert!(all.contains("oninput=\"onFilterChanged()\""));
        assert!(!all.contains("onchange=\"filterRows()\""));

        let selected = renderer
            .render(
                &comparison(),
                &ReportOptions::default().with_domains(["api.test"]),
            )
            .unwrap();
        assert!(selected.contains("var DOMAINS_PRESELECTED = true;"));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");
        ReportRenderer::new()
            .unwrap()
            .write(&comparison(), &ReportOptions::default(), &path)
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("chg-0"));
    }

    #[test]
    fn test_empty_comparison() {
        let html = ReportRenderer::new()
            .unwrap()
            .render(&Comparison::default(), &ReportOptions::default())
            .unwrap();
        assert!(html.contains("No added requests"));
        assert!(html.contains("No changed requests"));
    }

    #[test]
    fn test_ms_filters() {
        assert_eq!(format_ms(63.4), "63ms");
        assert_eq!(format_signed_ms(-150.0), "-150ms");
        assert_eq!(format_signed_ms(70.0), "+70ms");
    }
}
