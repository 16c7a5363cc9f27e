//! Comparison configuration
//!
//! Everything the normalizer and diff engine treat as policy lives here:
//! which query parameters and headers are volatile, which paths are GraphQL
//! endpoints, what counts as a static asset, and the timing noise threshold.

use crate::error::{ConfigError, ConfigResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Timing deltas at or below this many milliseconds are treated as jitter
pub const DEFAULT_TIMING_THRESHOLD_MS: f64 = 100.0;

/// Query parameters that vary between captures without changing meaning
pub const DEFAULT_VOLATILE_QUERY_PARAMS: &[&str] = &[
    "_",
    "access_token",
    "cache_bust",
    "cachebuster",
    "cb",
    "nocache",
    "nonce",
    "rand",
    "random",
    "request_id",
    "requestid",
    "session",
    "session_id",
    "sessionid",
    "sid",
    "t",
    "timestamp",
    "token",
    "ts",
];

/// Headers excluded from comparison (still kept for display)
pub const DEFAULT_VOLATILE_HEADERS: &[&str] = &[
    "age",
    "cf-ray",
    "content-length",
    "cookie",
    "date",
    "etag",
    "expires",
    "last-modified",
    "request-id",
    "server-timing",
    "set-cookie",
    "trace-id",
    "traceparent",
    "tracestate",
    "x-amzn-trace-id",
    "x-correlation-id",
    "x-request-id",
    "x-runtime",
    "x-trace-id",
];

/// Path patterns identifying GraphQL endpoints
pub const DEFAULT_GRAPHQL_ENDPOINTS: &[&str] = &["(?i)/graphql/?$", "(?i)/gql/?$"];

/// Path extensions of static assets
pub const DEFAULT_STATIC_EXTENSIONS: &[&str] = &[
    "avif", "css", "eot", "gif", "ico", "jpeg", "jpg", "js", "map", "mp4", "otf", "png", "svg",
    "ttf", "webm", "webp", "woff", "woff2",
];

/// Response content-type prefixes of static assets
pub const DEFAULT_STATIC_CONTENT_TYPES: &[&str] = &[
    "application/font",
    "application/javascript",
    "audio/",
    "font/",
    "image/",
    "text/css",
    "text/javascript",
    "video/",
];

/// Comparison policy shared by the normalizer and the diff engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Lowercased query parameter names dropped from the normalized URL
    pub volatile_query_params: BTreeSet<String>,
    /// Lowercased header names excluded from comparison
    pub volatile_headers: BTreeSet<String>,
    /// Regexes matched against the URL path
    pub graphql_endpoints: Vec<String>,
    /// Lowercased extensions without the leading dot
    pub static_extensions: BTreeSet<String>,
    /// Lowercased content-type prefixes
    pub static_content_types: Vec<String>,
    /// Absolute timing delta above which a change is significant
    pub timing_threshold_ms: f64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            volatile_query_params: to_set(DEFAULT_VOLATILE_QUERY_PARAMS),
            volatile_headers: to_set(DEFAULT_VOLATILE_HEADERS),
            graphql_endpoints: DEFAULT_GRAPHQL_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            static_extensions: to_set(DEFAULT_STATIC_EXTENSIONS),
            static_content_types: DEFAULT_STATIC_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timing_threshold_ms: DEFAULT_TIMING_THRESHOLD_MS,
        }
    }
}

impl CompareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volatile_param(mut self, name: &str) -> Self {
        self.volatile_query_params.insert(name.to_lowercase());
        self
    }

    pub fn with_volatile_header(mut self, name: &str) -> Self {
        self.volatile_headers.insert(name.to_lowercase());
        self
    }

    pub fn with_graphql_endpoint(mut self, pattern: &str) -> Self {
        self.graphql_endpoints.push(pattern.to_string());
        self
    }

    pub fn with_timing_threshold_ms(mut self, threshold_ms: f64) -> Self {
        self.timing_threshold_ms = threshold_ms;
        self
    }

    pub fn is_volatile_param(&self, name: &str) -> bool {
        self.volatile_query_params.contains(&name.to_lowercase())
    }

    /// `name` must already be lowercased
    pub fn is_volatile_header(&self, name: &str) -> bool {
        self.volatile_headers.contains(name)
    }

    /// Whether the last path segment carries a static asset extension
    pub fn is_static_path(&self, path: &str) -> bool {
        let segment = path.rsplit('/').next().unwrap_or(path);
        match segment.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                self.static_extensions.contains(&ext.to_lowercase())
            }
            _ => false,
        }
    }

    pub fn is_static_content_type(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.trim().to_lowercase();
        self.static_content_types
            .iter()
            .any(|prefix| mime_type.starts_with(prefix.as_str()))
    }

    /// Compile the GraphQL endpoint patterns
    pub fn graphql_endpoint_regexes(&self) -> ConfigResult<Vec<Regex>> {
        self.graphql_endpoints
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Check patterns compile and the threshold is usable
    pub fn validate(&self) -> ConfigResult<()> {
        self.graphql_endpoint_regexes()?;

        if !self.timing_threshold_ms.is_finite() || self.timing_threshold_ms < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "timing_threshold_ms".to_string(),
                reason: format!(
                    "must be a finite, non-negative number of milliseconds, got {}",
                    self.timing_threshold_ms
                ),
            });
        }

        Ok(())
    }
}

fn to_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}
