//! Exchange normalization
//!
//! Turns a captured [`RawExchange`] into a [`NormalizedExchange`]. This is a
//! total function: anything malformed degrades to sentinel values (empty
//! domain, non-GraphQL kind) rather than failing the run.

use har_config::{CompareConfig, ConfigError, ConfigResult};
use har_core::{ExchangeKind, GraphQlCall, Headers, NormalizedExchange, RawExchange};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, trace};
use url::{form_urlencoded, Url};

/// First named operation in a GraphQL document
///
/// Only definitions at document level count: either the start of the text or
/// right after a closing brace (a preceding fragment or operation). `#`
/// comments may sit in between.
const OPERATION_NAME_PATTERN: &str =
    r"(?:\A|\})(?:\s|#[^\n]*\n)*(?:query|mutation|subscription)\s+([_A-Za-z][_0-9A-Za-z]*)";

/// Canonicalizes raw exchanges according to a [`CompareConfig`]
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: CompareConfig,
    graphql_endpoints: Vec<Regex>,
    operation_name: Regex,
}

/// Parsed pieces of a URL
struct UrlParts {
    normalized: String,
    domain: String,
    path: String,
    /// Every decoded query pair, volatile ones included
    query: Vec<(String, String)>,
}

impl Normalizer {
    /// Validate the configuration and compile its patterns
    pub fn new(config: CompareConfig) -> ConfigResult<Self> {
        config.validate()?;
        let graphql_endpoints = config.graphql_endpoint_regexes()?;
        let operation_name =
            Regex::new(OPERATION_NAME_PATTERN).map_err(|source| ConfigError::InvalidPattern {
                pattern: OPERATION_NAME_PATTERN.to_string(),
                source,
            })?;

        Ok(Self {
            config,
            graphql_endpoints,
            operation_name,
        })
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Normalize a whole log, keeping capture order in `index`
    pub fn normalize_all(&self, raws: &[RawExchange]) -> Vec<NormalizedExchange> {
        let normalized: Vec<_> = raws
            .iter()
            .enumerate()
            .map(|(index, raw)| NormalizedExchange {
                index,
                ..self.normalize(raw)
            })
            .collect();

        debug!(
            exchanges = normalized.len(),
            graphql = normalized.iter().filter(|e| e.is_graphql()).count(),
            "Normalized exchange log"
        );

        normalized
    }

    /// Normalize a single exchange (`index` is left at 0)
    pub fn normalize(&self, raw: &RawExchange) -> NormalizedExchange {
        let method = raw.method.trim().to_uppercase();
        let url = self.normalize_url(&raw.url);

        let kind = match self.detect_graphql(&method, raw, &url) {
            Some(call) => ExchangeKind::GraphQl(call),
            None if self.is_static_asset(raw, &url.path) => ExchangeKind::StaticAsset,
            None => ExchangeKind::Api,
        };

        trace!(
            method = %method,
            url = %url.normalized,
            kind = %kind,
            "Normalized exchange"
        );

        NormalizedExchange {
            index: 0,
            method,
            url: raw.url.clone(),
            normalized_url: url.normalized,
            domain: url.domain,
            path: url.path,
            kind,
            request_headers: self.normalize_headers(&raw.request_headers),
            response_headers: self.normalize_headers(&raw.response_headers),
            status: raw.status,
            timing_ms: sanitize_timing(raw.elapsed_ms),
            started_at: raw.started_at,
            request_body: raw.request_body.clone(),
            response_body: raw.response_body.clone(),
        }
    }

    fn normalize_headers(&self, pairs: &[(String, String)]) -> Headers {
        Headers::from_pairs(
            pairs.iter().map(|(n, v)| (n.as_str(), v.as_str())),
            |name| self.config.is_volatile_header(name),
        )
    }

    fn normalize_url(&self, raw: &str) -> UrlParts {
        let raw = raw.trim();
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                trace!(url = %raw, error = %e, "Unparsable URL kept verbatim");
                return UrlParts {
                    normalized: raw.to_string(),
                    domain: String::new(),
                    path: raw.to_string(),
                    query: Vec::new(),
                };
            }
        };

        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        let mut kept: Vec<&(String, String)> = query
            .iter()
            .filter(|(key, _)| !self.config.is_volatile_param(key))
            .collect();
        // Stable: repeated keys keep their relative order
        kept.sort_by(|a, b| a.0.cmp(&b.0));

        let domain = url.host_str().unwrap_or("").to_lowercase();
        let mut normalized = format!("{}://{}", url.scheme(), domain);
        if let Some(port) = url.port() {
            normalized.push_str(&format!(":{}", port));
        }
        normalized.push_str(url.path());
        if !kept.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .finish();
            normalized.push('?');
            normalized.push_str(&encoded);
        }

        UrlParts {
            normalized,
            domain,
            path: url.path().to_string(),
            query,
        }
    }

    fn is_graphql_endpoint(&self, path: &str) -> bool {
        self.graphql_endpoints.iter().any(|re| re.is_match(path))
    }

    fn detect_graphql(
        &self,
        method: &str,
        raw: &RawExchange,
        url: &UrlParts,
    ) -> Option<GraphQlCall> {
        let body = raw.request_body.as_deref().filter(|b| !b.trim().is_empty());

        if method == "POST" {
            if let Some(call) = body.and_then(|b| self.graphql_from_json(b)) {
                return Some(call);
            }
        }

        if !self.is_graphql_endpoint(&url.path) {
            return None;
        }

        if let Some(call) = body.and_then(|b| self.graphql_from_json(b)) {
            return Some(call);
        }

        let is_graphql_mime = raw
            .request_mime_type
            .as_deref()
            .is_some_and(|m| m.to_lowercase().contains("graphql"));
        if let (true, Some(text)) = (is_graphql_mime, body) {
            return Some(self.build_call(None, text.to_string(), Value::Null));
        }

        self.graphql_from_query(&url.query)
    }

    /// `{"query": "...", "operationName": "...", "variables": {...}}`
    ///
    /// Persisted queries send no `query` text, only a declared
    /// `operationName`; those keep an empty query.
    fn graphql_from_json(&self, body: &str) -> Option<GraphQlCall> {
        let value: Value = serde_json::from_str(body).ok()?;
        let object = value.as_object()?;
        let declared_name = object
            .get("operationName")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty());

        let query = match object.get("query") {
            Some(query) => query.as_str()?.to_string(),
            None => {
                declared_name?;
                String::new()
            }
        };

        Some(self.build_call(
            declared_name,
            query,
            object.get("variables").cloned().unwrap_or(Value::Null),
        ))
    }

    /// GraphQL over HTTP GET: `?query=...&operationName=...&variables=...`
    fn graphql_from_query(&self, pairs: &[(String, String)]) -> Option<GraphQlCall> {
        let find = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let query = find("query")?;
        let variables = match find("variables") {
            Some(text) => {
                serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
            }
            None => Value::Null,
        };

        Some(self.build_call(find("operationName"), query.to_string(), variables))
    }

    fn build_call(
        &self,
        declared_name: Option<&str>,
        query: String,
        variables: Value,
    ) -> GraphQlCall {
        let operation_name = match declared_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => self.derive_operation_name(&query),
        };

        GraphQlCall {
            operation_name,
            query,
            variables,
        }
    }

    fn derive_operation_name(&self, query: &str) -> String {
        self.operation_name
            .captures(query)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }

    fn is_static_asset(&self, raw: &RawExchange, path: &str) -> bool {
        if self.config.is_static_path(path) {
            return true;
        }

        let content_type = raw.response_mime_type.as_deref().or_else(|| {
            raw.response_headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
                .map(|(_, value)| value.as_str())
        });

        content_type.is_some_and(|ct| self.config.is_static_content_type(ct))
    }
}

/// Missing (-1 in HAR), negative or non-finite timings become 0
fn sanitize_timing(elapsed_ms: f64) -> f64 {
    if elapsed_ms.is_finite() && elapsed_ms > 0.0 {
        elapsed_ms
    } else {
        0.0
    }
}
