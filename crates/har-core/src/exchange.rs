//! Captured and normalized HTTP exchanges

use crate::headers::Headers;
use crate::match_key::MatchKey;
use crate::collapse_whitespace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One HTTP request/response pair as captured in an archive
///
/// Produced by the archive reader and never mutated afterwards. Header
/// pairs keep capture order and original casing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExchange {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub request_headers: Vec<(String, String)>,
    #[serde(default)]
    pub request_body: Option<String>,
    #[serde(default)]
    pub request_mime_type: Option<String>,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub response_headers: Vec<(String, String)>,
    #[serde(default)]
    pub response_body: Option<String>,
    #[serde(default)]
    pub response_mime_type: Option<String>,
    /// Transfer encoding of `response_body` as captured (e.g. `base64`), never decoded
    #[serde(default)]
    pub response_encoding: Option<String>,
    /// Total elapsed time in milliseconds
    #[serde(default)]
    pub elapsed_ms: f64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

impl RawExchange {
    /// Create an exchange with the given method and URL and an empty 200 response
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            status: 200,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: f64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn with_request_header(mut self, name: &str, value: &str) -> Self {
        self.request_headers
            .push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_response_header(mut self, name: &str, value: &str) -> Self {
        self.response_headers
            .push((name.to_string(), value.to_string()));
        self
    }

    /// Set the request body and its MIME type
    pub fn with_request_body(mut self, mime_type: &str, body: impl Into<String>) -> Self {
        self.request_mime_type = Some(mime_type.to_string());
        self.request_body = Some(body.into());
        self
    }

    pub fn with_response_mime_type(mut self, mime_type: &str) -> Self {
        self.response_mime_type = Some(mime_type.to_string());
        self
    }
}

/// GraphQL payload extracted from an exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlCall {
    /// Declared or derived operation name, empty for anonymous operations
    pub operation_name: String,
    pub query: String,
    /// Parsed variables, `null` when absent
    pub variables: serde_json::Value,
}

impl GraphQlCall {
    /// Query text with whitespace runs collapsed
    pub fn normalized_query(&self) -> String {
        collapse_whitespace(&self.query)
    }
}

/// Closed classification of an exchange, decided once during normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExchangeKind {
    /// Scripts, stylesheets, images, fonts and other non-API resources
    StaticAsset,
    /// Any other non-GraphQL exchange
    Api,
    #[serde(rename = "graphql")]
    GraphQl(GraphQlCall),
}

impl ExchangeKind {
    pub fn is_graphql(&self) -> bool {
        matches!(self, ExchangeKind::GraphQl(_))
    }

    pub fn is_static_asset(&self) -> bool {
        matches!(self, ExchangeKind::StaticAsset)
    }

    pub fn graphql(&self) -> Option<&GraphQlCall> {
        match self {
            ExchangeKind::GraphQl(call) => Some(call),
            _ => None,
        }
    }

    /// Short label used in reports and storage
    pub fn label(&self) -> &'static str {
        match self {
            ExchangeKind::StaticAsset => "static",
            ExchangeKind::Api => "api",
            ExchangeKind::GraphQl(_) => "graphql",
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical, comparable form of a [`RawExchange`]
///
/// Built once by the normalizer and read-only afterwards. The raw URL,
/// bodies and display headers are retained for reporting but never
/// compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedExchange {
    /// Position in the source log (capture order)
    pub index: usize,
    /// Uppercased method
    pub method: String,
    /// URL exactly as captured
    pub url: String,
    /// scheme://host[:port]/path?sorted-non-volatile-query
    pub normalized_url: String,
    /// Lowercased host, empty when the URL could not be parsed
    pub domain: String,
    pub path: String,
    pub kind: ExchangeKind,
    pub request_headers: Headers,
    pub response_headers: Headers,
    pub status: u16,
    pub timing_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
}

impl NormalizedExchange {
    pub fn is_graphql(&self) -> bool {
        self.kind.is_graphql()
    }

    /// GraphQL operation name, empty for non-GraphQL exchanges
    pub fn operation_name(&self) -> &str {
        self.kind
            .graphql()
            .map(|call| call.operation_name.as_str())
            .unwrap_or("")
    }

    pub fn match_key(&self) -> MatchKey {
        MatchKey::new(
            self.method.clone(),
            self.normalized_url.clone(),
            self.operation_name(),
        )
    }

    /// `[Operation] METHOD /path` for named GraphQL calls, `METHOD /path` otherwise
    pub fn display_name(&self) -> String {
        match self.operation_name() {
            "" => format!("{} {}", self.method, self.path),
            op => format!("[{}] {} {}", op, self.method, self.path),
        }
    }
}
