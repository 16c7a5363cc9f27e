//! Conversion of HAR entries into [`RawExchange`]s

use crate::error::{ArchiveError, ArchiveResult};
use crate::model::{HarEntry, HarFile, HarHeader};
use chrono::{DateTime, Utc};
use har_core::{RawExchange, STATUS_NO_RESPONSE};
use std::path::Path;
use tracing::{debug, info, trace};

const STRING_ORIGIN: &str = "<string>";

/// Parse HAR JSON text into exchanges, in capture order
pub fn parse_archive(text: &str) -> ArchiveResult<Vec<RawExchange>> {
    parse_with_origin(text, STRING_ORIGIN)
}

/// Read and parse a HAR file
pub fn load_archive(path: impl AsRef<Path>) -> ArchiveResult<Vec<RawExchange>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ArchiveError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let exchanges = parse_with_origin(&text, &path.display().to_string())?;
    info!(path = %path.display(), exchanges = exchanges.len(), "Loaded archive");
    Ok(exchanges)
}

fn parse_with_origin(text: &str, origin: &str) -> ArchiveResult<Vec<RawExchange>> {
    let file: HarFile =
        serde_json::from_str(text).map_err(|source| ArchiveError::ParseJson {
            origin: origin.to_string(),
            source,
        })?;

    let log = file.log.ok_or_else(|| ArchiveError::MissingLog {
        origin: origin.to_string(),
    })?;

    let exchanges: Vec<RawExchange> = log.entries.into_iter().map(convert_entry).collect();

    let encoded = exchanges
        .iter()
        .filter(|e| e.response_encoding.is_some())
        .count();
    debug!(
        origin,
        entries = exchanges.len(),
        encoded_bodies = encoded,
        "Parsed archive"
    );

    Ok(exchanges)
}

fn convert_entry(entry: HarEntry) -> RawExchange {
    let request = entry.request;
    let response = entry.response;

    let method = request
        .method
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "GET".to_string());

    let status = response
        .status
        .and_then(|s| u16::try_from(s).ok())
        .filter(|s| *s <= 999)
        .unwrap_or(STATUS_NO_RESPONSE);

    let (request_mime_type, request_body) = match request.post_data {
        Some(post) => (post.mime_type, post.text),
        None => (None, None),
    };

    let (response_mime_type, response_body, response_encoding) = match response.content {
        Some(content) => (
            content.mime_type,
            content.text,
            content.encoding.filter(|e| !e.is_empty()),
        ),
        None => (None, None, None),
    };

    RawExchange {
        method,
        url: request.url.unwrap_or_default(),
        request_headers: header_pairs(request.headers),
        request_body,
        request_mime_type,
        status,
        response_headers: header_pairs(response.headers),
        response_body,
        response_mime_type,
        response_encoding,
        elapsed_ms: entry.time.unwrap_or(0.0),
        started_at: entry.started_date_time.as_deref().and_then(parse_started_at),
    }
}

/// Nameless headers are dropped
fn header_pairs(headers: Vec<HarHeader>) -> Vec<(String, String)> {
    headers
        .into_iter()
        .filter(|h| !h.name.trim().is_empty())
        .map(|h| (h.name, h.value.unwrap_or_default()))
        .collect()
}

fn parse_started_at(text: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(text) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            trace!(value = text, error = %e, "Ignoring unparsable startedDateTime");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn archive(entries: serde_json::Value) -> String {
        json!({ "log": { "version": "1.2", "entries": entries } }).to_string()
    }

    #[test]
    fn test_full_entry() {
        let text = archive(json!([{
            "startedDateTime": "2024-05-01T10:00:00.123+02:00",
            "time": 85.5,
            "request": {
                "method": "POST",
                "url": "https://api.test/graphql",
                "headers": [{ "name": "Content-Type", "value": "application/json" }],
                "postData": { "mimeType": "application/json", "text": "{\"query\":\"{ a }\"}" }
            },
            "response": {
                "status": 201,
                "headers": [{ "name": "X-Trace", "value": "abc" }],
                "content": { "mimeType": "application/json", "text": "{}" }
            }
        }]));

        let exchanges = parse_archive(&text).unwrap();
        assert_eq!(exchanges.len(), 1);

        let ex = &exchanges[0];
        assert_eq!(ex.method, "POST");
        assert_eq!(ex.url, "https://api.test/graphql");
        assert_eq!(ex.status, 201);
        assert_eq!(ex.elapsed_ms, 85.5);
        assert_eq!(
            ex.request_headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
        assert_eq!(ex.request_mime_type.as_deref(), Some("application/json"));
        assert_eq!(ex.request_body.as_deref(), Some("{\"query\":\"{ a }\"}"));
        assert_eq!(ex.response_body.as_deref(), Some("{}"));
        assert_eq!(
            ex.started_at.unwrap().to_rfc3339(),
            "2024-05-01T08:00:00.123+00:00"
        );
    }

    #[test]
    fn test_sparse_entry_defaults() {
        let text = archive(json!([{ "request": { "url": "https://a.test/" } }]));
        let ex = &parse_archive(&text).unwrap()[0];

        assert_eq!(ex.method, "GET");
        assert_eq!(ex.status, STATUS_NO_RESPONSE);
        assert_eq!(ex.elapsed_ms, 0.0);
        assert!(ex.request_headers.is_empty());
        assert!(ex.request_body.is_none());
        assert!(ex.started_at.is_none());
    }

    #[test]
    fn test_nulls_and_out_of_range_values() {
        let text = archive(json!([{
            "startedDateTime": "yesterday",
            "time": -1,
            "request": { "method": "", "url": null, "headers": null },
            "response": { "status": 70000, "headers": [{ "name": "X-Empty", "value": null }] }
        }]));
        let ex = &parse_archive(&text).unwrap()[0];

        assert_eq!(ex.method, "GET");
        assert_eq!(ex.url, "");
        assert_eq!(ex.status, 0);
        assert_eq!(ex.elapsed_ms, -1.0);
        assert!(ex.started_at.is_none());
        assert_eq!(
            ex.response_headers,
            vec![("X-Empty".to_string(), String::new())]
        );
    }

    #[test]
    fn test_null_header_name_is_skipped() {
        let text = archive(json!([{
            "request": {
                "url": "https://a.test/",
                "headers": [{ "name": null, "value": "x" }, { "name": "Accept", "value": "*/*" }]
            },
            "response": { "status": 200, "headers": [{ "value": "orphan" }] }
        }]));
        let ex = &parse_archive(&text).unwrap()[0];

        assert_eq!(
            ex.request_headers,
            vec![("Accept".to_string(), "*/*".to_string())]
        );
        assert!(ex.response_headers.is_empty());
    }

    #[test]
    fn test_base64_body_kept_verbatim() {
        let text = archive(json!([{
            "request": { "method": "GET", "url": "https://cdn.test/a.png" },
            "response": {
                "status": 200,
                "content": { "mimeType": "image/png", "text": "iVBORw0KGgo=", "encoding": "base64" }
            }
        }]));
        let ex = &parse_archive(&text).unwrap()[0];

        assert_eq!(ex.response_body.as_deref(), Some("iVBORw0KGgo="));
        assert_eq!(ex.response_encoding.as_deref(), Some("base64"));
        assert_eq!(ex.response_mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_entries_keep_order() {
        let text = archive(json!([
            { "request": { "url": "https://a.test/1" } },
            { "request": { "url": "https://a.test/2" } },
            { "request": { "url": "https://a.test/3" } }
        ]));
        let urls: Vec<_> = parse_archive(&text)
            .unwrap()
            .into_iter()
            .map(|e| e.url)
            .collect();
        assert_eq!(urls, vec!["https://a.test/1", "https://a.test/2", "https://a.test/3"]);
    }

    #[test]
    fn test_empty_or_missing_entries() {
        assert!(parse_archive(r#"{"log": {}}"#).unwrap().is_empty());
        assert!(parse_archive(r#"{"log": {"entries": null}}"#).unwrap().is_empty());
    }

    #[test]
    fn test_missing_log() {
        let err = parse_archive(r#"{"entries": []}"#).unwrap_err();
        assert!(matches!(err, ArchiveError::MissingLog { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_archive("{ not json").unwrap_err();
        assert!(matches!(err, ArchiveError::ParseJson { .. }));
        assert!(err.to_string().contains("<string>"));
    }
}
