//! YAML configuration loader
//!
//! A configuration file may replace any default list outright or extend it:
//!
//! ```yaml
//! timing_threshold_ms: 150
//! extra_volatile_query_params: [cursor, _rid]
//! volatile_headers: [date, x-request-id]   # replaces the default list
//! graphql_endpoints: ["^/api/query$"]
//! ```

use crate::compare_config::CompareConfig;
use crate::error::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// On-disk shape: every field optional so a file only states what it changes
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    volatile_query_params: Option<Vec<String>>,
    volatile_headers: Option<Vec<String>>,
    graphql_endpoints: Option<Vec<String>>,
    static_extensions: Option<Vec<String>>,
    static_content_types: Option<Vec<String>>,
    timing_threshold_ms: Option<f64>,
    extra_volatile_query_params: Vec<String>,
    extra_volatile_headers: Vec<String>,
    extra_graphql_endpoints: Vec<String>,
    extra_static_extensions: Vec<String>,
}

impl ConfigFile {
    fn apply(self, mut config: CompareConfig) -> CompareConfig {
        if let Some(params) = self.volatile_query_params {
            config.volatile_query_params = lowercased(params).collect();
        }
        if let Some(headers) = self.volatile_headers {
            config.volatile_headers = lowercased(headers).collect();
        }
        if let Some(endpoints) = self.graphql_endpoints {
            config.graphql_endpoints = endpoints;
        }
        if let Some(extensions) = self.static_extensions {
            config.static_extensions = lowercased(extensions)
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect();
        }
        if let Some(content_types) = self.static_content_types {
            config.static_content_types = lowercased(content_types).collect();
        }
        if let Some(threshold) = self.timing_threshold_ms {
            config.timing_threshold_ms = threshold;
        }

        config
            .volatile_query_params
            .extend(lowercased(self.extra_volatile_query_params));
        config
            .volatile_headers
            .extend(lowercased(self.extra_volatile_headers));
        config
            .graphql_endpoints
            .extend(self.extra_graphql_endpoints);
        config.static_extensions.extend(
            lowercased(self.extra_static_extensions)
                .map(|ext| ext.trim_start_matches('.').to_string()),
        );

        config
    }
}

fn lowercased(items: Vec<String>) -> impl Iterator<Item = String> {
    items.into_iter().map(|s| s.trim().to_lowercase())
}

/// Load and validate a configuration file, layering it over the defaults
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<CompareConfig> {
    let path = path.as_ref();
    debug!("Loading comparison config: {:?}", path);

    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_string(&content, path)
}

/// Parse and validate configuration YAML, layering it over the defaults
///
/// `source_path` is only used in error messages.
pub fn load_config_string(content: &str, source_path: &Path) -> ConfigResult<CompareConfig> {
    // An empty document deserializes to unit, not a mapping
    if content.trim().is_empty() {
        return Ok(CompareConfig::default());
    }

    let file: ConfigFile =
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
            path: source_path.to_path_buf(),
            source: e,
        })?;

    let config = file.apply(CompareConfig::default());
    config.validate()?;

    debug!(
        volatile_params = config.volatile_query_params.len(),
        volatile_headers = config.volatile_headers.len(),
        graphql_endpoints = config.graphql_endpoints.len(),
        threshold_ms = config.timing_threshold_ms,
        "Comparison config loaded"
    );

    Ok(config)
}

/// Load from `path` when given, otherwise return validated defaults
pub fn load_config_or_default(path: Option<&Path>) -> ConfigResult<CompareConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(CompareConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(yaml: &str) -> ConfigResult<CompareConfig> {
        load_config_string(yaml, Path::new("test.yaml"))
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(parse("").unwrap(), CompareConfig::default());
        assert_eq!(parse("  \n").unwrap(), CompareConfig::default());
    }

    #[test]
    fn test_extra_fields_extend_defaults() {
        let config = parse("extra_volatile_query_params: [Cursor]\n").unwrap();
        assert!(config.is_volatile_param("cursor"));
        assert!(config.is_volatile_param("token"));
    }

    #[test]
    fn test_list_fields_replace_defaults() {
        let config = parse("volatile_headers: [X-Request-Id]\n").unwrap();
        assert_eq!(config.volatile_headers.len(), 1);
        assert!(config.is_volatile_header("x-request-id"));
        assert!(!config.is_volatile_header("date"));
    }

    #[test]
    fn test_extensions_strip_leading_dot() {
        let config = parse("static_extensions: ['.wasm']\n").unwrap();
        assert!(config.is_static_path("/pkg/app.wasm"));
        assert!(!config.is_static_path("/app.js"));
    }

    #[test]
    fn test_threshold_override() {
        let config = parse("timing_threshold_ms: 250\n").unwrap();
        assert_eq!(config.timing_threshold_ms, 250.0);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            parse("volatile_paramz: [x]\n"),
            Err(ConfigError::ParseYaml { .. })
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            parse("timing_threshold_ms: -5\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse("extra_graphql_endpoints: ['[']\n"),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "extra_volatile_headers: [x-build-sha]").unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(config.is_volatile_header("x-build-sha"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
        assert!(err.to_string().contains("/definitely/not/here.yaml"));
    }

    #[test]
    fn test_or_default() {
        assert_eq!(
            load_config_or_default(None).unwrap(),
            CompareConfig::default()
        );
    }
}
