//! Configuration for HAR comparison
//!
//! This crate owns the comparison policy ([`CompareConfig`]) and its YAML
//! loader. Defaults cover common cache-busting parameters, tracing headers
//! and GraphQL endpoint paths; a file only needs to state what it changes.
//!
//! # Example
//!
//! ```ignore
//! use har_config::{load_config_or_default, CompareConfig};
//!
//! let config = load_config_or_default(Some(Path::new("compare.yaml")))?;
//! let config = config.with_volatile_param("cursor");
//! ```

mod compare_config;
mod error;
mod loader;

pub use compare_config::{
    CompareConfig, DEFAULT_GRAPHQL_ENDPOINTS, DEFAULT_STATIC_CONTENT_TYPES,
    DEFAULT_STATIC_EXTENSIONS, DEFAULT_TIMING_THRESHOLD_MS, DEFAULT_VOLATILE_HEADERS,
    DEFAULT_VOLATILE_QUERY_PARAMS,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_or_default, load_config_string};
