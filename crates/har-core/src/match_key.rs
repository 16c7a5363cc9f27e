//! Equivalence key used to pair exchanges

use serde::{Deserialize, Serialize};
use std::fmt;

/// `(method, normalized_url, operation_name)`
///
/// Two exchanges are candidate matches iff their keys are equal. The
/// operation name is empty for non-GraphQL exchanges and for anonymous
/// GraphQL operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchKey {
    pub method: String,
    pub normalized_url: String,
    pub operation_name: String,
}

impl MatchKey {
    pub fn new(
        method: impl Into<String>,
        normalized_url: impl Into<String>,
        operation_name: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            normalized_url: normalized_url.into(),
            operation_name: operation_name.into(),
        }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operation_name.is_empty() {
            write!(f, "{} {}", self.method, self.normalized_url)
        } else {
            write!(
                f,
                "{} {} [{}]",
                self.method, self.normalized_url, self.operation_name
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let key = MatchKey::new("GET", "https://api.test/users", "");
        assert_eq!(key.to_string(), "GET https://api.test/users");

        let key = MatchKey::new("POST", "https://api.test/graphql", "GetUser");
        assert_eq!(key.to_string(), "POST https://api.test/graphql [GetUser]");
    }

    #[test]
    fn test_operation_name_is_identity_bearing() {
        let a = MatchKey::new("POST", "https://api.test/graphql", "GetUser");
        let b = MatchKey::new("POST", "https://api.test/graphql", "ListUsers");
        assert_ne!(a, b);
    }
}
