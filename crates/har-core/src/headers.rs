//! Normalized header mapping

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Lowercased header mapping split into a comparable view and a display view
///
/// Both views keep the insertion order of each name's first occurrence.
/// Volatile headers only appear in the display view. Repeated names are
/// combined into a single value joined with `", "`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    compared: IndexMap<String, String>,
    display: IndexMap<String, String>,
}

impl Headers {
    /// Build from captured `(name, value)` pairs
    ///
    /// `is_volatile` receives the lowercased name and decides whether the
    /// header is kept out of the comparable view.
    pub fn from_pairs<'a, I, F>(pairs: I, is_volatile: F) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
        F: Fn(&str) -> bool,
    {
        let mut headers = Self::default();
        for (name, value) in pairs {
            let name = name.trim().to_lowercase();
            if name.is_empty() {
                continue;
            }
            if !is_volatile(&name) {
                append(&mut headers.compared, &name, value);
            }
            append(&mut headers.display, &name, value);
        }
        headers
    }

    /// Headers that take part in comparison
    pub fn comparable(&self) -> &IndexMap<String, String> {
        &self.compared
    }

    /// Every captured header, volatile ones included
    pub fn display(&self) -> &IndexMap<String, String> {
        &self.display
    }

    /// Look up a comparable header by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.compared
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Number of comparable headers
    pub fn len(&self) -> usize {
        self.compared.len()
    }

    /// Whether no comparable header is present
    pub fn is_empty(&self) -> bool {
        self.compared.is_empty()
    }
}

fn append(map: &mut IndexMap<String, String>, name: &str, value: &str) {
    match map.get_mut(name) {
        Some(existing) => {
            existing.push_str(", ");
            existing.push_str(value);
        }
        None => {
            map.insert(name.to_string(), value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &str) -> bool {
        false
    }

    #[test]
    fn test_names_are_lowercased() {
        let headers = Headers::from_pairs([("Content-Type", "application/json")], never);
        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_first_occurrence_order_is_kept() {
        let headers = Headers::from_pairs(
            [("X-B", "1"), ("X-A", "2"), ("x-b", "3")],
            never,
        );
        let names: Vec<_> = headers.comparable().keys().cloned().collect();
        assert_eq!(names, vec!["x-b", "x-a"]);
        assert_eq!(headers.get("x-b"), Some("1, 3"));
    }

    #[test]
    fn test_volatile_only_in_display() {
        let headers = Headers::from_pairs(
            [("Date", "Mon, 01 Jan 2024"), ("Accept", "*/*")],
            |name| name == "date",
        );
        assert_eq!(headers.len(), 1);
        assert!(headers.get("date").is_none());
        assert_eq!(
            headers.display().get("date").map(String::as_str),
            Some("Mon, 01 Jan 2024")
        );
    }

    #[test]
    fn test_blank_names_skipped() {
        let headers = Headers::from_pairs([("  ", "x")], never);
        assert!(headers.is_empty());
        assert!(headers.display().is_empty());
    }
}
