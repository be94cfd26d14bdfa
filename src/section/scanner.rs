//! Placeholder discovery for `@NAME@` section references

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@([A-Z0-9_\-]+)@").expect("placeholder pattern is a valid regex")
});

/// Canonical form of a section name
pub fn canonical(name: &str) -> String {
    name.to_ascii_uppercase()
}

/// Collect every placeholder name in `text`, in order of appearance.
///
/// Names are returned as written; duplicates are kept. Matching is
/// left-to-right and non-overlapping, so `@A@B@` yields only `A`.
pub fn scan(text: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Canonical distinct names, in order of first appearance
pub fn distinct(names: &[&str]) -> Vec<String> {
    let mut seen = Vec::new();
    for name in names {
        let name = canonical(name);
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Replace every placeholder whose canonical name has a value.
///
/// Single pass: substituted text is not scanned again. Placeholders with no
/// entry in `values` are left untouched.
pub(crate) fn substitute(text: &str, values: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            let name = canonical(&caps[1]);
            match values.get(&name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_keeps_order_and_duplicates() {
        let names = scan("@HEADER@ body @footer@ and @Header@ again");
        assert_eq!(names, vec!["HEADER", "footer", "Header"]);
    }

    #[test]
    fn test_scan_accepts_digits_underscore_hyphen() {
        let names = scan("<@nav-bar_2@>");
        assert_eq!(names, vec!["nav-bar_2"]);
    }

    #[test]
    fn test_scan_ignores_invalid_tokens() {
        assert!(scan("mail me at someone@example.com").is_empty());
        assert!(scan("@@ and @ spaced @").is_empty());
        assert!(scan("@has.dot@").is_empty());
    }

    #[test]
    fn test_scan_is_non_overlapping() {
        assert_eq!(scan("@A@B@"), vec!["A"]);
    }

    #[test]
    fn test_distinct_canonicalizes() {
        let names = distinct(&["head", "BODY", "Head", "body"]);
        assert_eq!(names, vec!["HEAD", "BODY"]);
    }

    #[test]
    fn test_substitute_is_case_insensitive() {
        let mut values = HashMap::new();
        values.insert("TITLE".to_string(), "Home".to_string());

        let out = substitute("<h1>@title@</h1><p>@TITLE@</p>", &values);
        assert_eq!(out, "<h1>Home</h1><p>Home</p>");
    }

    #[test]
    fn test_substitute_leaves_unknown_names() {
        let values = HashMap::new();
        assert_eq!(substitute("x @OTHER@ y", &values), "x @OTHER@ y");
    }

    #[test]
    fn test_substitute_does_not_rescan_values() {
        let mut values = HashMap::new();
        values.insert("A".to_string(), "@B@".to_string());
        values.insert("B".to_string(), "nope".to_string());

        assert_eq!(substitute("@A@", &values), "@B@");
    }
}
