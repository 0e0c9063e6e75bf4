//! Wildcard patterns used by field-match predicates.

use super::compare::value_text;
use regex_lite::Regex;
use serde_json::Value;

/// A full-string, case-insensitive glob where `*` matches any run of
/// characters and every other character is literal.
#[derive(Clone, Debug)]
pub struct WildcardPattern {
    source: String,
    regex: Regex,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Result<Self, regex_lite::Error> {
        let body = pattern
            .to_lowercase()
            .split('*')
            .map(regex_lite::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("(?s)^{}$", body))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written by the caller.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match a text, ignoring case and line breaks in it.
    pub fn matches_text(&self, text: &str) -> bool {
        let text: String = text
            .chars()
            .filter(|c| *c != '\r' && *c != '\n')
            .collect::<String>()
            .to_lowercase();
        self.regex.is_match(&text)
    }

    /// Match a field value through its text form.
    pub fn matches(&self, value: &Value) -> bool {
        self.matches_text(&value_text(Some(value)))
    }
}
