//! Utility functions and types.

use std::fmt::Debug;
use std::fmt::Display;

/// Masks a secret for logs and `Debug` output.
///
/// - Empty input renders as `EMPTY`.
/// - Input shorter than 12 bytes renders as `***`.
/// - Longer input keeps its first and last three characters: `AKI***PLE`.
///
/// Keeping both ends lets two different access keys be told apart in a log
/// line without exposing them.
pub struct Redact<'a>(&'a str);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(value.as_str())
    }
}

impl<'a> From<&'a Option<String>> for Redact<'a> {
    fn from(value: &'a Option<String>) -> Self {
        Redact(value.as_deref().unwrap_or_default())
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.0;
        if s.is_empty() {
            return f.write_str("EMPTY");
        }
        if s.len() < 12 || !s.is_char_boundary(3) || !s.is_char_boundary(s.len() - 3) {
            return f.write_str("***");
        }

        write!(f, "{}***{}", &s[..3], &s[s.len() - 3..])
    }
}

impl Display for Redact<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}
