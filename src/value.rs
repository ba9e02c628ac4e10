//! Canonical value representation.
//!
//! Lab results stay strings at the JSON boundary to preserve qualifiers like
//! "negative", but internally the normalizer distinguishes the branch it
//! took so callers can reason about what they received.

use std::fmt;

/// Qualitative outcome of a test, as reported by labs in place of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Negative,
    Review,
    Positive,
}

impl Qualifier {
    /// Lowercase form used by the value normalizer ("negative" etc.).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Review => "review",
            Self::Positive => "positive",
        }
    }
}

/// One cleaned lab value.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    /// Dot-decimal numeric text, exactly as it should appear in the output
    /// ("19.3", "0.00"). Kept as text so formatting like "0.00" survives.
    Numeric(String),
    /// A recognized qualitative result.
    Qualitative(Qualifier),
    /// Content the normalizer could not interpret, passed through verbatim.
    Raw(String),
}

impl CanonicalValue {
    pub fn numeric(text: impl Into<String>) -> Self {
        Self::Numeric(text.into())
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(text.into())
    }

    /// Numeric reading of the value, when one exists.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(text) => text.parse().ok(),
            _ => None,
        }
    }

    /// Whether this value is usable as an extraction result: a number or a
    /// recognized keyword, rather than uninterpreted text.
    pub fn is_plausible(&self) -> bool {
        match self {
            Self::Numeric(_) | Self::Qualitative(_) => true,
            Self::Raw(text) => text.chars().any(|c| c.is_ascii_digit()),
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Numeric(text) | Self::Raw(text) => text,
            Self::Qualitative(q) => q.as_str().to_string(),
        }
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(text) | Self::Raw(text) => f.write_str(text),
            Self::Qualitative(q) => f.write_str(q.as_str()),
        }
    }
}

/// Format a derived float the way the output expects: rounded to `decimals`
/// places with trailing zeros trimmed by the float formatter ("3.57", "0.35").
pub fn format_derived(value: f64, decimals: u32) -> String {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    format!("{}", rounded)
}
