use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Current value of one form field.
///
/// Variants line up with the field kinds: text-like and choice kinds carry
/// `Text`, numbers carry `Number`, a single checkbox carries `Bool`, and a
/// checkbox group carries `MultiChoice`. `Null` stands for "no value at all",
/// which is what a JSON `null` or a missing key decodes to.
///
/// Serializes untagged so that a stored `defaultValue` reads as plain JSON
/// (`"abc"`, `42`, `true`, `["a", "b"]`, `null`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    /// No value.
    #[default]
    Null,
    /// Single checkbox state.
    Bool(bool),
    /// Numeric value (64-bit IEEE 754).
    Number(f64),
    /// Free text, a date in `YYYY-MM-DD` form, or the chosen option of a
    /// select/radio field.
    Text(String),
    /// Selected options of a checkbox group.
    MultiChoice(BTreeSet<String>),
}

impl FieldValue {
    /// Shorthand for a `Text` value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Builds a `MultiChoice` from any iterator of option strings.
    #[must_use]
    pub fn choices<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MultiChoice(options.into_iter().map(Into::into).collect())
    }

    /// Returns the string payload when this is a `Text` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric reading of the value, used by arithmetic formulas.
    ///
    /// Numbers pass through, text is parsed after trimming (blank text is not a
    /// number), everything else has no numeric reading.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
                }
            }
            _ => None,
        }
    }

    /// Whether the value is `Null` or the empty string.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Null) || matches!(self, Self::Text(s) if s.is_empty())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Field id -> current value. `BTreeMap` keeps snapshots deterministic.
pub type FormValueMap = BTreeMap<String, FieldValue>;

/// Field id -> current error message; an empty string means valid.
pub type FormErrorMap = BTreeMap<String, String>;
