//! Validation rule engine.
//!
//! A field carries an ordered list of [`ValidationRule`]s. [`validate`] walks
//! that list in declaration order and returns the message of the first rule
//! that fails, or an empty string when every rule passes. Rules never
//! accumulate: later rules are not evaluated once one has failed.
//!
//! Length, email and password rules only look at text values. Any other
//! variant passes them untouched, so a `minLength` on a number field only
//! bites while the input is still held as text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::field::{FieldDefinition, FieldKind};
use crate::types::FieldValue;

/// Policy tag stored as the bound of a `password` rule.
pub const PASSWORD_POLICY_TAG: &str = "min8WithNumber";

/// Minimum number of characters a password must have.
pub const PASSWORD_MIN_CHARS: usize = 8;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// The closed set of rule predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    /// Value must be present (non-empty text, checked checkbox, non-empty group).
    NotEmpty,
    /// Text must be at least `bound` characters long.
    MinLength,
    /// Text must be at most `bound` characters long.
    MaxLength,
    /// Text must look like `local@domain.tld`.
    Email,
    /// Text must have at least 8 characters and one digit.
    Password,
}

impl RuleKind {
    /// Wire name of the rule kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotEmpty => "notEmpty",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::Email => "email",
            Self::Password => "password",
        }
    }

    /// Message a freshly authored rule of this kind starts with.
    #[must_use]
    pub fn default_message(self) -> &'static str {
        match self {
            Self::NotEmpty => "This field is required",
            Self::MinLength => "Minimum length not met",
            Self::MaxLength => "Maximum length exceeded",
            Self::Email => "Invalid email format",
            Self::Password => "Password must be at least 8 characters and contain a number",
        }
    }

    /// Bound a freshly authored rule of this kind starts with.
    #[must_use]
    pub fn default_bound(self) -> Option<RuleBound> {
        match self {
            Self::MinLength | Self::MaxLength => Some(RuleBound::Length(0)),
            Self::Password => Some(RuleBound::Tag(PASSWORD_POLICY_TAG.to_string())),
            Self::NotEmpty | Self::Email => None,
        }
    }

    /// Whether this rule takes a numeric length bound.
    #[must_use]
    pub fn is_length_rule(self) -> bool {
        matches!(self, Self::MinLength | Self::MaxLength)
    }
}

/// Parameter of a rule: a length for `minLength`/`maxLength`, a policy tag for
/// `password`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleBound {
    /// Character count.
    Length(i64),
    /// Symbolic policy name.
    Tag(String),
}

impl RuleBound {
    /// The numeric bound, if this is a length.
    #[must_use]
    pub fn length(&self) -> Option<i64> {
        match self {
            Self::Length(n) => Some(*n),
            Self::Tag(_) => None,
        }
    }
}

/// One named predicate plus the message shown when it fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Which predicate to apply.
    #[serde(alias = "type")]
    pub kind: RuleKind,
    /// Optional parameter; absent bounds make length rules pass.
    #[serde(default, alias = "value", skip_serializing_if = "Option::is_none")]
    pub bound: Option<RuleBound>,
    /// User-facing failure text.
    #[serde(default)]
    pub message: String,
}

impl ValidationRule {
    /// A rule of `kind` with its default bound and default message.
    #[must_use]
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            bound: kind.default_bound(),
            message: kind.default_message().to_string(),
        }
    }

    /// Builder-style message override.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Builder-style bound override.
    #[must_use]
    pub fn with_bound(mut self, bound: RuleBound) -> Self {
        self.bound = Some(bound);
        self
    }

    /// Shorthand for a `minLength` rule with the given bound.
    #[must_use]
    pub fn min_length(bound: i64) -> Self {
        Self::new(RuleKind::MinLength).with_bound(RuleBound::Length(bound))
    }

    /// Shorthand for a `maxLength` rule with the given bound.
    #[must_use]
    pub fn max_length(bound: i64) -> Self {
        Self::new(RuleKind::MaxLength).with_bound(RuleBound::Length(bound))
    }

    /// Whether `value` violates this rule on a field of kind `kind`.
    fn fails(&self, kind: FieldKind, value: &FieldValue) -> bool {
        match self.kind {
            RuleKind::NotEmpty => is_empty_for(kind, value),
            RuleKind::MinLength => match (value, self.length_bound()) {
                (FieldValue::Text(s), Some(bound)) => char_len(s) < bound,
                _ => false,
            },
            RuleKind::MaxLength => match (value, self.length_bound()) {
                (FieldValue::Text(s), Some(bound)) => char_len(s) > bound,
                _ => false,
            },
            RuleKind::Email => match value {
                FieldValue::Text(s) => !EMAIL_PATTERN.is_match(s),
                _ => false,
            },
            RuleKind::Password => match value {
                FieldValue::Text(s) => !is_strong_password(s),
                _ => false,
            },
        }
    }

    fn length_bound(&self) -> Option<i64> {
        self.bound.as_ref().and_then(RuleBound::length)
    }
}

/// Validates `value` against `field`'s rules.
///
/// Returns the message of the first failing rule, or an empty string when the
/// value is acceptable. Derived fields always validate.
#[must_use]
pub fn validate(field: &FieldDefinition, value: &FieldValue) -> String {
    if field.derived {
        return String::new();
    }
    field
        .validation_rules
        .iter()
        .find(|rule| rule.fails(field.kind, value))
        .map(|rule| rule.message.clone())
        .unwrap_or_default()
}

fn is_empty_for(kind: FieldKind, value: &FieldValue) -> bool {
    if value.is_blank() {
        return true;
    }
    if kind != FieldKind::Checkbox {
        return false;
    }
    match value {
        FieldValue::MultiChoice(selected) => selected.is_empty(),
        FieldValue::Bool(checked) => !checked,
        _ => false,
    }
}

fn char_len(s: &str) -> i64 {
    i64::try_from(s.chars().count()).unwrap_or(i64::MAX)
}

fn is_strong_password(s: &str) -> bool {
    // Line terminators do not count towards the length and reject the value.
    let single_line = !s.chars().any(|c| matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}'));
    single_line
        && s.chars().count() >= PASSWORD_MIN_CHARS
        && s.chars().any(|c| c.is_ascii_digit())
}
