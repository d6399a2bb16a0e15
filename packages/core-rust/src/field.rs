//! Field definitions and the authoring operations that keep them well formed.
//!
//! Every mutation here is a refusal-or-apply operation: when a request would
//! break a structural invariant the field is left untouched and the method
//! returns `false`. Nothing in this module returns an error.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::formula::{self, Formula};
use crate::ids::IdGenerator;
use crate::resolver;
use crate::types::FieldValue;
use crate::validation::{RuleBound, RuleKind, ValidationRule};

/// Label given to newly created fields.
pub const DEFAULT_LABEL: &str = "New Field";

/// Input control kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
}

impl FieldKind {
    /// Every kind, in the order an authoring palette lists them.
    pub const ALL: [FieldKind; 7] = [
        FieldKind::Text,
        FieldKind::Number,
        FieldKind::Textarea,
        FieldKind::Select,
        FieldKind::Radio,
        FieldKind::Checkbox,
        FieldKind::Date,
    ];

    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::Date => "date",
        }
    }

    /// Whether the kind presents a list of options.
    #[must_use]
    pub fn is_choice(self) -> bool {
        matches!(self, Self::Select | Self::Radio | Self::Checkbox)
    }

    /// Rule kinds that may be attached to a field of this kind.
    #[must_use]
    pub fn allowed_rules(self) -> &'static [RuleKind] {
        match self {
            Self::Text | Self::Textarea => &[
                RuleKind::NotEmpty,
                RuleKind::MinLength,
                RuleKind::MaxLength,
                RuleKind::Email,
                RuleKind::Password,
            ],
            Self::Number => &[RuleKind::NotEmpty, RuleKind::MinLength, RuleKind::MaxLength],
            Self::Select | Self::Radio | Self::Checkbox | Self::Date => &[RuleKind::NotEmpty],
        }
    }

    /// Whether `rule` may be attached to a field of this kind.
    #[must_use]
    pub fn allows_rule(self, rule: RuleKind) -> bool {
        self.allowed_rules().contains(&rule)
    }
}

/// Schema of a single form field.
///
/// Field names serialize in camelCase (`defaultValue`, `validationRules`,
/// `parentFields`). Records written with `type` instead of `kind` are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Opaque unique id, never changed after creation.
    pub id: String,
    /// Input control kind.
    #[serde(alias = "type")]
    pub kind: FieldKind,
    /// Display text.
    #[serde(default)]
    pub label: String,
    /// Ordered options of choice kinds; duplicates are allowed.
    #[serde(default)]
    pub options: Vec<String>,
    /// Initial value of the field in a fresh session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
    /// Ordered rules; ignored while the field is derived.
    #[serde(default)]
    pub validation_rules: Vec<ValidationRule>,
    /// Whether the value is computed rather than entered.
    #[serde(default)]
    pub derived: bool,
    /// Ids of the fields the formula reads from.
    #[serde(default)]
    pub parent_fields: Vec<String>,
    /// Computation applied when derived.
    #[serde(
        default,
        deserialize_with = "formula::deserialize_formula",
        skip_serializing_if = "Option::is_none"
    )]
    pub formula: Option<Formula>,
}

impl FieldDefinition {
    /// A non-derived field of `kind` with id `id` and type-appropriate
    /// defaults: no options, no rules, no default value.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            kind,
            label: DEFAULT_LABEL.to_string(),
            options: Vec::new(),
            default_value: None,
            validation_rules: Vec::new(),
            derived: false,
            parent_fields: Vec::new(),
            formula: None,
        }
    }

    /// Creates a field of `kind` with a freshly generated id.
    #[must_use]
    pub fn create(kind: FieldKind, ids: &dyn IdGenerator) -> Self {
        Self::new(ids.next_id(), kind)
    }

    /// Builder-style label override.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Whether this field renders as a group of checkboxes (one per option)
    /// rather than a single boolean checkbox.
    #[must_use]
    pub fn is_checkbox_group(&self) -> bool {
        self.kind == FieldKind::Checkbox && !self.options.is_empty()
    }

    /// The value an input of this field holds before anything is entered.
    #[must_use]
    pub fn empty_value(&self) -> FieldValue {
        if self.derived {
            return self.formula.unwrap_or_default().fallback();
        }
        match self.kind {
            FieldKind::Checkbox if self.is_checkbox_group() => {
                FieldValue::MultiChoice(std::collections::BTreeSet::new())
            }
            FieldKind::Checkbox => FieldValue::Bool(false),
            _ => FieldValue::Text(String::new()),
        }
    }

    /// Whether the derived toggle may be switched on, judged against the
    /// current field list.
    #[must_use]
    pub fn can_be_derived(&self, all_fields: &[FieldDefinition]) -> bool {
        self.kind == FieldKind::Number
            && resolver::eligible_parents(self, Formula::DurationFromDate, all_fields)
                .next()
                .is_some()
    }

    /// Switches the derived flag.
    ///
    /// Turning it on selects the duration formula, drops the default value and
    /// keeps only already-declared parents that are still eligible; the caller
    /// then picks a parent with [`set_parent`](Self::set_parent). It is refused
    /// when [`can_be_derived`](Self::can_be_derived) is false and has no effect
    /// on a field that is already derived. Turning it off clears parents and
    /// formula and leaves the default value editable.
    pub fn set_derived(&mut self, enabled: bool, all_fields: &[FieldDefinition]) -> bool {
        if !enabled {
            if !self.derived {
                return true;
            }
            self.derived = false;
            self.parent_fields.clear();
            self.formula = None;
            self.default_value = None;
            return true;
        }
        if self.derived {
            return true;
        }
        if !self.can_be_derived(all_fields) {
            debug!(field = %self.id, kind = self.kind.as_str(), "derived toggle refused");
            return false;
        }
        let formula = Formula::DurationFromDate;
        self.derived = true;
        self.formula = Some(formula);
        self.default_value = None;
        self.retain_eligible_parents(formula, all_fields);
        true
    }

    /// Declares `parent_id` as the single parent of this derived field.
    ///
    /// Refused unless the field is derived and `parent_id` is among the
    /// eligible parents for its formula.
    pub fn set_parent(&mut self, parent_id: &str, all_fields: &[FieldDefinition]) -> bool {
        if !self.derived {
            return false;
        }
        let formula = self.formula.unwrap_or_default();
        let eligible = resolver::eligible_parents(self, formula, all_fields)
            .any(|candidate| candidate.id == parent_id);
        if !eligible {
            debug!(field = %self.id, parent = parent_id, "parent not eligible");
            return false;
        }
        self.parent_fields = vec![parent_id.to_string()];
        true
    }

    /// Declares an ordered parent list for an arithmetic formula.
    ///
    /// Refused unless every id is eligible and the count suits the formula.
    pub fn set_parents(&mut self, parent_ids: &[String], all_fields: &[FieldDefinition]) -> bool {
        if !self.derived {
            return false;
        }
        let formula = self.formula.unwrap_or_default();
        let this: &FieldDefinition = self;
        let all_eligible = parent_ids.iter().all(|id| {
            resolver::eligible_parents(this, formula, all_fields).any(|c| &c.id == id)
        });
        if !all_eligible || !formula.accepts_parent_count(parent_ids.len()) {
            debug!(field = %self.id, formula = %formula, "parent list refused");
            return false;
        }
        self.parent_fields = parent_ids.to_vec();
        true
    }

    /// Switches a derived field to another formula. Declared parents that do
    /// not qualify for the new formula are dropped.
    pub fn set_formula(&mut self, formula: Formula, all_fields: &[FieldDefinition]) -> bool {
        if !self.derived || self.kind != FieldKind::Number {
            return false;
        }
        self.formula = Some(formula);
        self.retain_eligible_parents(formula, all_fields);
        true
    }

    fn retain_eligible_parents(&mut self, formula: Formula, all_fields: &[FieldDefinition]) {
        let eligible: Vec<String> = resolver::eligible_parents(self, formula, all_fields)
            .map(|f| f.id.clone())
            .collect();
        self.parent_fields.retain(|id| eligible.contains(id));
        if !formula.accepts_parent_count(self.parent_fields.len()) {
            self.parent_fields.clear();
        }
    }

    /// Appends an option. Blank input is refused; surrounding whitespace is
    /// trimmed.
    pub fn add_option(&mut self, option: &str) -> bool {
        let option = option.trim();
        if option.is_empty() {
            return false;
        }
        self.options.push(option.to_string());
        true
    }

    /// Removes the option at `index`. A default value pointing at the removed
    /// option is left as is.
    pub fn remove_option(&mut self, index: usize) -> bool {
        if index >= self.options.len() {
            return false;
        }
        self.options.remove(index);
        true
    }

    /// Replaces the option at `index`.
    pub fn update_option(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.options.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Appends a rule of `kind` with its default bound and message.
    ///
    /// Refused for derived fields and for rule kinds outside the field kind's
    /// applicability table.
    pub fn add_rule(&mut self, kind: RuleKind) -> bool {
        self.push_rule(ValidationRule::new(kind))
    }

    /// Appends a fully specified rule, subject to the same checks as
    /// [`add_rule`](Self::add_rule).
    pub fn push_rule(&mut self, rule: ValidationRule) -> bool {
        if self.derived || !self.kind.allows_rule(rule.kind) {
            debug!(field = %self.id, rule = rule.kind.as_str(), "rule refused");
            return false;
        }
        self.validation_rules.push(rule);
        true
    }

    /// Removes the rule at `index`.
    pub fn remove_rule(&mut self, index: usize) -> bool {
        if index >= self.validation_rules.len() {
            return false;
        }
        self.validation_rules.remove(index);
        true
    }

    /// Replaces the failure message of the rule at `index`.
    pub fn update_rule_message(&mut self, index: usize, message: impl Into<String>) -> bool {
        match self.validation_rules.get_mut(index) {
            Some(rule) => {
                rule.message = message.into();
                true
            }
            None => false,
        }
    }

    /// Replaces the length bound of a `minLength`/`maxLength` rule.
    pub fn update_rule_bound(&mut self, index: usize, bound: i64) -> bool {
        match self.validation_rules.get_mut(index) {
            Some(rule) if rule.kind.is_length_rule() => {
                rule.bound = Some(RuleBound::Length(bound));
                true
            }
            _ => false,
        }
    }
}
