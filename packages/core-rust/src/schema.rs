//! Form schemas and the authoring mutations on a draft.
//!
//! Field order is display and tab order. Every mutation here preserves the
//! relative order of the fields it does not touch; nothing re-sorts.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::field::{FieldDefinition, FieldKind};
use crate::ids::IdGenerator;
use crate::resolver;

/// A named, ordered list of field definitions.
///
/// While authored the schema is a mutable draft. Once saved it is a historical
/// record: stored, listed, previewed and deleted, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    /// Unique schema id.
    pub id: String,
    /// Display name, set when the form is saved.
    #[serde(default)]
    pub name: String,
    /// When the form was saved. Drafts have none.
    #[serde(
        default,
        deserialize_with = "deserialize_created_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Fields in display order.
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// Outcome of a structural check over a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// The schema is well formed.
    Valid,
    /// The schema has structural problems.
    Invalid {
        /// Human-readable descriptions of each problem, in field order.
        errors: Vec<String>,
    },
}

impl ValidationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The problems found; empty when valid.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        match self {
            Self::Valid => &[],
            Self::Invalid { errors } => errors,
        }
    }
}

impl FormSchema {
    /// An empty, unnamed draft with a fresh id.
    #[must_use]
    pub fn draft(ids: &dyn IdGenerator) -> Self {
        Self {
            id: ids.next_id(),
            name: String::new(),
            created_at: None,
            fields: Vec::new(),
        }
    }

    /// Looks up a field by id.
    #[must_use]
    pub fn field(&self, id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Position of a field by id.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    /// Ids of all fields, in order.
    #[must_use]
    pub fn field_ids(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.id.as_str()).collect()
    }

    /// Appends a new field of `kind` and returns its id.
    pub fn add_field(&mut self, kind: FieldKind, ids: &dyn IdGenerator) -> String {
        let field = FieldDefinition::create(kind, ids);
        let id = field.id.clone();
        self.fields.push(field);
        id
    }

    /// Appends an already built field. Refused when its id is taken or its
    /// derived configuration does not hold against the current fields.
    pub fn push_field(&mut self, field: FieldDefinition) -> bool {
        if self.field(&field.id).is_some() {
            debug!(schema = %self.id, field = %field.id, "duplicate field id refused");
            return false;
        }
        let issues = resolver::check_field(&field, &self.fields);
        if !issues.is_empty() {
            debug!(schema = %self.id, field = %field.id, ?issues, "malformed field refused");
            return false;
        }
        self.fields.push(field);
        true
    }

    /// Replaces the field with the same id, in place. Unknown ids are ignored.
    ///
    /// Refused when the replacement breaks its own derived configuration or
    /// that of a derived field reading from it.
    pub fn update_field(&mut self, field: FieldDefinition) -> bool {
        let Some(index) = self.position(&field.id) else {
            debug!(schema = %self.id, field = %field.id, "update for unknown field ignored");
            return false;
        };
        let mut candidate = self.fields.clone();
        candidate[index] = field;
        let issues = issues_around(&candidate[index].id, &candidate);
        if !issues.is_empty() {
            debug!(schema = %self.id, field = %candidate[index].id, ?issues, "field update refused");
            return false;
        }
        self.fields = candidate;
        true
    }

    /// Applies `edit` to the field `id` with the rest of the schema in view.
    ///
    /// The closure sees a snapshot of all fields (including the one being
    /// edited, as it was before the edit) for eligibility checks. Returns the
    /// closure's result, or `false` when the id is unknown.
    pub fn edit_field<F>(&mut self, id: &str, edit: F) -> bool
    where
        F: FnOnce(&mut FieldDefinition, &[FieldDefinition]) -> bool,
    {
        let Some(index) = self.position(id) else {
            return false;
        };
        let snapshot = self.fields.clone();
        edit(&mut self.fields[index], &snapshot)
    }

    /// Removes a field. Derived fields that named it as a parent keep the
    /// dangling id and fall back when computed.
    pub fn delete_field(&mut self, id: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| f.id != id);
        let removed = self.fields.len() != before;
        if removed {
            let orphans = resolver::dependents(id, &self.fields);
            if !orphans.is_empty() {
                debug!(schema = %self.id, field = id, ?orphans, "deleted a derived parent");
            }
        }
        removed
    }

    /// Moves the field at `from` to position `to`, shifting the fields in
    /// between.
    pub fn move_field(&mut self, from: usize, to: usize) -> bool {
        if from >= self.fields.len() || to >= self.fields.len() {
            return false;
        }
        let field = self.fields.remove(from);
        self.fields.insert(to, field);
        true
    }

    /// Reorders fields to match `order`, which must be a permutation of the
    /// current ids.
    pub fn reorder_fields(&mut self, order: &[String]) -> bool {
        let current: HashSet<&str> = self.fields.iter().map(|f| f.id.as_str()).collect();
        let requested: HashSet<&str> = order.iter().map(String::as_str).collect();
        if order.len() != self.fields.len() || requested.len() != order.len() || current != requested
        {
            debug!(schema = %self.id, "reorder is not a permutation, ignored");
            return false;
        }
        let mut remaining = std::mem::take(&mut self.fields);
        for id in order {
            if let Some(index) = remaining.iter().position(|f| &f.id == id) {
                self.fields.push(remaining.swap_remove(index));
            }
        }
        true
    }

    /// Structural check: dependency problems of derived fields, duplicate
    /// field ids and choice fields without options.
    #[must_use]
    pub fn check(&self) -> ValidationResult {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.id.as_str()) {
                errors.push(format!("duplicate field id {}", field.id));
            }
        }
        for field in &self.fields {
            if field.kind.is_choice() && field.kind != FieldKind::Checkbox && field.options.is_empty()
            {
                errors.push(format!("{} field {} has no options", field.kind.as_str(), field.id));
            }
        }
        errors.extend(resolver::check_all(&self.fields).iter().map(ToString::to_string));

        if errors.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid { errors }
        }
    }
}

/// Dependency issues of `field_id` and of the derived fields that read it.
fn issues_around(field_id: &str, fields: &[FieldDefinition]) -> Vec<resolver::DependencyIssue> {
    fields
        .iter()
        .filter(|f| f.id == field_id || (f.derived && f.parent_fields.iter().any(|p| p == field_id)))
        .flat_map(|f| resolver::check_field(f, fields))
        .collect()
}

/// `createdAt` may be absent, null, or an empty string on drafts.
fn deserialize_created_at<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Formula;
    use crate::ids::SequentialIds;
    use crate::validation::{RuleKind, ValidationRule};
    use proptest::prelude::*;

    fn schema_with(kinds: &[FieldKind]) -> (FormSchema, Vec<String>) {
        let ids = SequentialIds::new("id");
        let mut schema = FormSchema::draft(&ids);
        let field_ids = kinds.iter().map(|k| schema.add_field(*k, &ids)).collect();
        (schema, field_ids)
    }

    #[test]
    fn draft_is_empty() {
        let schema = FormSchema::draft(&SequentialIds::new("form"));
        assert_eq!(schema.id, "form-1");
        assert!(schema.name.is_empty());
        assert!(schema.created_at.is_none());
        assert!(schema.fields.is_empty());
    }

    #[test]
    fn add_update_delete_keep_order() {
        let (mut schema, ids) = schema_with(&[FieldKind::Text, FieldKind::Date, FieldKind::Number]);
        assert_eq!(schema.field_ids(), vec!["id-2", "id-3", "id-4"]);

        let mut edited = schema.fields[1].clone().with_label("Birthday");
        edited.options.push("ignored".to_string());
        assert!(schema.update_field(edited));
        assert_eq!(schema.fields[1].label, "Birthday");
        assert!(!schema.update_field(FieldDefinition::new("nope", FieldKind::Text)));

        assert!(schema.delete_field(&ids[0]));
        assert!(!schema.delete_field(&ids[0]));
        assert_eq!(schema.field_ids(), vec!["id-3", "id-4"]);
    }

    #[test]
    fn push_field_rejects_duplicates() {
        let (mut schema, ids) = schema_with(&[FieldKind::Text]);
        assert!(!schema.push_field(FieldDefinition::new(ids[0].clone(), FieldKind::Date)));
        assert!(schema.push_field(FieldDefinition::new("x", FieldKind::Date)));
        assert_eq!(schema.fields.len(), 2);
    }

    fn derived_sum(id: &str, parents: &[&str]) -> FieldDefinition {
        let mut field = FieldDefinition::new(id, FieldKind::Number);
        field.derived = true;
        field.formula = Some(Formula::Sum);
        field.parent_fields = parents.iter().map(ToString::to_string).collect();
        field
    }

    #[test]
    fn push_field_refuses_broken_derived_fields() {
        let mut schema = FormSchema::draft(&SequentialIds::new("form"));
        assert!(schema.push_field(FieldDefinition::new("a", FieldKind::Number)));
        assert!(schema.push_field(derived_sum("x", &["a"])));

        let mut text = derived_sum("t", &["a"]);
        text.kind = FieldKind::Text;
        assert!(!schema.push_field(text));
        assert!(!schema.push_field(derived_sum("total", &["x"])));
        assert!(!schema.push_field(derived_sum("ghost", &["missing"])));
        assert_eq!(schema.field_ids(), vec!["a", "x"]);
        assert!(schema.check().is_valid());
    }

    #[test]
    fn update_field_refuses_broken_dependencies() {
        let mut schema = FormSchema::draft(&SequentialIds::new("form"));
        assert!(schema.push_field(FieldDefinition::new("a", FieldKind::Number)));
        assert!(schema.push_field(FieldDefinition::new("dob", FieldKind::Date)));
        assert!(schema.push_field(derived_sum("x", &["a"])));
        assert!(schema.push_field(FieldDefinition::new("total", FieldKind::Number)));
        let before = schema.clone();

        // Reading from another derived field.
        assert!(!schema.update_field(derived_sum("total", &["x"])));
        // Parent of the wrong kind, bypassing set_parent.
        assert!(!schema.update_field(derived_sum("x", &["dob"])));
        // Turning a parent into something its dependent cannot read.
        assert!(!schema.update_field(FieldDefinition::new("a", FieldKind::Text)));
        assert!(!schema.update_field(derived_sum("a", &["total"])));
        assert_eq!(schema, before);

        assert!(schema.update_field(derived_sum("x", &["a", "total"])));
        assert!(schema.check().is_valid());
    }

    #[test]
    fn move_and_reorder() {
        let (mut schema, ids) = schema_with(&[FieldKind::Text, FieldKind::Date, FieldKind::Number]);
        assert!(schema.move_field(0, 2));
        assert_eq!(schema.field_ids(), vec!["id-3", "id-4", "id-2"]);
        assert!(!schema.move_field(0, 3));

        assert!(schema.reorder_fields(&ids));
        assert_eq!(schema.field_ids(), vec!["id-2", "id-3", "id-4"]);

        assert!(!schema.reorder_fields(&ids[..2]));
        assert!(!schema.reorder_fields(&[ids[0].clone(), ids[0].clone(), ids[1].clone()]));
        assert_eq!(schema.field_ids(), vec!["id-2", "id-3", "id-4"]);
    }

    #[test]
    fn edit_field_sees_siblings() {
        let (mut schema, ids) = schema_with(&[FieldKind::Number, FieldKind::Date]);
        let date_id = ids[1].clone();
        assert!(schema.edit_field(&ids[0], |f, all| f.set_derived(true, all)));
        assert!(schema.edit_field(&ids[0], |f, all| f.set_parent(&date_id, all)));
        assert!(schema.check().is_valid());
        assert!(!schema.edit_field("missing", |_, _| true));
    }

    #[test]
    fn deleting_a_parent_makes_check_fail() {
        let (mut schema, ids) = schema_with(&[FieldKind::Number, FieldKind::Date]);
        let date_id = ids[1].clone();
        schema.edit_field(&ids[0], |f, all| f.set_derived(true, all) && f.set_parent(&date_id, all));
        assert!(schema.delete_field(&date_id));
        let result = schema.check();
        assert_eq!(
            result.errors(),
            [format!("derived field {} refers to missing parent {date_id}", ids[0])]
        );
    }

    #[test]
    fn check_flags_optionless_choices_and_duplicates() {
        let (mut schema, _) = schema_with(&[FieldKind::Select, FieldKind::Checkbox]);
        schema.fields.push(schema.fields[0].clone());
        let errors = schema.check().errors().to_vec();
        assert_eq!(
            errors,
            vec![
                "duplicate field id id-2".to_string(),
                "select field id-2 has no options".to_string(),
                "select field id-2 has no options".to_string(),
            ]
        );
    }

    #[test]
    fn legacy_schema_decodes() {
        let json = r#"{"id":"s","name":"","createdAt":"","fields":[]}"#;
        let schema: FormSchema = serde_json::from_str(json).expect("decode");
        assert!(schema.created_at.is_none());

        let json = r#"{"id":"s","name":"n","createdAt":"2025-08-10T12:30:00.000Z","fields":[]}"#;
        let schema: FormSchema = serde_json::from_str(json).expect("decode");
        assert_eq!(
            schema.created_at.map(|t| t.to_rfc3339()),
            Some("2025-08-10T12:30:00+00:00".to_string())
        );
    }

    fn kind_strategy() -> impl Strategy<Value = FieldKind> {
        prop::sample::select(FieldKind::ALL.to_vec())
    }

    fn rule_strategy() -> impl Strategy<Value = ValidationRule> {
        prop_oneof![
            Just(ValidationRule::new(RuleKind::NotEmpty)),
            (0i64..50).prop_map(ValidationRule::min_length),
            (0i64..50).prop_map(ValidationRule::max_length),
            Just(ValidationRule::new(RuleKind::Email)),
            Just(ValidationRule::new(RuleKind::Password)),
        ]
    }

    fn field_strategy() -> impl Strategy<Value = FieldDefinition> {
        (
            kind_strategy(),
            "[a-z]{1,8}",
            prop::collection::vec("[a-z ]{0,6}", 0..4),
            prop::collection::vec(rule_strategy(), 0..5),
            any::<bool>(),
        )
            .prop_map(|(kind, label, options, rules, derived)| {
                let mut field = FieldDefinition::new(String::new(), kind).with_label(label);
                field.options = options;
                field.validation_rules = rules;
                if derived {
                    field.derived = true;
                    field.formula = Some(Formula::DurationFromDate);
                    field.parent_fields = vec!["p".to_string()];
                }
                field
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn serde_round_trip_preserves_order(fields in prop::collection::vec(field_strategy(), 0..8)) {
            let fields: Vec<FieldDefinition> = fields
                .into_iter()
                .enumerate()
                .map(|(i, mut f)| { f.id = format!("f{i}"); f })
                .collect();
            let schema = FormSchema {
                id: "s".to_string(),
                name: "Survey".to_string(),
                created_at: None,
                fields,
            };
            let json = serde_json::to_string(&schema).expect("encode");
            let decoded: FormSchema = serde_json::from_str(&json).expect("decode");
            prop_assert_eq!(decoded, schema);
        }

        #[test]
        fn non_number_fields_are_never_derivable(kind in kind_strategy(), others in prop::collection::vec(kind_strategy(), 0..6)) {
            prop_assume!(kind != FieldKind::Number);
            let field = FieldDefinition::new("me", kind);
            let mut all = vec![field.clone()];
            all.extend(others.iter().enumerate().map(|(i, k)| FieldDefinition::new(format!("o{i}"), *k)));
            prop_assert!(!field.can_be_derived(&all));

            let mut toggled = field.clone();
            prop_assert!(!toggled.set_derived(true, &all));
            prop_assert_eq!(toggled, field);
        }
    }
}
