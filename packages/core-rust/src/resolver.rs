//! Parent resolution and dependency checks for derived fields.
//!
//! Derived fields may only read from non-derived fields, so the dependency
//! graph has depth one: it cannot contain cycles and derived fields can be
//! recomputed in any order. Eligibility is always evaluated against the field
//! list passed in; nothing here is cached.

use crate::field::{FieldDefinition, FieldKind};
use crate::formula::Formula;

/// Fields that may serve as parents of `field` under `formula`: same kind as
/// the formula requires, not derived, not `field` itself.
pub fn eligible_parents<'a>(
    field: &'a FieldDefinition,
    formula: Formula,
    all_fields: &'a [FieldDefinition],
) -> impl Iterator<Item = &'a FieldDefinition> + 'a {
    let wanted = formula.parent_kind();
    all_fields
        .iter()
        .filter(move |candidate| {
            candidate.id != field.id && !candidate.derived && candidate.kind == wanted
        })
}

/// Looks up each declared parent of `field`, in declaration order. Ids that
/// no longer exist resolve to `None`.
#[must_use]
pub fn resolve_parents<'a>(
    field: &FieldDefinition,
    all_fields: &'a [FieldDefinition],
) -> Vec<Option<&'a FieldDefinition>> {
    field
        .parent_fields
        .iter()
        .map(|id| all_fields.iter().find(|f| &f.id == id))
        .collect()
}

/// Ids of the derived fields that declare `parent_id` as a parent.
#[must_use]
pub fn dependents<'a>(parent_id: &str, all_fields: &'a [FieldDefinition]) -> Vec<&'a str> {
    all_fields
        .iter()
        .filter(|f| f.derived && f.parent_fields.iter().any(|p| p == parent_id))
        .map(|f| f.id.as_str())
        .collect()
}

/// A structural problem with a derived field's configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyIssue {
    #[error("derived field {field} must be a number field, found {kind}")]
    NotNumber { field: String, kind: &'static str },
    #[error("derived field {field} has {found} parents, {formula} needs {expected}")]
    ParentCount {
        field: String,
        formula: Formula,
        found: usize,
        expected: &'static str,
    },
    #[error("derived field {field} refers to missing parent {parent}")]
    MissingParent { field: String, parent: String },
    #[error("derived field {field} lists itself as a parent")]
    SelfReference { field: String },
    #[error("derived field {field} depends on derived field {parent}")]
    DerivedParent { field: String, parent: String },
    #[error("parent {parent} of {field} is a {found} field, {formula} needs {expected}")]
    ParentKind {
        field: String,
        parent: String,
        formula: Formula,
        expected: &'static str,
        found: &'static str,
    },
}

/// Checks one field's dependency configuration. Non-derived fields have no
/// issues.
#[must_use]
pub fn check_field(field: &FieldDefinition, all_fields: &[FieldDefinition]) -> Vec<DependencyIssue> {
    let mut issues = Vec::new();
    if !field.derived {
        return issues;
    }
    if field.kind != FieldKind::Number {
        issues.push(DependencyIssue::NotNumber {
            field: field.id.clone(),
            kind: field.kind.as_str(),
        });
    }

    let formula = field.formula.unwrap_or_default();
    if !formula.accepts_parent_count(field.parent_fields.len()) {
        issues.push(DependencyIssue::ParentCount {
            field: field.id.clone(),
            formula,
            found: field.parent_fields.len(),
            expected: formula.arity_text(),
        });
    }

    for (parent_id, parent) in field.parent_fields.iter().zip(resolve_parents(field, all_fields)) {
        if parent_id == &field.id {
            issues.push(DependencyIssue::SelfReference {
                field: field.id.clone(),
            });
            continue;
        }
        let Some(parent) = parent else {
            issues.push(DependencyIssue::MissingParent {
                field: field.id.clone(),
                parent: parent_id.clone(),
            });
            continue;
        };
        if parent.derived {
            issues.push(DependencyIssue::DerivedParent {
                field: field.id.clone(),
                parent: parent_id.clone(),
            });
        }
        if parent.kind != formula.parent_kind() {
            issues.push(DependencyIssue::ParentKind {
                field: field.id.clone(),
                parent: parent_id.clone(),
                formula,
                expected: formula.parent_kind().as_str(),
                found: parent.kind.as_str(),
            });
        }
    }
    issues
}

/// Checks every field of a schema, in field order.
#[must_use]
pub fn check_all(all_fields: &[FieldDefinition]) -> Vec<DependencyIssue> {
    all_fields
        .iter()
        .flat_map(|field| check_field(field, all_fields))
        .collect()
}
