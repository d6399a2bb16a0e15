//! Preview/fill session over one schema.
//!
//! A [`FormSession`] owns the value map and the error map for a single schema
//! and turns every edit into a complete new [`FormSnapshot`]. Within one
//! [`on_change`](FormSession::on_change) the edited field is validated first,
//! then every derived field is recomputed from the updated values, so a
//! snapshot never mixes old derived values with new inputs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::ClockSource;
use crate::field::FieldDefinition;
use crate::formula;
use crate::schema::FormSchema;
use crate::types::{FieldValue, FormErrorMap, FormValueMap};
use crate::validation;

/// Values and errors of every field at one point in time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub values: FormValueMap,
    pub errors: FormErrorMap,
}

impl FormSnapshot {
    /// Whether every error message is empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.values().all(String::is_empty)
    }
}

/// Live state of one preview/fill session.
///
/// Each session owns its schema copy and maps; concurrent previews need one
/// session each.
#[derive(Debug, Clone)]
pub struct FormSession {
    schema: FormSchema,
    today: NaiveDate,
    state: FormSnapshot,
}

impl FormSession {
    /// Opens a session, seeding defaults and computing initial errors and
    /// derived values. The clock fixes the reference date for durations.
    #[must_use]
    pub fn init(schema: FormSchema, clock: &dyn ClockSource) -> Self {
        Self::init_on(schema, clock.today())
    }

    /// Opens a session with an explicit reference date.
    #[must_use]
    pub fn init_on(schema: FormSchema, today: NaiveDate) -> Self {
        let mut state = FormSnapshot::default();
        for field in &schema.fields {
            let value = initial_value(field);
            let error = validation::validate(field, &value);
            state.values.insert(field.id.clone(), value);
            state.errors.insert(field.id.clone(), error);
        }
        let mut session = Self {
            schema,
            today,
            state,
        };
        session.recompute_derived();
        session
    }

    /// The schema this session runs over.
    #[must_use]
    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    /// Reference date used by duration formulas.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    #[must_use]
    pub fn values(&self) -> &FormValueMap {
        &self.state.values
    }

    #[must_use]
    pub fn errors(&self) -> &FormErrorMap {
        &self.state.errors
    }

    /// Current value of one field.
    #[must_use]
    pub fn value(&self, field_id: &str) -> Option<&FieldValue> {
        self.state.values.get(field_id)
    }

    /// Current error of one field; empty when valid.
    #[must_use]
    pub fn error(&self, field_id: &str) -> Option<&str> {
        self.state.errors.get(field_id).map(String::as_str)
    }

    /// A copy of the full current state.
    #[must_use]
    pub fn snapshot(&self) -> FormSnapshot {
        self.state.clone()
    }

    /// Applies an edit and returns the full new snapshot.
    ///
    /// A non-derived field is validated against its new value; every derived
    /// field is then recomputed and its error cleared. Ids not in the schema
    /// leave the state untouched.
    pub fn on_change(&mut self, field_id: &str, value: FieldValue) -> FormSnapshot {
        let Some(field) = self.schema.field(field_id) else {
            debug!(schema = %self.schema.id, field = field_id, "change for unknown field ignored");
            return self.snapshot();
        };
        if !field.derived {
            let error = validation::validate(field, &value);
            self.state.errors.insert(field_id.to_string(), error);
        }
        self.state.values.insert(field_id.to_string(), value);
        self.recompute_derived();
        self.snapshot()
    }

    /// Re-validates a field against its current value, for errors that should
    /// surface once the user leaves the field. Derived fields are unaffected.
    pub fn on_blur(&mut self, field_id: &str) -> FormSnapshot {
        if let Some(field) = self.schema.field(field_id) {
            if !field.derived {
                let current = self.state.values.get(field_id).cloned().unwrap_or_default();
                let error = validation::validate(field, &current);
                self.state.errors.insert(field_id.to_string(), error);
            }
        }
        self.snapshot()
    }

    /// Re-validates every non-derived field against its current value.
    pub fn validate_all(&mut self) -> FormSnapshot {
        for field in self.schema.fields.iter().filter(|f| !f.derived) {
            let current = self.state.values.get(&field.id).cloned().unwrap_or_default();
            let error = validation::validate(field, &current);
            self.state.errors.insert(field.id.clone(), error);
        }
        self.snapshot()
    }

    fn recompute_derived(&mut self) {
        for field in self.schema.fields.iter().filter(|f| f.derived) {
            let value = formula::compute(field, &self.schema.fields, &self.state.values, self.today);
            self.state.values.insert(field.id.clone(), value);
            self.state.errors.insert(field.id.clone(), String::new());
        }
    }
}

/// Default value when one is set and non-blank, otherwise the kind's empty
/// value. Derived fields start at their formula's fallback.
fn initial_value(field: &FieldDefinition) -> FieldValue {
    if field.derived {
        return field.empty_value();
    }
    match &field.default_value {
        Some(value) if !value.is_blank() => value.clone(),
        _ => field.empty_value(),
    }
}
