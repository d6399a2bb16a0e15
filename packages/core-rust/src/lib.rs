//! `formwright` core: field schema validation and derived-value computation.
//!
//! The crate is pure and synchronous. A [`FormSchema`] is an ordered list of
//! [`FieldDefinition`]s; a [`FormSession`] runs a schema, validating edits
//! with [`validate`] and recomputing derived fields with [`compute`] after
//! every change.

pub mod clock;
pub mod field;
pub mod formula;
pub mod ids;
pub mod resolver;
pub mod schema;
pub mod session;
pub mod traits;
pub mod types;
pub mod validation;

pub use clock::{ClockSource, FixedClock, SystemClock};
pub use field::{FieldDefinition, FieldKind};
pub use formula::{compute, Formula, YearsMonths, DURATION_FALLBACK};
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};
pub use resolver::DependencyIssue;
pub use schema::{FormSchema, ValidationResult};
pub use session::{FormSession, FormSnapshot};
pub use traits::SchemaStore;
pub use types::{FieldValue, FormErrorMap, FormValueMap};
pub use validation::{validate, RuleBound, RuleKind, ValidationRule};
