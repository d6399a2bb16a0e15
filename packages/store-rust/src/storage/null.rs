//! No-op [`SchemaStore`] implementation.
//!
//! [`NullSchemaStore`] discards all writes and loads an empty list. Useful for
//! previews of forms that never need to outlive the process.

use formwright_core::{FormSchema, SchemaStore};

/// No-op `SchemaStore` for ephemeral use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSchemaStore;

impl SchemaStore for NullSchemaStore {
    fn load_all(&self) -> anyhow::Result<Vec<FormSchema>> {
        Ok(Vec::new())
    }

    fn save_all(&self, _forms: &[FormSchema]) -> anyhow::Result<()> {
        Ok(())
    }
}
