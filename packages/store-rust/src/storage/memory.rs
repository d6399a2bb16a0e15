//! In-memory [`SchemaStore`] implementation.

use parking_lot::RwLock;

use formwright_core::{FormSchema, SchemaStore};

/// Schema list held behind a [`RwLock`]; `save_all` replaces it wholesale.
#[derive(Debug, Default)]
pub struct MemorySchemaStore {
    forms: RwLock<Vec<FormSchema>>,
}

impl MemorySchemaStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `forms`.
    #[must_use]
    pub fn with_forms(forms: Vec<FormSchema>) -> Self {
        Self {
            forms: RwLock::new(forms),
        }
    }

    /// Number of stored schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forms.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forms.read().is_empty()
    }
}

impl SchemaStore for MemorySchemaStore {
    fn load_all(&self) -> anyhow::Result<Vec<FormSchema>> {
        Ok(self.forms.read().clone())
    }

    fn save_all(&self, forms: &[FormSchema]) -> anyhow::Result<()> {
        *self.forms.write() = forms.to_vec();
        Ok(())
    }
}
