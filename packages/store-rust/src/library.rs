//! Form library: the draft being authored plus the list of saved forms.
//!
//! Saved forms are historical records. The library appends them on save and
//! removes them on delete, writing the whole list through the
//! [`SchemaStore`] each time; it never edits a saved form in place.

use tracing::{info, warn};

use formwright_core::{
    ClockSource, FieldDefinition, FieldKind, FormSchema, FormSession, IdGenerator, SchemaStore,
    SystemClock, UuidGenerator,
};

/// Errors returned by [`FormLibrary`] operations.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("form name must not be blank")]
    EmptyName,
    #[error("form has no fields")]
    NoFields,
    #[error("no saved form with id {id}")]
    NotFound { id: String },
    #[error("a saved form with id {id} already exists")]
    DuplicateId { id: String },
    #[error("persistence failed: {0}")]
    Persistence(#[from] anyhow::Error),
}

/// Authoring draft plus saved forms over a pluggable [`SchemaStore`].
pub struct FormLibrary<S: SchemaStore> {
    store: S,
    clock: Box<dyn ClockSource>,
    ids: Box<dyn IdGenerator>,
    forms: Vec<FormSchema>,
    current: FormSchema,
}

impl<S: SchemaStore> FormLibrary<S> {
    /// Loads the saved forms from `store` and starts an empty draft.
    pub fn open(
        store: S,
        clock: Box<dyn ClockSource>,
        ids: Box<dyn IdGenerator>,
    ) -> Result<Self, LibraryError> {
        let forms = store.load_all()?;
        info!(count = forms.len(), "saved forms loaded");
        let current = FormSchema::draft(ids.as_ref());
        Ok(Self {
            store,
            clock,
            ids,
            forms,
            current,
        })
    }

    /// [`open`](Self::open) with the system clock and random UUIDs.
    pub fn open_default(store: S) -> Result<Self, LibraryError> {
        Self::open(store, Box::new(SystemClock), Box::new(UuidGenerator))
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Saved forms, oldest first.
    pub fn forms(&self) -> &[FormSchema] {
        &self.forms
    }

    /// A saved form by id.
    pub fn find(&self, id: &str) -> Option<&FormSchema> {
        self.forms.iter().find(|f| f.id == id)
    }

    /// The draft being authored.
    pub fn current(&self) -> &FormSchema {
        &self.current
    }

    /// Appends a new field of `kind` to the draft and returns its id.
    pub fn add_field(&mut self, kind: FieldKind) -> String {
        self.current.add_field(kind, self.ids.as_ref())
    }

    /// Replaces a draft field by id; see [`FormSchema::update_field`] for
    /// when the replacement is refused.
    pub fn update_field(&mut self, field: FieldDefinition) -> bool {
        self.current.update_field(field)
    }

    /// Applies an authoring operation to one draft field with its siblings
    /// in view; see [`FormSchema::edit_field`].
    pub fn edit_field<F>(&mut self, id: &str, edit: F) -> bool
    where
        F: FnOnce(&mut FieldDefinition, &[FieldDefinition]) -> bool,
    {
        self.current.edit_field(id, edit)
    }

    /// Removes a draft field.
    pub fn delete_field(&mut self, id: &str) -> bool {
        self.current.delete_field(id)
    }

    /// Moves a draft field from one position to another.
    pub fn move_field(&mut self, from: usize, to: usize) -> bool {
        self.current.move_field(from, to)
    }

    /// Reorders the draft's fields; `order` must be a permutation of its ids.
    pub fn reorder_fields(&mut self, order: &[String]) -> bool {
        self.current.reorder_fields(order)
    }

    /// Discards the draft and starts a new empty one.
    pub fn reset_current_form(&mut self) {
        self.current = FormSchema::draft(self.ids.as_ref());
    }

    /// Names and timestamps the draft, appends it to the saved forms, persists
    /// the list, and starts a new draft.
    ///
    /// A blank name or an empty draft is rejected. If persisting fails the
    /// saved list and the draft are left as they were.
    pub fn save_form(&mut self, name: &str) -> Result<FormSchema, LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::EmptyName);
        }
        if self.current.fields.is_empty() {
            return Err(LibraryError::NoFields);
        }

        let mut form = self.current.clone();
        form.name = name.to_string();
        form.created_at = Some(self.clock.now());
        self.append_and_persist(form.clone())?;

        info!(form = %form.id, name = %form.name, fields = form.fields.len(), "form saved");
        self.reset_current_form();
        Ok(form)
    }

    /// Adds an externally authored schema to the saved forms.
    ///
    /// A blank id gets a fresh one and a missing `createdAt` is stamped now.
    /// Ids already in use are rejected.
    pub fn import(&mut self, mut form: FormSchema) -> Result<FormSchema, LibraryError> {
        if form.id.trim().is_empty() {
            form.id = self.ids.next_id();
        }
        if self.find(&form.id).is_some() {
            return Err(LibraryError::DuplicateId { id: form.id });
        }
        if form.created_at.is_none() {
            form.created_at = Some(self.clock.now());
        }
        let check = form.check();
        if !check.is_valid() {
            warn!(form = %form.id, problems = ?check.errors(), "imported form has structural problems");
        }
        self.append_and_persist(form.clone())?;
        info!(form = %form.id, name = %form.name, "form imported");
        Ok(form)
    }

    /// Deletes a saved form and persists the list.
    pub fn delete_form(&mut self, id: &str) -> Result<FormSchema, LibraryError> {
        let Some(index) = self.forms.iter().position(|f| f.id == id) else {
            return Err(LibraryError::NotFound { id: id.to_string() });
        };
        let removed = self.forms.remove(index);
        if let Err(err) = self.store.save_all(&self.forms) {
            warn!(form = id, error = %err, "delete not persisted, restoring");
            self.forms.insert(index, removed);
            return Err(err.into());
        }
        info!(form = id, "form deleted");
        Ok(removed)
    }

    /// Opens a preview session on a saved form, dated by the library clock.
    pub fn preview(&self, id: &str) -> Result<FormSession, LibraryError> {
        let form = self
            .find(id)
            .ok_or_else(|| LibraryError::NotFound { id: id.to_string() })?;
        Ok(FormSession::init(form.clone(), self.clock.as_ref()))
    }

    fn append_and_persist(&mut self, form: FormSchema) -> Result<(), LibraryError> {
        self.forms.push(form);
        if let Err(err) = self.store.save_all(&self.forms) {
            warn!(error = %err, "save not persisted, rolling back");
            self.forms.pop();
            return Err(err.into());
        }
        Ok(())
    }
}
