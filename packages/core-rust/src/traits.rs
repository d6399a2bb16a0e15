use crate::schema::FormSchema;

/// Persistence backend for saved form schemas.
///
/// The engine never calls this itself: a host loads the saved list, hands
/// schemas to the engine, and writes the whole list back after a save or
/// delete. Implementations must preserve list order and each schema's field
/// and rule order.
pub trait SchemaStore: Send + Sync {
    /// Load every saved schema, in saved order. An empty store yields an
    /// empty list.
    fn load_all(&self) -> anyhow::Result<Vec<FormSchema>>;

    /// Replace the stored list with `forms`.
    fn save_all(&self, forms: &[FormSchema]) -> anyhow::Result<()>;
}
