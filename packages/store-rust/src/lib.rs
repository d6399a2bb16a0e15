//! `formwright` store: schema persistence backends, the form library, and the
//! configuration used by the `formwright` command-line host.

pub mod config;
pub mod library;
pub mod storage;

pub use config::StoreConfig;
pub use library::{FormLibrary, LibraryError};
pub use storage::{JsonFileSchemaStore, MemorySchemaStore, NullSchemaStore, StoreError};
