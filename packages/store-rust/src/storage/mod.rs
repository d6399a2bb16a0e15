//! [`SchemaStore`](formwright_core::SchemaStore) backends.
//!
//! - [`MemorySchemaStore`]: in-process list, for tests and embedding
//! - [`JsonFileSchemaStore`]: one JSON document on disk
//! - [`NullSchemaStore`]: discards writes, loads nothing

pub mod json_file;
pub mod memory;
pub mod null;

pub use json_file::*;
pub use memory::*;
pub use null::*;
