//! Identifier generation for new schemas and fields.
//!
//! Only uniqueness matters; the format is opaque to the engine.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Supplies unique string ids.
pub trait IdGenerator: Send + Sync {
    /// Returns an id never returned before by this generator.
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Predictable ids of the form `{prefix}-{n}`, starting at 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{n}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new("f");
        assert_eq!(ids.next_id(), "f-1");
        assert_eq!(ids.next_id(), "f-2");
    }

    #[test]
    fn uuids_are_distinct() {
        let ids = UuidGenerator;
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
