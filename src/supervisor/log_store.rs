//! In-memory store of captured output lines, keyed by process identifier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ordered, append-only line sequences per process identifier.
///
/// Both stream readers of a process append to the same sequence; the order
/// across the two streams is arrival order at the append point, the order
/// within one stream is preserved. Serializes as a plain mapping from
/// stringified identifier to the line array, which is exactly the persisted
/// snapshot format.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogStore {
    entries: BTreeMap<u32, Vec<String>>,
}

impl LogStore {
    /// Create an empty entry for `id` unless one already exists.
    ///
    /// Called at registration so that "registered with no output yet" is
    /// distinguishable from "never registered". An entry surviving from an
    /// earlier naturally-exited run of the same identifier is kept as is;
    /// new output appends after the old lines.
    pub fn register(&mut self, id: u32) {
        self.entries.entry(id).or_default();
    }

    /// Append one captured line to the sequence for `id`.
    pub fn append(&mut self, id: u32, line: String) {
        self.entries.entry(id).or_default().push(line);
    }

    /// Remove the sequence for `id`. Returns whether an entry existed.
    pub fn remove(&mut self, id: u32) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Current lines for `id`, if an entry exists.
    pub fn get(&self, id: u32) -> Option<&[String]> {
        self.entries.get(&id).map(Vec::as_slice)
    }

    /// Whether an entry exists for `id` (possibly with zero lines).
    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of identifiers with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
