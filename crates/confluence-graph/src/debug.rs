//! Debug-info table
//!
//! Maps node names to the source positions they were created from. Purely
//! advisory; a missing entry degrades provenance, never the import.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One recorded source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLineCol {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

/// Name-keyed table of ordered source-position stacks.
///
/// The stack is ordered innermost first: entry 0 is where the node itself
/// was created, later entries are the enclosing call sites.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugInfo {
    traces: IndexMap<String, Vec<FileLineCol>>,
}

impl DebugInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_trace(&mut self, name: impl Into<String>, trace: Vec<FileLineCol>) {
        self.traces.insert(name.into(), trace);
    }

    /// Source-position stack recorded for `name`, if any.
    pub fn trace_for(&self, name: &str) -> Option<&[FileLineCol]> {
        self.traces.get(name).map(Vec::as_slice)
    }
}
