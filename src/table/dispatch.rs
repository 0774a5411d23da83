// Mon Jan 26 2026 - Alex

use crate::catalog::TypeIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maps one dispatch table address to the exact size and type of its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchEntry {
    /// Module-relative address of the dispatch table.
    pub relative_address: u64,
    pub type_index: TypeIndex,
    pub size: u64,
}

impl DispatchEntry {
    pub fn new(relative_address: u64, type_index: TypeIndex, size: u64) -> Self {
        Self { relative_address, type_index, size }
    }
}

impl fmt::Display for DispatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rva 0x{:X} -> {} ({} bytes)", self.relative_address, self.type_index, self.size)
    }
}

/// Entries sorted by relative address; lookups are binary searches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DispatchEntry>", into = "Vec<DispatchEntry>")]
pub struct DispatchTable {
    entries: Vec<DispatchEntry>,
}

impl DispatchTable {
    /// Sorts the entries. Callers deduplicate addresses beforehand; if two
    /// entries still share one, the first in input order wins.
    pub fn new(mut entries: Vec<DispatchEntry>) -> Self {
        entries.sort_by_key(|e| e.relative_address);
        entries.dedup_by_key(|e| e.relative_address);
        Self { entries }
    }

    pub fn lookup(&self, relative_address: u64) -> Option<&DispatchEntry> {
        self.entries
            .binary_search_by_key(&relative_address, |e| e.relative_address)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn entries(&self) -> &[DispatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<DispatchEntry>> for DispatchTable {
    fn from(entries: Vec<DispatchEntry>) -> Self {
        Self::new(entries)
    }
}

impl From<DispatchTable> for Vec<DispatchEntry> {
    fn from(table: DispatchTable) -> Self {
        table.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_hits_and_misses() {
        let table = DispatchTable::new(vec![
            DispatchEntry::new(0x3000, TypeIndex(1), 24),
            DispatchEntry::new(0x1000, TypeIndex(0), 16),
        ]);
        assert_eq!(table.entries()[0].relative_address, 0x1000);
        assert_eq!(table.lookup(0x3000).unwrap().size, 24);
        assert!(table.lookup(0x2000).is_none());
    }

    #[test]
    fn test_first_duplicate_wins() {
        let table = DispatchTable::new(vec![
            DispatchEntry::new(0x1000, TypeIndex(0), 16),
            DispatchEntry::new(0x1000, TypeIndex(5), 99),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(0x1000).unwrap().type_index, TypeIndex(0));
    }
}
