// Thu Jan 29 2026 - Alex

use crate::memory::Address;
use crate::table::TableFile;
use std::fmt;
use std::sync::Arc;

/// One loaded module and the table baked for it. Lives from load to unload;
/// the table itself is shared and never mutated.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub name: String,
    pub load_base: Address,
    pub size: u64,
    pub table: Arc<TableFile>,
}

impl ModuleRecord {
    pub fn new(name: &str, load_base: Address, size: u64, table: Arc<TableFile>) -> Self {
        Self { name: name.to_string(), load_base, size, table }
    }

    pub fn end(&self) -> Address {
        self.load_base + self.size
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr.is_within(self.load_base, self.size)
    }

    pub fn overlaps(&self, other: &ModuleRecord) -> bool {
        self.load_base < other.end() && other.load_base < self.end()
    }
}

impl fmt::Display for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} - {}]", self.name, self.load_base, self.end())
    }
}
