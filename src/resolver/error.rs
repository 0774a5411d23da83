// Thu Jan 29 2026 - Alex

use crate::memory::{Address, MemoryError};
use crate::table::TableError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Table error: {0}")]
    Table(#[from] TableError),
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
    #[error("Module {module} at {base} overlaps {other}")]
    Overlap { module: String, base: Address, other: String },
    #[error("Module {0} has an empty load range")]
    EmptyRange(String),
    #[error("Malformed maps line: {0}")]
    MapsFormat(String),
}
