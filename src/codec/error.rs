// Mon Feb 02 2026 - Alex

use crate::catalog::TypeIndex;
use crate::memory::MemoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
    #[error("Blob truncated: header declares {declared} bytes, {available} present")]
    Truncated { declared: u64, available: u64 },
    #[error("Blob has {0} bytes after the declared payload")]
    TrailingBytes(usize),
    #[error("Object of {0} bytes does not fit the blob header")]
    TooLarge(u64),
    #[error("Refusing to encode an empty object")]
    EmptyObject,
    #[error("Edit rejected: {0}")]
    Rejected(#[from] EditRejected),
}

/// Why an edit was refused. A rejected edit leaves the blob untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditRejected {
    #[error("blob type {0} has no layout to edit against")]
    UnknownType(TypeIndex),
    #[error("blob holds {blob} bytes but {type_name} is {declared} bytes")]
    SizeMismatch { type_name: String, blob: u64, declared: u64 },
    #[error("no field {step} in {type_name}")]
    NoField { type_name: String, step: String },
    #[error("{0} is an aggregate, not a leaf field")]
    NotLeaf(String),
    #[error("{0} has no known layout")]
    Unresolved(String),
    #[error("{field} is {expected} bytes wide, value is {got}")]
    WidthMismatch { field: String, expected: u64, got: u64 },
    #[error("{field} has type {expected}, value is {got}")]
    TypeMismatch { field: String, expected: String, got: String },
    #[error("{value} does not fit in {field}")]
    OutOfRange { field: String, value: String },
    #[error("{field} overlaps the dispatch slot at 0x{slot:X}")]
    DispatchSlot { field: String, slot: u64 },
    #[error("empty field path")]
    EmptyPath,
    #[error("malformed field path {0:?}")]
    MalformedPath(String),
    #[error("malformed value {0:?}")]
    MalformedValue(String),
}
