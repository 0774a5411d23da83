// Tue Jan 20 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Type {name} has zero size")]
    ZeroSize { name: String },
    #[error("Member {member} of {name} ends at {end}, past the type size {size}")]
    MemberOutOfBounds { name: String, member: String, end: u64, size: u64 },
    #[error("Member {member} of {name} has an offset past the address space")]
    OffsetOverflow { name: String, member: String },
    #[error("Descriptor at position {position} carries index {index}")]
    IndexMismatch { position: usize, index: u32 },
    #[error("Duplicate type name: {0}")]
    DuplicateName(String),
}
