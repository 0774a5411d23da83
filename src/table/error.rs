// Wed Jan 28 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Table encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not a dispatch table file (magic {0:?})")]
    BadMagic(String),
    #[error("Unsupported table format version {0}")]
    UnsupportedVersion(u32),
    #[error("Table for {module} is inconsistent: {reason}")]
    Inconsistent { module: String, reason: String },
    #[error("Table for {0} records no build fingerprint")]
    Unfingerprinted(String),
    #[error("Table for {module} is stale: built for {expected}, module is {actual}")]
    Stale { module: String, expected: String, actual: String },
}
