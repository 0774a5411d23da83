// Mon Jan 26 2026 - Alex

pub mod dispatch;
pub mod error;
pub mod file;
pub mod fingerprint;

pub use dispatch::{DispatchEntry, DispatchTable};
pub use error::TableError;
pub use file::{TableFile, TableHeader, FORMAT_VERSION, TABLE_MAGIC};
pub use fingerprint::{Fingerprint, FingerprintKind};
