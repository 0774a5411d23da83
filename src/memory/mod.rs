// Tue Jan 20 2026 - Alex

pub mod address;
pub mod error;
pub mod process;
pub mod snapshot;
pub mod traits;

pub use address::Address;
pub use error::MemoryError;
pub use process::ProcessMemory;
pub use snapshot::SnapshotMemory;
pub use traits::{MemoryReader, MemoryWriter};
