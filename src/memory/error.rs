// Tue Jan 20 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Read failed at address 0x{0:x}")]
    ReadFailed(u64),
    #[error("Write failed at address 0x{0:x}")]
    WriteFailed(u64),
    #[error("Short read at 0x{address:x}: wanted {wanted} bytes, got {got}")]
    ShortRead { address: u64, wanted: usize, got: usize },
    #[error("Out of bounds: 0x{address:x}+{len} not inside the mapped range")]
    OutOfBounds { address: u64, len: usize },
    #[error("Process not found: {0}")]
    ProcessNotFound(i32),
    #[error("Not supported: {0}")]
    NotSupported(String),
}
