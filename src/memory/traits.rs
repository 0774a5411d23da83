// Wed Jan 21 2026 - Alex

use crate::memory::{Address, MemoryError};

/// Source of raw bytes for the encoder. Implementations take no locks on the
/// target object, so a read of live memory is a non-atomic snapshot.
pub trait MemoryReader: Send + Sync {
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError>;

    fn read_u64(&self, addr: Address) -> Result<u64, MemoryError> {
        let bytes = self.read_bytes(addr, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes);
        Ok(u64::from_le_bytes(raw))
    }

    fn read_u32(&self, addr: Address) -> Result<u32, MemoryError> {
        let bytes = self.read_bytes(addr, 4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes);
        Ok(u32::from_le_bytes(raw))
    }

    /// Reads a pointer-sized value of `width` bytes (4 or 8).
    fn read_ptr(&self, addr: Address, width: usize) -> Result<Address, MemoryError> {
        match width {
            4 => self.read_u32(addr).map(|v| Address::new(u64::from(v))),
            8 => self.read_u64(addr).map(Address::new),
            other => Err(MemoryError::NotSupported(format!("pointer width {}", other))),
        }
    }
}

/// Sink for the producer side of an edit cycle.
pub trait MemoryWriter {
    fn write_bytes(&mut self, addr: Address, data: &[u8]) -> Result<(), MemoryError>;
}
