// Wed Jan 21 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryReader, MemoryWriter};

/// An owned copy of a contiguous address range.
///
/// Used as the memory image in tests and by consumers that replay a dumped
/// region. Writes are bounds checked against the captured range.
#[derive(Debug, Clone)]
pub struct SnapshotMemory {
    base: Address,
    data: Vec<u8>,
}

impl SnapshotMemory {
    pub fn new(base: Address, data: Vec<u8>) -> Self {
        Self { base, data }
    }

    pub fn zeroed(base: Address, len: usize) -> Self {
        Self::new(base, vec![0u8; len])
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Little-endian helper for building fixtures.
    pub fn put(&mut self, addr: Address, bytes: &[u8]) -> Result<(), MemoryError> {
        let range = self.range(addr, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    fn range(&self, addr: Address, len: usize) -> Result<std::ops::Range<usize>, MemoryError> {
        let out_of_bounds = || MemoryError::OutOfBounds { address: addr.as_u64(), len };
        let start = addr.relative_to(self.base).ok_or_else(out_of_bounds)?;
        let start = usize::try_from(start).map_err(|_| out_of_bounds())?;
        let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
        if end > self.data.len() {
            return Err(out_of_bounds());
        }
        Ok(start..end)
    }
}

impl MemoryReader for SnapshotMemory {
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        let range = self.range(addr, len)?;
        Ok(self.data[range].to_vec())
    }
}

impl MemoryWriter for SnapshotMemory {
    fn write_bytes(&mut self, addr: Address, data: &[u8]) -> Result<(), MemoryError> {
        self.put(addr, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_inside_range() {
        let mut mem = SnapshotMemory::zeroed(Address::new(0x1000), 32);
        mem.put(Address::new(0x1008), &0xdead_beef_u64.to_le_bytes()).unwrap();
        assert_eq!(mem.read_u64(Address::new(0x1008)).unwrap(), 0xdead_beef);
        assert_eq!(mem.read_bytes(Address::new(0x1000), 32).unwrap().len(), 32);
    }

    #[test]
    fn test_read_past_end_fails() {
        let mem = SnapshotMemory::zeroed(Address::new(0x1000), 16);
        assert!(matches!(
            mem.read_bytes(Address::new(0x1008), 16),
            Err(MemoryError::OutOfBounds { .. })
        ));
        assert!(mem.read_bytes(Address::new(0x0fff), 1).is_err());
    }

    #[test]
    fn test_read_ptr_widths() {
        let mut mem = SnapshotMemory::zeroed(Address::new(0), 16);
        mem.put(Address::new(0), &0x1122_3344_u32.to_le_bytes()).unwrap();
        assert_eq!(mem.read_ptr(Address::new(0), 4).unwrap(), Address::new(0x1122_3344));
        assert!(mem.read_ptr(Address::new(0), 2).is_err());
    }
}
