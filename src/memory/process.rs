// Thu Jan 22 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryReader, MemoryWriter};
use libc::pid_t;

/// Cross-process access to a live target on Linux.
///
/// Reads go through `process_vm_readv`, writes through `process_vm_writev`.
/// Neither call synchronizes with the target's own threads.
pub struct ProcessMemory {
    pid: pid_t,
}

impl ProcessMemory {
    pub fn attach(pid: pid_t) -> Result<Self, MemoryError> {
        if !std::path::Path::new(&format!("/proc/{}", pid)).exists() {
            return Err(MemoryError::ProcessNotFound(pid));
        }
        Ok(Self { pid })
    }

    pub fn pid(&self) -> pid_t {
        self.pid
    }
}

#[cfg(target_os = "linux")]
impl MemoryReader for ProcessMemory {
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut buffer = vec![0u8; len];
        if len == 0 {
            return Ok(buffer);
        }

        let local = libc::iovec {
            iov_base: buffer.as_mut_ptr().cast::<libc::c_void>(),
            iov_len: len,
        };
        let remote = libc::iovec {
            iov_base: addr.as_u64() as *mut libc::c_void,
            iov_len: len,
        };

        // SAFETY: `local` points at `buffer`, which is valid for `len` bytes and
        // outlives the call; the remote iovec is only dereferenced by the kernel.
        let read = unsafe { libc::process_vm_readv(self.pid, &local, 1, &remote, 1, 0) };
        if read < 0 {
            return Err(MemoryError::ReadFailed(addr.as_u64()));
        }

        let read = read as usize;
        if read != len {
            return Err(MemoryError::ShortRead { address: addr.as_u64(), wanted: len, got: read });
        }
        Ok(buffer)
    }
}

#[cfg(target_os = "linux")]
impl MemoryWriter for ProcessMemory {
    fn write_bytes(&mut self, addr: Address, data: &[u8]) -> Result<(), MemoryError> {
        if data.is_empty() {
            return Ok(());
        }

        let local = libc::iovec {
            iov_base: data.as_ptr() as *mut libc::c_void,
            iov_len: data.len(),
        };
        let remote = libc::iovec {
            iov_base: addr.as_u64() as *mut libc::c_void,
            iov_len: data.len(),
        };

        // SAFETY: `local` only exposes `data` for reading; the kernel copies out of it.
        let written = unsafe { libc::process_vm_writev(self.pid, &local, 1, &remote, 1, 0) };
        if written < 0 || written as usize != data.len() {
            return Err(MemoryError::WriteFailed(addr.as_u64()));
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
impl MemoryReader for ProcessMemory {
    fn read_bytes(&self, _addr: Address, _len: usize) -> Result<Vec<u8>, MemoryError> {
        Err(MemoryError::NotSupported("cross-process reads require Linux".to_string()))
    }
}

#[cfg(not(target_os = "linux"))]
impl MemoryWriter for ProcessMemory {
    fn write_bytes(&mut self, _addr: Address, _data: &[u8]) -> Result<(), MemoryError> {
        Err(MemoryError::NotSupported("cross-process writes require Linux".to_string()))
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn test_attach_missing_process() {
        assert!(ProcessMemory::attach(i32::MAX).is_err());
    }
}
