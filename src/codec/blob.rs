// Mon Feb 02 2026 - Alex

use crate::catalog::TypeIndex;
use crate::codec::CodecError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// `[type index: u32 LE][size: u32 LE]`
pub const HEADER_LEN: usize = 8;

/// A raw object snapshot tagged with the type it was captured as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    type_index: TypeIndex,
    data: Vec<u8>,
}

impl Blob {
    pub fn new(type_index: TypeIndex, data: Vec<u8>) -> Result<Self, CodecError> {
        if u32::try_from(data.len()).is_err() {
            return Err(CodecError::TooLarge(data.len() as u64));
        }
        Ok(Self { type_index, data })
    }

    pub fn type_index(&self) -> TypeIndex {
        self.type_index
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// `len` bytes at `offset`, or `None` when that runs past the payload.
    pub fn slice(&self, offset: u64, len: u64) -> Option<&[u8]> {
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(usize::try_from(len).ok()?)?;
        self.data.get(start..end)
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(HEADER_LEN + self.data.len());
        out.put_u32_le(self.type_index.0);
        out.put_u32_le(self.data.len() as u32);
        out.put_slice(&self.data);
        out.freeze()
    }

    pub fn from_bytes(mut raw: &[u8]) -> Result<Self, CodecError> {
        if raw.len() < HEADER_LEN {
            return Err(CodecError::Truncated { declared: HEADER_LEN as u64, available: raw.len() as u64 });
        }
        let type_index = TypeIndex(raw.get_u32_le());
        let size = raw.get_u32_le() as usize;

        if raw.remaining() < size {
            return Err(CodecError::Truncated { declared: size as u64, available: raw.remaining() as u64 });
        }
        if raw.remaining() > size {
            return Err(CodecError::TrailingBytes(raw.remaining() - size));
        }
        Ok(Self { type_index, data: raw.to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout() {
        let blob = Blob::new(TypeIndex(2), vec![0xAA, 0xBB, 0xCC]).unwrap();
        let wire = blob.to_bytes();
        assert_eq!(&wire[..], &[2, 0, 0, 0, 3, 0, 0, 0, 0xAA, 0xBB, 0xCC]);
        assert_eq!(Blob::from_bytes(&wire).unwrap(), blob);
    }

    #[test]
    fn test_unknown_sentinel_header() {
        let wire = Blob::new(TypeIndex::UNKNOWN, vec![0; 4]).unwrap().to_bytes();
        assert_eq!(&wire[..4], &[0xFF; 4]);
        assert!(Blob::from_bytes(&wire).unwrap().type_index().is_unknown());
    }

    #[test]
    fn test_rejects_short_and_long_input() {
        assert!(matches!(Blob::from_bytes(&[1, 0, 0]), Err(CodecError::Truncated { .. })));
        assert!(matches!(
            Blob::from_bytes(&[1, 0, 0, 0, 4, 0, 0, 0, 9, 9]),
            Err(CodecError::Truncated { declared: 4, available: 2 })
        ));
        assert!(matches!(Blob::from_bytes(&[1, 0, 0, 0, 1, 0, 0, 0, 9, 9]), Err(CodecError::TrailingBytes(1))));
    }

    #[test]
    fn test_slice_bounds() {
        let blob = Blob::new(TypeIndex(0), vec![1, 2, 3, 4]).unwrap();
        assert_eq!(blob.slice(1, 2), Some(&[2u8, 3][..]));
        assert_eq!(blob.slice(3, 2), None);
        assert_eq!(blob.slice(u64::MAX, 1), None);
    }
}
