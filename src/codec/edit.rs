// Thu Feb 05 2026 - Alex

use crate::catalog::{FieldType, PrimitiveKind, TypeIndex};
use crate::codec::path::{locate, ResolvedField};
use crate::codec::scalar::{fit_signed, fit_unsigned, mask, read_uint, write_uint};
use crate::codec::{Blob, BlobCodec, CodecError, EditRejected, FieldPath};
use crate::memory::{Address, MemoryError, MemoryWriter};
use crate::utils::hex::from_hex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A new value for one leaf field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EditValue {
    Bool(bool),
    Int(i128),
    UInt(u128),
    Float(f64),
    Pointer(u64),
    /// Spliced verbatim; must match the declared width exactly.
    Bytes(Vec<u8>),
}

impl EditValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Pointer(_) => "pointer",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for EditValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Pointer(v) => write!(f, "ptr:0x{:X}", v),
            Self::Bytes(v) => write!(f, "hex:{}", crate::utils::hex::to_hex(v)),
        }
    }
}

/// `true`, `-5`, `42`, `0x2A`, `1.5`, `ptr:0x7ff0`, `hex:deadbeef`.
impl FromStr for EditValue {
    type Err = EditRejected;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let malformed = || EditRejected::MalformedValue(s.to_string());

        if let Some(hex) = s.strip_prefix("hex:") {
            return from_hex(hex).map(Self::Bytes).map_err(|_| malformed());
        }
        if let Some(ptr) = s.strip_prefix("ptr:") {
            let digits = ptr.trim_start_matches("0x").trim_start_matches("0X");
            return u64::from_str_radix(digits, 16).map(Self::Pointer).map_err(|_| malformed());
        }
        match s {
            "true" => return Ok(Self::Bool(true)),
            "false" => return Ok(Self::Bool(false)),
            _ => {}
        }
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return u128::from_str_radix(hex, 16).map(Self::UInt).map_err(|_| malformed());
        }
        if let Ok(v) = s.parse::<u128>() {
            return Ok(Self::UInt(v));
        }
        if let Ok(v) = s.parse::<i128>() {
            return Ok(Self::Int(v));
        }
        s.parse::<f64>().map(Self::Float).map_err(|_| malformed())
    }
}

/// One contiguous write the owning process must perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Offset from the start of the object.
    pub offset: u64,
    pub bytes: Vec<u8>,
}

impl WriteRequest {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Minimal byte changes produced by an edit, ready to mirror onto live memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSet {
    pub type_index: TypeIndex,
    pub requests: Vec<WriteRequest>,
}

impl EditSet {
    pub fn new(type_index: TypeIndex) -> Self {
        Self { type_index, requests: Vec::new() }
    }

    /// `(offset, length)` of every touched span.
    pub fn touched(&self) -> Vec<(u64, u64)> {
        self.requests.iter().map(|r| (r.offset, r.len())).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Writes every request relative to `object`. Called by the owner of the
    /// object, at a point where it knows the object is safe to modify.
    pub fn apply(&self, object: Address, writer: &mut dyn MemoryWriter) -> Result<(), MemoryError> {
        for request in &self.requests {
            let addr = object
                .checked_add(request.offset)
                .ok_or(MemoryError::WriteFailed(object.as_u64()))?;
            writer.write_bytes(addr, &request.bytes)?;
        }
        log::debug!("applied {} writes at {}", self.requests.len(), object);
        Ok(())
    }
}

impl BlobCodec {
    /// Encodes `value` into the leaf at `path` and splices it into `blob`.
    /// Either the whole field is written or, on rejection, nothing is.
    pub fn apply_edit(&self, blob: &mut Blob, path: &FieldPath, value: &EditValue) -> Result<EditSet, CodecError> {
        let index = blob.type_index();
        let desc = self.catalog.get(index).ok_or(EditRejected::UnknownType(index))?;
        if desc.size != blob.size() {
            return Err(EditRejected::SizeMismatch {
                type_name: desc.name.clone(),
                blob: blob.size(),
                declared: desc.size,
            }
            .into());
        }

        let leaf = locate(&self.catalog, desc, path)?;
        if let Some((slot, _)) = leaf.slots.iter().find(|(at, len)| overlaps(leaf.offset, leaf.width, *at, *len)) {
            return Err(EditRejected::DispatchSlot { field: leaf.name.clone(), slot: *slot }.into());
        }

        let current = blob
            .slice(leaf.offset, leaf.width)
            .ok_or(CodecError::Truncated { declared: leaf.offset + leaf.width, available: blob.size() })?;
        let bytes = encode_leaf(&leaf, current, value)?;

        let start = leaf.offset as usize;
        blob.data_mut()[start..start + bytes.len()].copy_from_slice(&bytes);
        log::debug!("edit {} = {} at +0x{:X}", leaf.name, value, leaf.offset);

        let mut set = EditSet::new(index);
        set.requests.push(WriteRequest { offset: leaf.offset, bytes });
        Ok(set)
    }
}

fn overlaps(a: u64, a_len: u64, b: u64, b_len: u64) -> bool {
    a < b + b_len && b < a + a_len
}

fn encode_leaf(leaf: &ResolvedField, current: &[u8], value: &EditValue) -> Result<Vec<u8>, EditRejected> {
    let width = leaf.width;
    let mismatch = |expected: String| EditRejected::TypeMismatch {
        field: leaf.name.clone(),
        expected,
        got: value.kind().to_string(),
    };

    if let EditValue::Bytes(bytes) = value {
        if leaf.bit_field.is_some() {
            return Err(mismatch("bit-field".to_string()));
        }
        if bytes.len() as u64 != width {
            return Err(EditRejected::WidthMismatch { field: leaf.name.clone(), expected: width, got: bytes.len() as u64 });
        }
        return Ok(bytes.clone());
    }

    let kind = match &leaf.ty {
        FieldType::Primitive { primitive } => *primitive,
        FieldType::Enum { underlying, .. } => *underlying,
        FieldType::Pointer { width: w, .. } => PrimitiveKind::pointer(u64::from(*w)).ok_or_else(|| mismatch(leaf.ty.to_string()))?,
        other => return Err(EditRejected::NotLeaf(other.to_string())),
    };

    if let Some(bits) = leaf.bit_field {
        let count = u32::from(bits.bit_count);
        let shift = u32::from(bits.bit_offset);
        if width > 16 || shift + count > (width * 8) as u32 {
            return Err(EditRejected::WidthMismatch { field: leaf.name.clone(), expected: width, got: u64::from(bits.bit_count) });
        }
        let raw = integer(kind, value, count).ok_or_else(|| out_of_range(leaf, value))??;
        let field_mask = mask(count) << shift;
        let storage = (read_uint(current) & !field_mask) | (raw << shift);
        return Ok(write_uint(storage, width as usize));
    }

    if kind.size() != width {
        return Err(EditRejected::WidthMismatch { field: leaf.name.clone(), expected: width, got: kind.size() });
    }

    let bytes = match (kind, value) {
        (PrimitiveKind::F32, EditValue::Float(v)) => (*v as f32).to_le_bytes().to_vec(),
        (PrimitiveKind::F64, EditValue::Float(v)) => v.to_le_bytes().to_vec(),
        (PrimitiveKind::F32, EditValue::Int(_) | EditValue::UInt(_)) => (as_float(value) as f32).to_le_bytes().to_vec(),
        (PrimitiveKind::F64, EditValue::Int(_) | EditValue::UInt(_)) => as_float(value).to_le_bytes().to_vec(),
        (k, _) if k.is_float() => return Err(mismatch(k.to_string())),
        (k, EditValue::Pointer(p)) if k.is_pointer() => {
            let raw = fit_unsigned(u128::from(*p), (width * 8) as u32).ok_or_else(|| out_of_range(leaf, value))?;
            write_uint(raw, width as usize)
        }
        (k, _) => {
            let raw = integer(k, value, (width * 8) as u32).ok_or_else(|| out_of_range(leaf, value))??;
            write_uint(raw, width as usize)
        }
    };
    Ok(bytes)
}

/// Two's complement of an integral edit value in `bits` bits. The outer
/// `None` means out of range; the inner error a value of the wrong kind.
fn integer(kind: PrimitiveKind, value: &EditValue, bits: u32) -> Option<Result<u128, EditRejected>> {
    let wrong_kind = || EditRejected::TypeMismatch {
        field: kind.to_string(),
        expected: kind.to_string(),
        got: value.kind().to_string(),
    };
    let signed = kind.is_signed();

    let fitted = match value {
        EditValue::Bool(b) if kind == PrimitiveKind::Bool => Some(u128::from(*b)),
        EditValue::Bool(_) => return Some(Err(wrong_kind())),
        EditValue::Int(v) if kind == PrimitiveKind::Bool => (0..=1).contains(v).then_some(*v as u128),
        EditValue::UInt(v) if kind == PrimitiveKind::Bool => (*v <= 1).then_some(*v),
        EditValue::Int(v) if signed => fit_signed(*v, bits),
        EditValue::Int(v) => u128::try_from(*v).ok().and_then(|v| fit_unsigned(v, bits)),
        EditValue::UInt(v) if signed => i128::try_from(*v).ok().and_then(|v| fit_signed(v, bits)),
        EditValue::UInt(v) => fit_unsigned(*v, bits),
        EditValue::Pointer(p) if kind.is_pointer() => fit_unsigned(u128::from(*p), bits),
        _ => return Some(Err(wrong_kind())),
    };
    fitted.map(Ok)
}

fn as_float(value: &EditValue) -> f64 {
    match value {
        EditValue::Int(v) => *v as f64,
        EditValue::UInt(v) => *v as f64,
        EditValue::Float(v) => *v,
        _ => 0.0,
    }
}

fn out_of_range(leaf: &ResolvedField, value: &EditValue) -> EditRejected {
    EditRejected::OutOfRange { field: leaf.name.clone(), value: value.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values() {
        assert_eq!("true".parse::<EditValue>().unwrap(), EditValue::Bool(true));
        assert_eq!("42".parse::<EditValue>().unwrap(), EditValue::UInt(42));
        assert_eq!("-5".parse::<EditValue>().unwrap(), EditValue::Int(-5));
        assert_eq!("0x2A".parse::<EditValue>().unwrap(), EditValue::UInt(42));
        assert_eq!("1.5".parse::<EditValue>().unwrap(), EditValue::Float(1.5));
        assert_eq!("ptr:0x7ff0".parse::<EditValue>().unwrap(), EditValue::Pointer(0x7ff0));
        assert_eq!("hex:dead".parse::<EditValue>().unwrap(), EditValue::Bytes(vec![0xde, 0xad]));
        assert!("hex:abc".parse::<EditValue>().is_err());
        assert!("banana".parse::<EditValue>().is_err());
    }

    #[test]
    fn test_integer_ranges() {
        assert_eq!(integer(PrimitiveKind::I8, &EditValue::Int(-1), 8), Some(Ok(0xFF)));
        assert_eq!(integer(PrimitiveKind::I8, &EditValue::UInt(200), 8), None);
        assert_eq!(integer(PrimitiveKind::U8, &EditValue::Int(-1), 8), None);
        assert!(matches!(integer(PrimitiveKind::U8, &EditValue::Float(1.0), 8), Some(Err(_))));
    }

    #[test]
    fn test_bool_takes_only_zero_or_one() {
        assert_eq!(integer(PrimitiveKind::Bool, &EditValue::Bool(true), 8), Some(Ok(1)));
        assert_eq!(integer(PrimitiveKind::Bool, &EditValue::UInt(0), 8), Some(Ok(0)));
        assert_eq!(integer(PrimitiveKind::Bool, &EditValue::Int(1), 8), Some(Ok(1)));
        assert_eq!(integer(PrimitiveKind::Bool, &EditValue::UInt(2), 8), None);
        assert_eq!(integer(PrimitiveKind::Bool, &EditValue::Int(7), 8), None);
        assert_eq!(integer(PrimitiveKind::Bool, &EditValue::Int(-1), 8), None);
    }

    #[test]
    fn test_edit_set_apply() {
        let mut memory = crate::memory::SnapshotMemory::zeroed(Address::new(0x1000), 16);
        let set = EditSet {
            type_index: TypeIndex(0),
            requests: vec![WriteRequest { offset: 4, bytes: vec![1, 2] }],
        };
        set.apply(Address::new(0x1000), &mut memory).unwrap();
        assert_eq!(&memory.as_slice()[4..6], &[1, 2]);
        assert_eq!(set.touched(), vec![(4, 2)]);

        let far = EditSet { type_index: TypeIndex(0), requests: vec![WriteRequest { offset: 15, bytes: vec![1, 2] }] };
        assert!(far.apply(Address::new(0x1000), &mut memory).is_err());
    }
}
