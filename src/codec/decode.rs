// Wed Feb 04 2026 - Alex

use crate::catalog::{BitField, FieldType, PrimitiveKind, TypeDescriptor};
use crate::codec::scalar::{mask, read_uint, sign_extend};
use crate::codec::{Blob, BlobCodec, DecodedNode, DecodedTree, DecodedValue, RawMarker};
use itertools::Itertools;

const MAX_DECODE_DEPTH: usize = 32;

impl BlobCodec {
    /// Structured view of `blob`. Never fails: anything that cannot be
    /// interpreted comes back as raw bytes with a marker saying why.
    pub fn decode(&self, blob: &Blob) -> DecodedTree {
        let index = blob.type_index();

        let desc = match self.catalog.get(index) {
            Some(desc) if desc.size == blob.size() => desc,
            Some(desc) => {
                log::debug!("{}: blob is {} bytes, catalog says {}", desc.name, blob.size(), desc.size);
                return raw_tree(blob, &desc.name, RawMarker::SizeMismatch);
            }
            None => return raw_tree(blob, &index.to_string(), RawMarker::UnknownType),
        };

        DecodedTree {
            type_index: index,
            type_name: desc.name.clone(),
            size: blob.size(),
            marker: None,
            nodes: self.decode_class(blob, desc, 0, 0),
        }
    }

    fn decode_class(&self, blob: &Blob, desc: &TypeDescriptor, base: u64, depth: usize) -> Vec<DecodedNode> {
        let mut nodes = Vec::with_capacity(desc.bases.len() + desc.fields.len());

        for b in &desc.bases {
            let offset = base + b.offset;
            let value = match self.catalog.get(b.type_index) {
                Some(inner) if depth < MAX_DECODE_DEPTH => {
                    DecodedValue::Struct(self.decode_class(blob, inner, offset, depth + 1))
                }
                _ => raw(blob, offset, b.size, RawMarker::Unresolved),
            };
            nodes.push(DecodedNode::new(&b.name, &b.name, offset, b.size, value));
        }

        for field in desc.fields.iter().sorted_by_key(|f| (f.offset, f.bit_field.map(|b| b.bit_offset))) {
            let offset = base + field.offset;
            let value = self.decode_value(blob, &field.ty, offset, field.size, field.bit_field, depth);
            nodes.push(DecodedNode::new(&field.name, &field.ty.to_string(), offset, field.size, value));
        }

        nodes
    }

    fn decode_value(
        &self,
        blob: &Blob,
        ty: &FieldType,
        offset: u64,
        width: u64,
        bits: Option<BitField>,
        depth: usize,
    ) -> DecodedValue {
        let Some(bytes) = blob.slice(offset, width) else {
            return raw(blob, offset, blob.size().saturating_sub(offset), RawMarker::OutOfRange);
        };

        match ty {
            FieldType::Primitive { primitive } => match bits {
                Some(bits) => bit_value(*primitive, bytes, bits),
                None if primitive.size() == width => scalar(*primitive, bytes),
                None => DecodedValue::raw(RawMarker::SizeMismatch, bytes),
            },
            FieldType::Enum { name, underlying } => {
                let value = match bits {
                    Some(bits) => bit_value(*underlying, bytes, bits),
                    None if underlying.size() == width => scalar(*underlying, bytes),
                    None => return DecodedValue::raw(RawMarker::SizeMismatch, bytes),
                };
                match value {
                    DecodedValue::Int(v) => DecodedValue::Enum { name: name.clone(), value: v },
                    DecodedValue::UInt(v) => DecodedValue::Enum { name: name.clone(), value: v as i128 },
                    _ => DecodedValue::raw(RawMarker::Unresolved, bytes),
                }
            }
            FieldType::Pointer { .. } if width <= 8 => DecodedValue::Pointer(read_uint(bytes) as u64),
            FieldType::Pointer { .. } => DecodedValue::raw(RawMarker::SizeMismatch, bytes),
            FieldType::Class { type_index, .. } => match self.catalog.get(*type_index) {
                Some(inner) if inner.size == width && depth < MAX_DECODE_DEPTH => {
                    DecodedValue::Struct(self.decode_class(blob, inner, offset, depth + 1))
                }
                Some(_) => DecodedValue::raw(RawMarker::SizeMismatch, bytes),
                None => DecodedValue::raw(RawMarker::Unresolved, bytes),
            },
            FieldType::Array { element, count, stride } => {
                if stride.checked_mul(*count).map_or(true, |total| total > width) || depth >= MAX_DECODE_DEPTH {
                    return DecodedValue::raw(RawMarker::SizeMismatch, bytes);
                }
                let elements = (0..*count)
                    .map(|i| {
                        let at = offset + i * stride;
                        let value = self.decode_value(blob, element, at, *stride, None, depth + 1);
                        DecodedNode::new(&format!("[{}]", i), &element.to_string(), at, *stride, value)
                    })
                    .collect();
                DecodedValue::Array(elements)
            }
            FieldType::Unresolved { .. } => DecodedValue::raw(RawMarker::Unresolved, bytes),
        }
    }
}

fn raw_tree(blob: &Blob, type_name: &str, marker: RawMarker) -> DecodedTree {
    DecodedTree {
        type_index: blob.type_index(),
        type_name: type_name.to_string(),
        size: blob.size(),
        marker: Some(marker),
        nodes: vec![DecodedNode::new(
            "bytes",
            &format!("uint8[{}]", blob.size()),
            0,
            blob.size(),
            DecodedValue::raw(marker, blob.data()),
        )],
    }
}

fn raw(blob: &Blob, offset: u64, len: u64, marker: RawMarker) -> DecodedValue {
    DecodedValue::raw(marker, blob.slice(offset, len).unwrap_or(&[]))
}

fn scalar(kind: PrimitiveKind, bytes: &[u8]) -> DecodedValue {
    let value = read_uint(bytes);
    let bits = (bytes.len() * 8) as u32;
    match kind {
        PrimitiveKind::Bool => DecodedValue::Bool(value != 0),
        PrimitiveKind::F32 => DecodedValue::Float(f64::from(f32::from_bits(value as u32))),
        PrimitiveKind::F64 => DecodedValue::Float(f64::from_bits(value as u64)),
        PrimitiveKind::Ptr32 | PrimitiveKind::Ptr64 => DecodedValue::Pointer(value as u64),
        k if k.is_character() => match char::from_u32(value as u32) {
            Some(c) => DecodedValue::Char(c),
            None => DecodedValue::UInt(value),
        },
        k if k.is_signed() => DecodedValue::Int(sign_extend(value, bits)),
        _ => DecodedValue::UInt(value),
    }
}

fn bit_value(kind: PrimitiveKind, storage: &[u8], bits: BitField) -> DecodedValue {
    let count = u32::from(bits.bit_count);
    let value = read_uint(storage).checked_shr(u32::from(bits.bit_offset)).unwrap_or(0) & mask(count);
    match kind {
        PrimitiveKind::Bool => DecodedValue::Bool(value != 0),
        k if k.is_signed() => DecodedValue::Int(sign_extend(value, count)),
        _ => DecodedValue::UInt(value),
    }
}
