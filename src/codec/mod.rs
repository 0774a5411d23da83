// Mon Feb 02 2026 - Alex

pub mod blob;
pub mod decode;
pub mod edit;
pub mod error;
pub mod path;
mod scalar;
pub mod value;

pub use blob::{Blob, HEADER_LEN};
pub use edit::{EditSet, EditValue, WriteRequest};
pub use error::{CodecError, EditRejected};
pub use path::{FieldPath, PathStep, ResolvedField};
pub use value::{DecodedNode, DecodedTree, DecodedValue, RawMarker};

use crate::catalog::{TypeCatalog, TypeIndex};
use crate::memory::{Address, MemoryReader};
use std::sync::Arc;

/// Captures objects into blobs and interprets blobs against one catalog.
#[derive(Debug, Clone)]
pub struct BlobCodec {
    catalog: Arc<TypeCatalog>,
}

impl BlobCodec {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Copies `size` bytes at `address`. No interpretation happens here, so
    /// the copy is only as consistent as the memory was while it was read.
    pub fn encode(
        &self,
        reader: &dyn MemoryReader,
        address: Address,
        size: u64,
        type_index: TypeIndex,
    ) -> Result<Blob, CodecError> {
        if size == 0 {
            return Err(CodecError::EmptyObject);
        }
        if size > u64::from(u32::MAX) {
            return Err(CodecError::TooLarge(size));
        }
        let data = reader.read_bytes(address, size as usize)?;
        Blob::new(type_index, data)
    }

    /// Offset path for a dotted member name such as `inner.x` or `items[2]`.
    pub fn resolve_path(&self, type_index: TypeIndex, dotted: &str) -> Result<FieldPath, CodecError> {
        let root = self.catalog.get(type_index).ok_or(EditRejected::UnknownType(type_index))?;
        Ok(path::resolve_names(&self.catalog, root, dotted)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        BaseDescriptor, FieldDescriptor, FieldType, LayoutConvention, PrimitiveKind, SlotPosition, TypeDescriptor,
    };
    use crate::memory::SnapshotMemory;
    use crate::resolver::Resolution;

    const OBJECT: u64 = 0x10_0000;

    fn prim(primitive: PrimitiveKind) -> FieldType {
        FieldType::Primitive { primitive }
    }

    fn polymorphic(index: u32, name: &str, size: u64) -> TypeDescriptor {
        let mut desc = TypeDescriptor::new(TypeIndex(index), name, size);
        desc.dispatch_slot = Some(SlotPosition::Front);
        desc
    }

    fn catalog() -> Arc<TypeCatalog> {
        let mut a = polymorphic(0, "A", 16);
        a.fields.push(FieldDescriptor::new("x", prim(PrimitiveKind::I64), 8, 8));

        let mut b = polymorphic(1, "B", 24);
        b.bases.push(BaseDescriptor { name: "A".into(), type_index: TypeIndex(0), offset: 0, size: 16 });
        b.fields.push(FieldDescriptor::new("y", prim(PrimitiveKind::I32), 16, 4));

        let mut inner = TypeDescriptor::new(TypeIndex(2), "Inner", 8);
        inner.fields.push(FieldDescriptor::new("a", prim(PrimitiveKind::I32), 0, 4));
        inner.fields.push(FieldDescriptor::new("b", prim(PrimitiveKind::F32), 4, 4));

        let mut widget = polymorphic(3, "Widget", 48);
        widget.fields = vec![
            FieldDescriptor::new("inner", FieldType::Class { type_index: TypeIndex(2), name: "Inner".into() }, 8, 8),
            FieldDescriptor::new("mode", prim(PrimitiveKind::U32), 16, 4).with_bit_field(0, 3),
            FieldDescriptor::new("enabled", prim(PrimitiveKind::Bool), 16, 4).with_bit_field(3, 1),
            FieldDescriptor::new(
                "items",
                FieldType::Array { element: Box::new(prim(PrimitiveKind::I16)), count: 4, stride: 2 },
                20,
                8,
            ),
            FieldDescriptor::new(
                "color",
                FieldType::Enum { name: "Color".into(), underlying: PrimitiveKind::I32 },
                28,
                4,
            ),
            FieldDescriptor::new("owner", FieldType::Pointer { width: 8, pointee: Some("A".into()) }, 32, 8),
            FieldDescriptor::new("opaque", FieldType::Unresolved { name: "Hidden".into() }, 40, 8),
        ];

        let mut bad = polymorphic(4, "SlotField", 16);
        bad.fields.push(FieldDescriptor::new("first", prim(PrimitiveKind::U64), 0, 8));

        let types = vec![a, b, inner, widget, bad];
        Arc::new(TypeCatalog::from_descriptors(LayoutConvention::default(), types).unwrap())
    }

    fn b_object() -> SnapshotMemory {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x1_4000_5200u64.to_le_bytes());
        bytes.extend_from_slice(&(-5i64).to_le_bytes());
        bytes.extend_from_slice(&7i32.to_le_bytes());
        bytes.extend_from_slice(&[0xCC; 4]);
        SnapshotMemory::new(Address::new(OBJECT), bytes)
    }

    fn widget_object() -> SnapshotMemory {
        let mut bytes = vec![0u8; 48];
        bytes[0..8].copy_from_slice(&0x1_4000_5300u64.to_le_bytes());
        bytes[8..12].copy_from_slice(&42i32.to_le_bytes());
        bytes[12..16].copy_from_slice(&1.5f32.to_le_bytes());
        bytes[16..20].copy_from_slice(&0b1110u32.to_le_bytes());
        for (i, v) in [1i16, -2, 3, -4].iter().enumerate() {
            bytes[20 + i * 2..22 + i * 2].copy_from_slice(&v.to_le_bytes());
        }
        bytes[28..32].copy_from_slice(&2i32.to_le_bytes());
        bytes[32..40].copy_from_slice(&0x7ff0_1234u64.to_le_bytes());
        bytes[40..48].copy_from_slice(&[0xAB; 8]);
        SnapshotMemory::new(Address::new(OBJECT), bytes)
    }

    fn leaf<'t>(tree: &'t DecodedTree, name: &str) -> &'t DecodedNode {
        tree.leaves().into_iter().find(|n| n.name == name).unwrap()
    }

    #[test]
    fn test_decode_subclass_through_base() {
        let codec = BlobCodec::new(catalog());
        let blob = codec.encode(&b_object(), Address::new(OBJECT), 24, TypeIndex(1)).unwrap();
        let tree = codec.decode(&blob);

        assert_eq!(tree.marker, None);
        assert_eq!(tree.summary(), "[x@8:int64][y@16:int32]");
        assert_eq!(leaf(&tree, "x").value, DecodedValue::Int(-5));
        assert_eq!(leaf(&tree, "y").value, DecodedValue::Int(7));
        assert_eq!(tree.nodes[0].name, "A");
    }

    #[test]
    fn test_round_trip_matches_direct_reads() {
        let memory = widget_object();
        let codec = BlobCodec::new(catalog());
        let blob = codec.encode(&memory, Address::new(OBJECT), 48, TypeIndex(3)).unwrap();
        let wire = blob.to_bytes();
        let tree = codec.decode(&Blob::from_bytes(&wire).unwrap());

        for node in tree.leaves() {
            let direct = memory.read_bytes(Address::new(OBJECT + node.offset), node.size as usize).unwrap();
            assert_eq!(blob.slice(node.offset, node.size).unwrap(), &direct[..], "{}", node.name);
        }
    }

    #[test]
    fn test_decode_widget_values() {
        let codec = BlobCodec::new(catalog());
        let blob = codec.encode(&widget_object(), Address::new(OBJECT), 48, TypeIndex(3)).unwrap();
        let tree = codec.decode(&blob);

        assert_eq!(leaf(&tree, "a").value, DecodedValue::Int(42));
        assert_eq!(leaf(&tree, "b").value, DecodedValue::Float(1.5));
        assert_eq!(leaf(&tree, "mode").value, DecodedValue::UInt(0b110));
        assert_eq!(leaf(&tree, "enabled").value, DecodedValue::Bool(true));
        assert_eq!(leaf(&tree, "[1]").value, DecodedValue::Int(-2));
        assert_eq!(leaf(&tree, "color").value, DecodedValue::Enum { name: "Color".into(), value: 2 });
        assert_eq!(leaf(&tree, "owner").value, DecodedValue::Pointer(0x7ff0_1234));
        assert_eq!(
            leaf(&tree, "opaque").value,
            DecodedValue::Raw { marker: RawMarker::Unresolved, hex: "abababababababab".into() }
        );
    }

    #[test]
    fn test_size_mismatch_falls_back_to_raw() {
        let codec = BlobCodec::new(catalog());
        let blob = Blob::new(TypeIndex(1), vec![0x11; 16]).unwrap();
        let tree = codec.decode(&blob);

        assert_eq!(tree.marker, Some(RawMarker::SizeMismatch));
        assert_eq!(tree.type_name, "B");
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].size, 16);
    }

    #[test]
    fn test_unresolved_pointer_gives_flat_view() {
        let codec = BlobCodec::new(catalog());
        let (size, index) = Resolution::Unresolved.or_fallback(16);
        let blob = codec.encode(&b_object(), Address::new(OBJECT), size, index).unwrap();
        let tree = codec.decode(&blob);

        assert_eq!(tree.marker, Some(RawMarker::UnknownType));
        assert_eq!(tree.size, 16);
        assert!(matches!(tree.nodes[0].value, DecodedValue::Raw { marker: RawMarker::UnknownType, .. }));
    }

    #[test]
    fn test_encode_errors() {
        let codec = BlobCodec::new(catalog());
        let memory = b_object();
        assert!(matches!(codec.encode(&memory, Address::new(OBJECT), 0, TypeIndex(0)), Err(CodecError::EmptyObject)));
        assert!(matches!(
            codec.encode(&memory, Address::new(OBJECT), 64, TypeIndex(0)),
            Err(CodecError::Memory(_))
        ));
    }

    #[test]
    fn test_edit_touches_only_the_field() {
        let codec = BlobCodec::new(catalog());
        let mut blob = codec.encode(&b_object(), Address::new(OBJECT), 24, TypeIndex(1)).unwrap();
        let before = blob.clone();

        let path = codec.resolve_path(TypeIndex(1), "y").unwrap();
        let set = codec.apply_edit(&mut blob, &path, &EditValue::Int(99)).unwrap();

        assert_eq!(set.touched(), vec![(16, 4)]);
        assert_eq!(&blob.data()[16..20], &99i32.to_le_bytes());
        assert_eq!(&blob.data()[..16], &before.data()[..16]);
        assert_eq!(&blob.data()[20..], &before.data()[20..]);
    }

    #[test]
    fn test_edit_inherited_field_and_mirror() {
        let codec = BlobCodec::new(catalog());
        let mut memory = b_object();
        let mut blob = codec.encode(&memory, Address::new(OBJECT), 24, TypeIndex(1)).unwrap();

        let path = codec.resolve_path(TypeIndex(1), "x").unwrap();
        assert_eq!(path, FieldPath::from_offsets(&[8]));
        let set = codec.apply_edit(&mut blob, &path, &EditValue::Int(i64::MIN as i128)).unwrap();
        set.apply(Address::new(OBJECT), &mut memory).unwrap();

        assert_eq!(memory.as_slice(), blob.data());
        assert_eq!(leaf(&codec.decode(&blob), "x").value, DecodedValue::Int(i64::MIN as i128));
    }

    #[test]
    fn test_width_mismatch_leaves_blob_unchanged() {
        let codec = BlobCodec::new(catalog());
        let mut blob = codec.encode(&b_object(), Address::new(OBJECT), 24, TypeIndex(1)).unwrap();
        let before = blob.clone();
        let path = FieldPath::from_offsets(&[16]);

        let err = codec.apply_edit(&mut blob, &path, &EditValue::Bytes(vec![1, 2, 3])).unwrap_err();
        assert!(matches!(err, CodecError::Rejected(EditRejected::WidthMismatch { expected: 4, got: 3, .. })));

        let err = codec.apply_edit(&mut blob, &path, &EditValue::Int(1 << 40)).unwrap_err();
        assert!(matches!(err, CodecError::Rejected(EditRejected::OutOfRange { .. })));

        let err = codec.apply_edit(&mut blob, &path, &EditValue::Float(1.0)).unwrap_err();
        assert!(matches!(err, CodecError::Rejected(EditRejected::TypeMismatch { .. })));
        assert_eq!(blob, before);
    }

    #[test]
    fn test_dispatch_slot_is_protected() {
        let codec = BlobCodec::new(catalog());
        let mut blob = Blob::new(TypeIndex(4), vec![0; 16]).unwrap();
        let err = codec.apply_edit(&mut blob, &FieldPath::from_offsets(&[0]), &EditValue::UInt(1)).unwrap_err();
        assert!(matches!(err, CodecError::Rejected(EditRejected::DispatchSlot { slot: 0, .. })));
        assert_eq!(blob.data(), &[0; 16]);
    }

    #[test]
    fn test_bit_field_edit_preserves_neighbours() {
        let codec = BlobCodec::new(catalog());
        let mut blob = codec.encode(&widget_object(), Address::new(OBJECT), 48, TypeIndex(3)).unwrap();

        let path = codec.resolve_path(TypeIndex(3), "mode").unwrap();
        assert_eq!(path.steps(), &[PathStep::bits(16, 0)]);
        let set = codec.apply_edit(&mut blob, &path, &EditValue::UInt(5)).unwrap();
        assert_eq!(set.touched(), vec![(16, 4)]);

        let tree = codec.decode(&blob);
        assert_eq!(leaf(&tree, "mode").value, DecodedValue::UInt(5));
        assert_eq!(leaf(&tree, "enabled").value, DecodedValue::Bool(true));

        let err = codec.apply_edit(&mut blob, &path, &EditValue::UInt(8)).unwrap_err();
        assert!(matches!(err, CodecError::Rejected(EditRejected::OutOfRange { .. })));

        let enabled = codec.resolve_path(TypeIndex(3), "enabled").unwrap();
        codec.apply_edit(&mut blob, &enabled, &EditValue::Bool(false)).unwrap();
        let tree = codec.decode(&blob);
        assert_eq!(leaf(&tree, "enabled").value, DecodedValue::Bool(false));
        assert_eq!(leaf(&tree, "mode").value, DecodedValue::UInt(5));
    }

    #[test]
    fn test_nested_and_array_paths() {
        let codec = BlobCodec::new(catalog());
        let mut blob = codec.encode(&widget_object(), Address::new(OBJECT), 48, TypeIndex(3)).unwrap();

        let b = codec.resolve_path(TypeIndex(3), "inner.b").unwrap();
        assert_eq!(b, FieldPath::from_offsets(&[8, 4]));
        codec.apply_edit(&mut blob, &b, &EditValue::Float(2.5)).unwrap();

        let item = codec.resolve_path(TypeIndex(3), "items[2]").unwrap();
        assert_eq!(item, FieldPath::from_offsets(&[20, 4]));
        let set = codec.apply_edit(&mut blob, &item, &EditValue::Int(-3)).unwrap();
        assert_eq!(set.touched(), vec![(24, 2)]);

        let tree = codec.decode(&blob);
        assert_eq!(leaf(&tree, "b").value, DecodedValue::Float(2.5));
        assert_eq!(leaf(&tree, "[2]").value, DecodedValue::Int(-3));
    }

    #[test]
    fn test_rejected_paths() {
        let codec = BlobCodec::new(catalog());
        let mut blob = codec.encode(&widget_object(), Address::new(OBJECT), 48, TypeIndex(3)).unwrap();

        assert!(codec.resolve_path(TypeIndex(3), "nope").is_err());
        assert!(codec.resolve_path(TypeIndex(3), "inner.zz").is_err());
        assert!(codec.resolve_path(TypeIndex(3), "items[9]").is_err());
        assert!(codec.resolve_path(TypeIndex::UNKNOWN, "x").is_err());

        let inner = codec.resolve_path(TypeIndex(3), "inner").unwrap();
        let err = codec.apply_edit(&mut blob, &inner, &EditValue::UInt(0)).unwrap_err();
        assert!(matches!(err, CodecError::Rejected(EditRejected::NotLeaf(_))));

        let opaque = codec.resolve_path(TypeIndex(3), "opaque").unwrap();
        let err = codec.apply_edit(&mut blob, &opaque, &EditValue::Bytes(vec![0; 8])).unwrap_err();
        assert!(matches!(err, CodecError::Rejected(EditRejected::Unresolved(_))));

        let err = codec.apply_edit(&mut blob, &FieldPath::default(), &EditValue::UInt(0)).unwrap_err();
        assert!(matches!(err, CodecError::Rejected(EditRejected::EmptyPath)));
    }

    #[test]
    fn test_edit_rejects_unknown_blob() {
        let codec = BlobCodec::new(catalog());
        let mut blob = Blob::new(TypeIndex::UNKNOWN, vec![0; 16]).unwrap();
        let err = codec.apply_edit(&mut blob, &FieldPath::from_offsets(&[8]), &EditValue::UInt(1)).unwrap_err();
        assert!(matches!(err, CodecError::Rejected(EditRejected::UnknownType(_))));
    }
}
