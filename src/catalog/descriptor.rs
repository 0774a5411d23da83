// Tue Jan 20 2026 - Alex

use crate::catalog::PrimitiveKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a [`TypeDescriptor`] inside one built catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeIndex(pub u32);

impl TypeIndex {
    /// Tags blobs whose dynamic type could not be resolved.
    pub const UNKNOWN: TypeIndex = TypeIndex(u32::MAX);

    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "<unknown>")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Where the dispatch pointer lives inside a polymorphic object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPosition {
    #[default]
    Front,
    Back,
}

/// ABI facts fixed at bake time and shared by the builder and the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConvention {
    pub dispatch_slot: SlotPosition,
    pub pointer_width: u8,
}

impl LayoutConvention {
    pub fn new(dispatch_slot: SlotPosition, pointer_width: u8) -> Self {
        Self { dispatch_slot, pointer_width }
    }

    pub fn pointer_size(&self) -> u64 {
        u64::from(self.pointer_width)
    }

    /// Byte range `(offset, len)` of the dispatch slot in an object of `size` bytes.
    pub fn slot_range(&self, size: u64) -> (u64, u64) {
        let width = self.pointer_size().min(size);
        match self.dispatch_slot {
            SlotPosition::Front => (0, width),
            SlotPosition::Back => (size - width, width),
        }
    }
}

impl Default for LayoutConvention {
    fn default() -> Self {
        Self::new(SlotPosition::Front, 8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Protected => write!(f, "protected"),
            Self::Private => write!(f, "private"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldType {
    Primitive { primitive: PrimitiveKind },
    Pointer { width: u8, pointee: Option<String> },
    Class { type_index: TypeIndex, name: String },
    Array { element: Box<FieldType>, count: u64, stride: u64 },
    Enum { name: String, underlying: PrimitiveKind },
    /// The referenced type never made it into the catalog.
    Unresolved { name: String },
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive { primitive } => write!(f, "{}", primitive),
            Self::Pointer { pointee: Some(name), .. } => write!(f, "{}*", name),
            Self::Pointer { pointee: None, .. } => write!(f, "void*"),
            Self::Class { name, .. } => write!(f, "{}", name),
            Self::Array { element, count, .. } => write!(f, "{}[{}]", element, count),
            Self::Enum { name, .. } => write!(f, "enum {}", name),
            Self::Unresolved { name } => write!(f, "?{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitField {
    pub bit_offset: u8,
    pub bit_count: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: FieldType,
    /// Bytes from the start of the owning object.
    pub offset: u64,
    /// Declared width in bytes; for bit-fields, the storage unit width.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_field: Option<BitField>,
    #[serde(default)]
    pub visibility: Visibility,
}

impl FieldDescriptor {
    pub fn new(name: &str, ty: FieldType, offset: u64, size: u64) -> Self {
        Self {
            name: name.to_string(),
            ty,
            offset,
            size,
            bit_field: None,
            visibility: Visibility::Public,
        }
    }

    pub fn with_bit_field(mut self, bit_offset: u8, bit_count: u8) -> Self {
        self.bit_field = Some(BitField { bit_offset, bit_count });
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn end_offset(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} @ 0x{:X}", self.visibility, self.ty, self.name, self.offset)?;
        if let Some(bits) = self.bit_field {
            write!(f, " : {} bits at {}", bits.bit_count, bits.bit_offset)?;
        }
        Ok(())
    }
}

/// A base class subobject. `offset` is relative to the owning object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseDescriptor {
    pub name: String,
    pub type_index: TypeIndex,
    pub offset: u64,
    pub size: u64,
}

impl BaseDescriptor {
    pub fn end_offset(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub index: TypeIndex,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    pub size: u64,
    /// `None` for classes without a dispatch pointer.
    #[serde(default)]
    pub dispatch_slot: Option<SlotPosition>,
    #[serde(default)]
    pub bases: Vec<BaseDescriptor>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn new(index: TypeIndex, name: &str, size: u64) -> Self {
        Self {
            index,
            name: name.to_string(),
            unique_name: None,
            size,
            dispatch_slot: None,
            bases: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn is_polymorphic(&self) -> bool {
        self.dispatch_slot.is_some()
    }

    /// Largest end offset over every field and base.
    pub fn layout_extent(&self) -> u64 {
        let fields = self.fields.iter().map(FieldDescriptor::end_offset);
        let bases = self.bases.iter().map(BaseDescriptor::end_offset);
        fields.chain(bases).max().unwrap_or(0)
    }

    pub fn field_named(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "class {} {} (size {})", self.name, self.index, self.size)?;
        for base in &self.bases {
            writeln!(f, "  : {} @ 0x{:X}", base.name, base.offset)?;
        }
        for field in &self.fields {
            writeln!(f, "  {}", field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_range() {
        let front = LayoutConvention::new(SlotPosition::Front, 8);
        assert_eq!(front.slot_range(24), (0, 8));
        let back = LayoutConvention::new(SlotPosition::Back, 8);
        assert_eq!(back.slot_range(24), (16, 8));
    }

    #[test]
    fn test_layout_extent() {
        let mut desc = TypeDescriptor::new(TypeIndex(0), "B", 24);
        desc.bases.push(BaseDescriptor { name: "A".into(), type_index: TypeIndex(1), offset: 0, size: 16 });
        desc.fields.push(FieldDescriptor::new("y", FieldType::Primitive { primitive: PrimitiveKind::I32 }, 16, 4));
        assert_eq!(desc.layout_extent(), 20);
        assert_eq!(desc.field_named("y").unwrap().offset, 16);
        assert!(desc.field_named("x").is_none());
    }

    #[test]
    fn test_field_display() {
        let field = FieldDescriptor::new("count", FieldType::Primitive { primitive: PrimitiveKind::U64 }, 16, 8)
            .with_visibility(Visibility::Private);
        let display = format!("{}", field);
        assert!(display.contains("private"));
        assert!(display.contains("count"));
        assert!(display.contains("0x10"));
    }
}
