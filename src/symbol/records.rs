// Thu Jan 22 2026 - Alex

use crate::catalog::{PrimitiveKind, Visibility};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Index of a record in the debug-info type stream.
pub type RecordIndex = u32;

/// A dispatch table symbol, e.g. ``Widget::`vftable'``.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSymbol {
    /// Qualified name of the owning class.
    pub name: String,
    pub section_index: u16,
    pub section_offset: u64,
    /// Set for secondary tables emitted for a non-primary base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_base: Option<String>,
}

impl DispatchSymbol {
    pub fn new(name: &str, section_index: u16, section_offset: u64) -> Self {
        Self {
            name: name.to_string(),
            section_index,
            section_offset,
            for_base: None,
        }
    }

    pub fn with_for_base(mut self, base: &str) -> Self {
        self.for_base = Some(base.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionHeader {
    pub index: u16,
    pub name: String,
    pub relative_base: u64,
    pub size: u64,
}

impl SectionHeader {
    pub fn new(index: u16, name: &str, relative_base: u64, size: u64) -> Self {
        Self {
            index,
            name: name.to_string(),
            relative_base,
            size,
        }
    }

    /// Whether `offset` falls inside the section; empty sizes mean "unknown" and accept any offset.
    pub fn contains_offset(&self, offset: u64) -> bool {
        self.size == 0 || offset < self.size
    }
}

/// Reference from one record to another type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TypeRef {
    Primitive(PrimitiveKind),
    /// A pointer whose pointee is a built-in type, e.g. `void*`.
    PrimitivePointer(u8),
    Record(RecordIndex),
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ClassOptions: u16 {
        const FORWARD_REF = 1 << 0;
        const SCOPED = 1 << 1;
        const NESTED = 1 << 2;
        const HAS_UNIQUE_NAME = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    #[default]
    Class,
    Struct,
    Union,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub index: RecordIndex,
    #[serde(default)]
    pub kind: ClassKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_list: Option<RecordIndex>,
    #[serde(default)]
    pub options: ClassOptions,
    /// Definition index when the dumper already paired the stub with it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<RecordIndex>,
}

impl ClassRecord {
    pub fn definition(index: RecordIndex, name: &str, size: u64, field_list: RecordIndex) -> Self {
        Self {
            index,
            kind: ClassKind::Class,
            name: name.to_string(),
            unique_name: None,
            size,
            field_list: Some(field_list),
            options: ClassOptions::empty(),
            definition: None,
        }
    }

    pub fn forward(index: RecordIndex, name: &str) -> Self {
        Self {
            index,
            kind: ClassKind::Class,
            name: name.to_string(),
            unique_name: None,
            size: 0,
            field_list: None,
            options: ClassOptions::FORWARD_REF,
            definition: None,
        }
    }

    pub fn with_unique_name(mut self, unique: &str) -> Self {
        self.unique_name = Some(unique.to_string());
        self.options |= ClassOptions::HAS_UNIQUE_NAME;
        self
    }

    pub fn with_kind(mut self, kind: ClassKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_options(mut self, options: ClassOptions) -> Self {
        self.options |= options;
        self
    }

    pub fn is_forward_ref(&self) -> bool {
        self.options.contains(ClassOptions::FORWARD_REF)
    }

    /// Key used to pair forward references with definitions.
    pub fn lookup_key(&self) -> &str {
        self.unique_name.as_deref().unwrap_or(&self.name)
    }
}

/// One entry of a field list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "member", rename_all = "snake_case")]
pub enum MemberRecord {
    Data {
        name: String,
        ty: TypeRef,
        offset: u64,
        #[serde(default)]
        access: Visibility,
    },
    Base {
        ty: TypeRef,
        offset: u64,
        #[serde(default)]
        access: Visibility,
    },
    VirtualBase {
        ty: TypeRef,
    },
    /// The class introduces its own dispatch pointer.
    DispatchPointer,
    Static {
        name: String,
    },
    NestedType {
        name: String,
    },
    Method {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum TypeRecord {
    Class(ClassRecord),
    FieldList {
        index: RecordIndex,
        members: Vec<MemberRecord>,
    },
    Pointer {
        index: RecordIndex,
        referent: TypeRef,
        size: u8,
    },
    Array {
        index: RecordIndex,
        element: TypeRef,
        size: u64,
    },
    Modifier {
        index: RecordIndex,
        referent: TypeRef,
    },
    BitField {
        index: RecordIndex,
        base: TypeRef,
        bit_offset: u8,
        bit_count: u8,
    },
    Enum {
        index: RecordIndex,
        name: String,
        underlying: TypeRef,
    },
}

impl TypeRecord {
    pub fn index(&self) -> RecordIndex {
        match self {
            Self::Class(class) => class.index,
            Self::FieldList { index, .. }
            | Self::Pointer { index, .. }
            | Self::Array { index, .. }
            | Self::Modifier { index, .. }
            | Self::BitField { index, .. }
            | Self::Enum { index, .. } => *index,
        }
    }

    pub fn as_class(&self) -> Option<&ClassRecord> {
        match self {
            Self::Class(class) => Some(class),
            _ => None,
        }
    }
}
