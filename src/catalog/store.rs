// Wed Jan 21 2026 - Alex

use crate::catalog::{CatalogError, LayoutConvention, TypeDescriptor, TypeIndex};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Immutable arena of class descriptors. `TypeIndex(n)` is the n-th entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CatalogRecords", into = "CatalogRecords")]
pub struct TypeCatalog {
    convention: LayoutConvention,
    types: Vec<TypeDescriptor>,
    by_name: AHashMap<String, TypeIndex>,
}

#[derive(Serialize, Deserialize)]
struct CatalogRecords {
    convention: LayoutConvention,
    types: Vec<TypeDescriptor>,
}

impl TypeCatalog {
    /// Builds the arena, checking every descriptor's index and layout.
    pub fn from_descriptors(convention: LayoutConvention, types: Vec<TypeDescriptor>) -> Result<Self, CatalogError> {
        let mut by_name = AHashMap::with_capacity(types.len());
        for (position, desc) in types.iter().enumerate() {
            if desc.index.as_usize() != position {
                return Err(CatalogError::IndexMismatch { position, index: desc.index.0 });
            }
            validate_layout(desc)?;
            if by_name.insert(desc.name.clone(), desc.index).is_some() {
                return Err(CatalogError::DuplicateName(desc.name.clone()));
            }
        }
        Ok(Self { convention, types, by_name })
    }

    pub fn convention(&self) -> LayoutConvention {
        self.convention
    }

    pub fn get(&self, index: TypeIndex) -> Option<&TypeDescriptor> {
        if index.is_unknown() {
            return None;
        }
        self.types.get(index.as_usize())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.by_name.get(name).and_then(|idx| self.get(*idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TryFrom<CatalogRecords> for TypeCatalog {
    type Error = CatalogError;

    fn try_from(records: CatalogRecords) -> Result<Self, Self::Error> {
        Self::from_descriptors(records.convention, records.types)
    }
}

impl From<TypeCatalog> for CatalogRecords {
    fn from(catalog: TypeCatalog) -> Self {
        Self { convention: catalog.convention, types: catalog.types }
    }
}

/// Checks `size > 0` and that every field and base ends inside the object.
pub fn validate_layout(desc: &TypeDescriptor) -> Result<(), CatalogError> {
    if desc.size == 0 {
        return Err(CatalogError::ZeroSize { name: desc.name.clone() });
    }

    let members = desc
        .bases
        .iter()
        .map(|b| (b.name.as_str(), b.offset.checked_add(b.size)))
        .chain(desc.fields.iter().map(|f| (f.name.as_str(), f.offset.checked_add(f.size))));

    for (member, end) in members {
        let end = end.ok_or_else(|| CatalogError::OffsetOverflow { name: desc.name.clone(), member: member.to_string() })?;
        if end > desc.size {
            return Err(CatalogError::MemberOutOfBounds {
                name: desc.name.clone(),
                member: member.to_string(),
                end,
                size: desc.size,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDescriptor, FieldType, PrimitiveKind};

    fn int_field(name: &str, offset: u64) -> FieldDescriptor {
        FieldDescriptor::new(name, FieldType::Primitive { primitive: PrimitiveKind::I32 }, offset, 4)
    }

    #[test]
    fn test_lookup_by_index_and_name() {
        let mut a = TypeDescriptor::new(TypeIndex(0), "A", 8);
        a.fields.push(int_field("x", 0));
        let b = TypeDescriptor::new(TypeIndex(1), "B", 4);
        let catalog = TypeCatalog::from_descriptors(LayoutConvention::default(), vec![a, b]).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(TypeIndex(1)).unwrap().name, "B");
        assert_eq!(catalog.find_by_name("A").unwrap().index, TypeIndex(0));
        assert!(catalog.get(TypeIndex::UNKNOWN).is_none());
        assert!(catalog.get(TypeIndex(7)).is_none());
    }

    #[test]
    fn test_rejects_field_past_size() {
        let mut a = TypeDescriptor::new(TypeIndex(0), "A", 4);
        a.fields.push(int_field("x", 2));
        assert!(matches!(
            validate_layout(&a),
            Err(CatalogError::MemberOutOfBounds { end: 6, size: 4, .. })
        ));
    }

    #[test]
    fn test_rejects_misnumbered_arena() {
        let a = TypeDescriptor::new(TypeIndex(3), "A", 4);
        let result = TypeCatalog::from_descriptors(LayoutConvention::default(), vec![a]);
        assert!(matches!(result, Err(CatalogError::IndexMismatch { position: 0, index: 3 })));
    }

    #[test]
    fn test_json_round_trip_rebuilds_name_index() {
        let a = TypeDescriptor::new(TypeIndex(0), "A", 16);
        let catalog = TypeCatalog::from_descriptors(LayoutConvention::default(), vec![a]).unwrap();
        let json = serde_json::to_string(&catalog).unwrap();
        let loaded: TypeCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.find_by_name("A").unwrap().size, 16);
    }
}
