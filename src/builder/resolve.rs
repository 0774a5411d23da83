// Tue Jan 27 2026 - Alex

use crate::builder::{BuildError, BuildReport};
use crate::catalog::{
    BaseDescriptor, BitField, CatalogError, FieldDescriptor, FieldType, LayoutConvention, TypeCatalog,
    TypeDescriptor, TypeIndex, Visibility,
};
use crate::symbol::{ClassOptions, ClassRecord, MemberRecord, RecordIndex, TypeRecord, TypeRef};
use ahash::{AHashMap, AHashSet};
use indexmap::map::Entry;
use indexmap::IndexMap;

const MAX_REFERENCE_DEPTH: usize = 16;

struct PendingClass<'a> {
    def: &'a ClassRecord,
    own_dispatch: bool,
    bases: Vec<PendingBase>,
    fields: Vec<PendingField<'a>>,
}

struct PendingBase {
    ty: TypeRef,
    offset: u64,
    size: u64,
}

struct PendingField<'a> {
    name: &'a str,
    ty: TypeRef,
    offset: u64,
    size: u64,
    visibility: Visibility,
}

/// Two-pass resolution of a type record stream into a [`TypeCatalog`].
///
/// Pass one collects complete definitions under their lookup key; pass two
/// resolves every reference against that map. Individual failures go to the
/// report and only drop the class concerned.
pub struct TypeResolver<'a> {
    convention: LayoutConvention,
    records: AHashMap<RecordIndex, &'a TypeRecord>,
    definitions: IndexMap<&'a str, &'a ClassRecord>,
    admitted: AHashMap<&'a str, TypeIndex>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(convention: LayoutConvention, records: &'a [TypeRecord], report: &mut BuildReport) -> Self {
        let mut by_index = AHashMap::with_capacity(records.len());
        for record in records {
            by_index.entry(record.index()).or_insert(record);
        }

        let mut resolver = Self {
            convention,
            records: by_index,
            definitions: IndexMap::new(),
            admitted: AHashMap::new(),
        };
        resolver.collect_definitions(records, report);
        resolver
    }

    fn collect_definitions(&mut self, records: &'a [TypeRecord], report: &mut BuildReport) {
        let classes = records.iter().filter_map(TypeRecord::as_class);

        for class in classes.clone().filter(|c| !c.is_forward_ref()) {
            if is_unnamed(&class.name) {
                report.record(BuildError::UnnamedType { name: class.name.clone() });
                continue;
            }
            if class.options.contains(ClassOptions::SCOPED) {
                report.record(BuildError::ScopedType { name: class.name.clone() });
                continue;
            }

            match self.definitions.entry(class.lookup_key()) {
                Entry::Vacant(slot) => {
                    slot.insert(class);
                }
                Entry::Occupied(slot) => {
                    let kept = slot.get();
                    if kept.size != class.size {
                        report.record(BuildError::ConflictingDefinition {
                            name: class.name.clone(),
                            kept_size: kept.size,
                            dropped_size: class.size,
                        });
                    }
                }
            }
        }

        let mut reported = AHashSet::new();
        for class in classes.filter(|c| c.is_forward_ref()) {
            if is_unnamed(&class.name) || class.options.contains(ClassOptions::SCOPED) {
                continue;
            }
            if self.definition_of(class).is_none() && reported.insert(class.lookup_key()) {
                report.record(BuildError::UnresolvedForwardReference { name: class.name.clone() });
            }
        }
    }

    /// Builds the catalog: flatten, validate, number, then link references.
    pub fn resolve(mut self, report: &mut BuildReport) -> Result<TypeCatalog, CatalogError> {
        let definitions: Vec<&'a ClassRecord> = self.definitions.values().copied().collect();
        let mut pending = Vec::with_capacity(definitions.len());
        let mut names = AHashSet::new();

        for def in definitions {
            let class = self.flatten(def, report);
            if let Err(err) = check_extent(&class) {
                report.record(BuildError::InvalidLayout(err));
                continue;
            }
            if !names.insert(def.name.as_str()) {
                report.record(BuildError::DuplicateName { name: def.name.clone() });
                continue;
            }
            self.admitted.insert(def.lookup_key(), TypeIndex(pending.len() as u32));
            pending.push(class);
        }

        let polymorphic = self.polymorphic_flags(&pending);
        let descriptors = pending
            .iter()
            .enumerate()
            .map(|(i, class)| self.describe(TypeIndex(i as u32), class, polymorphic[i]))
            .collect();

        TypeCatalog::from_descriptors(self.convention, descriptors)
    }

    fn flatten(&self, def: &'a ClassRecord, report: &mut BuildReport) -> PendingClass<'a> {
        let mut class = PendingClass { def, own_dispatch: false, bases: Vec::new(), fields: Vec::new() };

        let members: &'a [MemberRecord] = match def.field_list {
            None => &[],
            Some(index) => match self.records.get(&index).copied() {
                Some(TypeRecord::FieldList { members, .. }) => members,
                _ => {
                    report.record(BuildError::MissingFieldList { name: def.name.clone(), field_list: index });
                    &[]
                }
            },
        };

        let mut unsized_fields = Vec::new();
        let mut virtual_base_seen = false;

        for member in members {
            match member {
                MemberRecord::Data { name, ty, offset, access } => {
                    let size = self.size_of(*ty, 0);
                    if size.is_none() {
                        unsized_fields.push(class.fields.len());
                    }
                    class.fields.push(PendingField {
                        name,
                        ty: *ty,
                        offset: *offset,
                        size: size.unwrap_or(0),
                        visibility: *access,
                    });
                }
                MemberRecord::Base { ty, offset, .. } => match self.size_of(*ty, 0) {
                    Some(size) => class.bases.push(PendingBase { ty: *ty, offset: *offset, size }),
                    None => report.record(BuildError::UnsizedBase {
                        class: def.name.clone(),
                        base: record_index(*ty),
                    }),
                },
                MemberRecord::VirtualBase { .. } => {
                    if !virtual_base_seen {
                        virtual_base_seen = true;
                        report.record(BuildError::VirtualBaseIgnored { class: def.name.clone() });
                    }
                }
                MemberRecord::DispatchPointer => class.own_dispatch = true,
                MemberRecord::Static { .. } | MemberRecord::NestedType { .. } | MemberRecord::Method { .. } => {}
            }
        }

        // Unknown widths stretch to the next member or the end of the object.
        for i in unsized_fields {
            let offset = class.fields[i].offset;
            let next = class
                .fields
                .iter()
                .map(|f| f.offset)
                .chain(class.bases.iter().map(|b| b.offset))
                .filter(|o| *o > offset)
                .min()
                .unwrap_or(def.size);
            class.fields[i].size = next.saturating_sub(offset);
            report.record(BuildError::UnsizedField {
                class: def.name.clone(),
                field: class.fields[i].name.to_string(),
            });
        }

        class.fields.sort_by_key(|f| f.offset);
        class
    }

    fn polymorphic_flags(&self, pending: &[PendingClass<'a>]) -> Vec<bool> {
        fn visit(
            i: usize,
            pending: &[PendingClass<'_>],
            bases: &[Vec<usize>],
            memo: &mut Vec<Option<bool>>,
            depth: usize,
        ) -> bool {
            if let Some(flag) = memo[i] {
                return flag;
            }
            if depth > MAX_REFERENCE_DEPTH {
                return false;
            }
            let flag = pending[i].own_dispatch || bases[i].iter().any(|b| visit(*b, pending, bases, memo, depth + 1));
            memo[i] = Some(flag);
            flag
        }

        let bases: Vec<Vec<usize>> = pending
            .iter()
            .map(|class| {
                class
                    .bases
                    .iter()
                    .filter_map(|b| self.class_index(b.ty))
                    .map(TypeIndex::as_usize)
                    .collect()
            })
            .collect();

        let mut memo = vec![None; pending.len()];
        (0..pending.len()).map(|i| visit(i, pending, &bases, &mut memo, 0)).collect()
    }

    fn describe(&self, index: TypeIndex, class: &PendingClass<'a>, polymorphic: bool) -> TypeDescriptor {
        let def = class.def;
        let mut desc = TypeDescriptor::new(index, &def.name, def.size);
        desc.unique_name = def.unique_name.clone();
        desc.dispatch_slot = polymorphic.then_some(self.convention.dispatch_slot);

        desc.bases = class
            .bases
            .iter()
            .map(|base| BaseDescriptor {
                name: self.name_of(base.ty, 0).unwrap_or_else(|| format!("0x{:X}", record_index(base.ty))),
                type_index: self.class_index(base.ty).unwrap_or(TypeIndex::UNKNOWN),
                offset: base.offset,
                size: base.size,
            })
            .collect();

        desc.fields = class
            .fields
            .iter()
            .map(|field| {
                let (ty, bits) = self.field_type(field.ty, 0);
                let mut out = FieldDescriptor::new(field.name, ty, field.offset, field.size)
                    .with_visibility(field.visibility);
                out.bit_field = bits;
                out
            })
            .collect();

        desc
    }

    fn class_record(&self, ty: TypeRef, depth: usize) -> Option<&'a ClassRecord> {
        if depth > MAX_REFERENCE_DEPTH {
            return None;
        }
        let record: &'a TypeRecord = self.records.get(&record_index_of(ty)?).copied()?;
        match record {
            TypeRecord::Class(class) => Some(class),
            TypeRecord::Modifier { referent, .. } => self.class_record(*referent, depth + 1),
            _ => None,
        }
    }

    fn definition_of(&self, class: &'a ClassRecord) -> Option<&'a ClassRecord> {
        if let Some(def) = self.definitions.get(class.lookup_key()) {
            return Some(*def);
        }
        let hinted = class.definition.and_then(|i| self.records.get(&i).copied())?.as_class()?;
        (!hinted.is_forward_ref()).then_some(hinted)
    }

    fn class_index(&self, ty: TypeRef) -> Option<TypeIndex> {
        let def = self.definition_of(self.class_record(ty, 0)?)?;
        self.admitted.get(def.lookup_key()).copied()
    }

    fn size_of(&self, ty: TypeRef, depth: usize) -> Option<u64> {
        if depth > MAX_REFERENCE_DEPTH {
            return None;
        }
        let index = match ty {
            TypeRef::Primitive(kind) => return Some(kind.size()),
            TypeRef::PrimitivePointer(width) => return Some(u64::from(width)),
            TypeRef::Record(index) => index,
        };

        let record: &'a TypeRecord = self.records.get(&index).copied()?;
        match record {
            TypeRecord::Class(class) => self.definition_of(class).map(|def| def.size),
            TypeRecord::Pointer { size, .. } => Some(u64::from(*size)),
            TypeRecord::Array { size, .. } => Some(*size),
            TypeRecord::Modifier { referent, .. } => self.size_of(*referent, depth + 1),
            TypeRecord::BitField { base, .. } => self.size_of(*base, depth + 1),
            TypeRecord::Enum { underlying, .. } => self.size_of(*underlying, depth + 1),
            TypeRecord::FieldList { .. } => None,
        }
    }

    fn name_of(&self, ty: TypeRef, depth: usize) -> Option<String> {
        if depth > MAX_REFERENCE_DEPTH {
            return None;
        }
        let index = match ty {
            TypeRef::Primitive(kind) => return Some(kind.to_string()),
            TypeRef::PrimitivePointer(_) => return Some("void*".to_string()),
            TypeRef::Record(index) => index,
        };

        match self.records.get(&index)? {
            TypeRecord::Class(class) => Some(class.name.clone()),
            TypeRecord::Enum { name, .. } => Some(name.clone()),
            TypeRecord::Pointer { referent, .. } => Some(format!("{}*", self.name_of(*referent, depth + 1)?)),
            TypeRecord::Modifier { referent, .. } | TypeRecord::BitField { base: referent, .. } => {
                self.name_of(*referent, depth + 1)
            }
            TypeRecord::Array { element, .. } => Some(format!("{}[]", self.name_of(*element, depth + 1)?)),
            TypeRecord::FieldList { .. } => None,
        }
    }

    fn field_type(&self, ty: TypeRef, depth: usize) -> (FieldType, Option<BitField>) {
        let unresolved = || FieldType::Unresolved {
            name: self.name_of(ty, depth).unwrap_or_else(|| format!("0x{:X}", record_index(ty))),
        };
        if depth > MAX_REFERENCE_DEPTH {
            return (unresolved(), None);
        }

        let index = match ty {
            TypeRef::Primitive(primitive) => return (FieldType::Primitive { primitive }, None),
            TypeRef::PrimitivePointer(width) => return (FieldType::Pointer { width, pointee: None }, None),
            TypeRef::Record(index) => index,
        };
        let Some(record) = self.records.get(&index) else {
            return (unresolved(), None);
        };

        match record {
            TypeRecord::Class(class) => match self.class_index(ty) {
                Some(type_index) => (FieldType::Class { type_index, name: class.name.clone() }, None),
                None => (unresolved(), None),
            },
            TypeRecord::Pointer { referent, size, .. } => {
                let pointee = self.name_of(*referent, depth + 1);
                (FieldType::Pointer { width: *size, pointee }, None)
            }
            TypeRecord::Array { element, size, .. } => {
                let stride = self.size_of(*element, depth + 1).unwrap_or(0);
                if stride == 0 {
                    return (unresolved(), None);
                }
                let (element, _) = self.field_type(*element, depth + 1);
                let array = FieldType::Array { element: Box::new(element), count: size / stride, stride };
                (array, None)
            }
            TypeRecord::Modifier { referent, .. } => self.field_type(*referent, depth + 1),
            TypeRecord::BitField { base, bit_offset, bit_count, .. } => {
                let (base, _) = self.field_type(*base, depth + 1);
                (base, Some(BitField { bit_offset: *bit_offset, bit_count: *bit_count }))
            }
            TypeRecord::Enum { name, underlying, .. } => match self.field_type(*underlying, depth + 1).0 {
                FieldType::Primitive { primitive } => (FieldType::Enum { name: name.clone(), underlying: primitive }, None),
                _ => (unresolved(), None),
            },
            TypeRecord::FieldList { .. } => (unresolved(), None),
        }
    }
}

fn check_extent(class: &PendingClass<'_>) -> Result<(), CatalogError> {
    let def = class.def;
    if def.size == 0 {
        return Err(CatalogError::ZeroSize { name: def.name.clone() });
    }

    let fields = class.fields.iter().map(|f| (f.name.to_string(), f.offset.checked_add(f.size)));
    let bases = class.bases.iter().map(|b| (format!("base@{}", b.offset), b.offset.checked_add(b.size)));
    for (member, end) in fields.chain(bases) {
        let Some(end) = end else {
            return Err(CatalogError::OffsetOverflow { name: def.name.clone(), member });
        };
        if end > def.size {
            return Err(CatalogError::MemberOutOfBounds { name: def.name.clone(), member, end, size: def.size });
        }
    }
    Ok(())
}

fn is_unnamed(name: &str) -> bool {
    name.contains("<unnamed-") || name.contains("<anonymous") || name.contains("<lambda")
}

fn record_index_of(ty: TypeRef) -> Option<RecordIndex> {
    match ty {
        TypeRef::Record(index) => Some(index),
        _ => None,
    }
}

fn record_index(ty: TypeRef) -> u32 {
    record_index_of(ty).unwrap_or(0)
}
