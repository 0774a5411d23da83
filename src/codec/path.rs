// Tue Feb 03 2026 - Alex

use crate::catalog::{BitField, FieldType, TypeCatalog, TypeDescriptor};
use crate::codec::EditRejected;
use std::fmt;
use std::str::FromStr;

/// One hop of a [`FieldPath`]: a member offset relative to the enclosing
/// aggregate, plus the bit position when the member is a bit-field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathStep {
    pub offset: u64,
    pub bit_offset: Option<u8>,
}

impl PathStep {
    pub fn at(offset: u64) -> Self {
        Self { offset, bit_offset: None }
    }

    pub fn bits(offset: u64, bit_offset: u8) -> Self {
        Self { offset, bit_offset: Some(bit_offset) }
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.offset)?;
        if let Some(bit) = self.bit_offset {
            write!(f, ":{}", bit)?;
        }
        Ok(())
    }
}

/// Offsets leading from the blob's root type down to a leaf field.
///
/// Bases are transparent: a step lands on a base member when the offset falls
/// inside that base, so `[0x8]` reaches `A::x` inside a `B : A` blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    steps: Vec<PathStep>,
}

impl FieldPath {
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    pub fn from_offsets(offsets: &[u64]) -> Self {
        Self { steps: offsets.iter().copied().map(PathStep::at).collect() }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// Parses `0x8/0x10:3` (hex with prefix or decimal, `:bit` for bit-fields).
impl FromStr for FieldPath {
    type Err = EditRejected;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || EditRejected::MalformedPath(s.to_string());
        let mut steps = Vec::new();
        for part in s.split('/').map(str::trim) {
            let (offset, bit) = match part.split_once(':') {
                Some((offset, bit)) => (offset, Some(bit.parse::<u8>().map_err(|_| malformed())?)),
                None => (part, None),
            };
            let offset = match offset.strip_prefix("0x").or_else(|| offset.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => offset.parse::<u64>(),
            }
            .map_err(|_| malformed())?;
            steps.push(PathStep { offset, bit_offset: bit });
        }
        Ok(Self { steps })
    }
}

/// A leaf located inside a blob.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    /// Dotted member names, for messages.
    pub name: String,
    /// Offset from the start of the blob.
    pub offset: u64,
    /// Declared width; the storage unit for bit-fields.
    pub width: u64,
    pub ty: FieldType,
    pub bit_field: Option<BitField>,
    /// Dispatch slots of every polymorphic object passed on the way down.
    pub slots: Vec<(u64, u64)>,
}

const MAX_PATH_DEPTH: usize = 32;

struct Walk<'c> {
    catalog: &'c TypeCatalog,
    names: Vec<String>,
    slots: Vec<(u64, u64)>,
}

impl<'c> Walk<'c> {
    fn enter(&mut self, desc: &TypeDescriptor, abs: u64) {
        if desc.is_polymorphic() {
            let (offset, len) = self.catalog.convention().slot_range(desc.size);
            self.slots.push((abs + offset, len));
        }
    }

    fn no_field(&self, desc: &TypeDescriptor, step: impl fmt::Display) -> EditRejected {
        EditRejected::NoField { type_name: desc.name.clone(), step: step.to_string() }
    }

    fn in_class(
        &mut self,
        desc: &'c TypeDescriptor,
        abs: u64,
        step: PathStep,
        rest: &[PathStep],
        depth: usize,
    ) -> Result<ResolvedField, EditRejected> {
        if depth > MAX_PATH_DEPTH {
            return Err(EditRejected::Unresolved(desc.name.clone()));
        }
        self.enter(desc, abs);

        let field = desc
            .fields
            .iter()
            .find(|f| f.offset == step.offset && f.bit_field.map(|b| b.bit_offset) == step.bit_offset);
        if let Some(field) = field {
            self.names.push(field.name.clone());
            return self.in_field(&field.ty, field.size, field.bit_field, abs + field.offset, rest, depth);
        }

        let base = desc.bases.iter().find(|b| step.offset >= b.offset && step.offset < b.end_offset());
        match base {
            Some(base) => {
                let base_desc = self
                    .catalog
                    .get(base.type_index)
                    .ok_or_else(|| EditRejected::Unresolved(base.name.clone()))?;
                let inner = PathStep { offset: step.offset - base.offset, bit_offset: step.bit_offset };
                self.in_class(base_desc, abs + base.offset, inner, rest, depth + 1)
            }
            None => Err(self.no_field(desc, step)),
        }
    }

    fn in_field(
        &mut self,
        ty: &FieldType,
        width: u64,
        bit_field: Option<BitField>,
        abs: u64,
        rest: &[PathStep],
        depth: usize,
    ) -> Result<ResolvedField, EditRejected> {
        let Some((step, rest)) = rest.split_first() else {
            return match ty {
                FieldType::Class { .. } | FieldType::Array { .. } => Err(EditRejected::NotLeaf(self.names.join("."))),
                FieldType::Unresolved { .. } => Err(EditRejected::Unresolved(self.names.join("."))),
                _ => Ok(ResolvedField {
                    name: self.names.join("."),
                    offset: abs,
                    width,
                    ty: ty.clone(),
                    bit_field,
                    slots: std::mem::take(&mut self.slots),
                }),
            };
        };

        match ty {
            FieldType::Class { type_index, name } => {
                let desc = self.catalog.get(*type_index).ok_or_else(|| EditRejected::Unresolved(name.clone()))?;
                self.in_class(desc, abs, *step, rest, depth + 1)
            }
            FieldType::Array { element, count, stride } => {
                let stride = (*stride).max(1);
                let index = step.offset / stride;
                if step.offset % stride != 0 || index >= *count || step.bit_offset.is_some() {
                    return Err(EditRejected::NoField { type_name: ty.to_string(), step: step.to_string() });
                }
                self.names.push(format!("[{}]", index));
                self.in_field(element, stride, None, abs + step.offset, rest, depth + 1)
            }
            FieldType::Unresolved { .. } => Err(EditRejected::Unresolved(self.names.join("."))),
            _ => Err(EditRejected::NoField { type_name: ty.to_string(), step: step.to_string() }),
        }
    }
}

/// Walks `path` from `root` down to a leaf.
pub fn locate(catalog: &TypeCatalog, root: &TypeDescriptor, path: &FieldPath) -> Result<ResolvedField, EditRejected> {
    let (first, rest) = path.steps().split_first().ok_or(EditRejected::EmptyPath)?;
    let mut walk = Walk { catalog, names: Vec::new(), slots: Vec::new() };
    walk.in_class(root, 0, *first, rest, 0)
}

/// Turns `inner.x`, `items[2].id` or `flags` into an offset path. Own
/// fields shadow inherited ones; bases are searched in declaration order.
pub fn resolve_names(catalog: &TypeCatalog, root: &TypeDescriptor, dotted: &str) -> Result<FieldPath, EditRejected> {
    let mut steps = Vec::new();
    let mut current = FieldType::Class { type_index: root.index, name: root.name.clone() };

    for segment in dotted.split('.') {
        let (name, indices) = split_indices(segment).ok_or_else(|| EditRejected::MalformedPath(dotted.to_string()))?;

        let desc = match &current {
            FieldType::Class { type_index, name: class } => {
                catalog.get(*type_index).ok_or_else(|| EditRejected::Unresolved(class.clone()))?
            }
            other => {
                return Err(EditRejected::NoField { type_name: other.to_string(), step: name.to_string() });
            }
        };

        let (offset, field) = find_member(catalog, desc, name, 0)
            .ok_or_else(|| EditRejected::NoField { type_name: desc.name.clone(), step: name.to_string() })?;
        steps.push(PathStep { offset, bit_offset: field.bit_field.map(|b| b.bit_offset) });
        current = field.ty.clone();

        for index in indices {
            let FieldType::Array { element, count, stride } = &current else {
                return Err(EditRejected::NoField { type_name: current.to_string(), step: format!("[{}]", index) });
            };
            if index >= *count {
                return Err(EditRejected::NoField { type_name: current.to_string(), step: format!("[{}]", index) });
            }
            steps.push(PathStep::at(index * stride));
            current = (**element).clone();
        }
    }

    Ok(FieldPath::new(steps))
}

/// Offset of `name` relative to `desc`, looking through bases.
fn find_member<'c>(
    catalog: &'c TypeCatalog,
    desc: &'c TypeDescriptor,
    name: &str,
    depth: usize,
) -> Option<(u64, &'c crate::catalog::FieldDescriptor)> {
    if depth > MAX_PATH_DEPTH {
        return None;
    }
    if let Some(field) = desc.field_named(name) {
        return Some((field.offset, field));
    }
    desc.bases.iter().find_map(|base| {
        let base_desc = catalog.get(base.type_index)?;
        let (offset, field) = find_member(catalog, base_desc, name, depth + 1)?;
        Some((base.offset + offset, field))
    })
}

/// `items[2][1]` into `("items", [2, 1])`.
fn split_indices(segment: &str) -> Option<(&str, Vec<u64>)> {
    let (name, mut tail) = match segment.find('[') {
        Some(i) => (&segment[..i], &segment[i..]),
        None => (segment, ""),
    };
    if name.is_empty() {
        return None;
    }
    let mut indices = Vec::new();
    while !tail.is_empty() {
        let close = tail.find(']')?;
        indices.push(tail.get(1..close)?.trim().parse().ok()?);
        tail = &tail[close + 1..];
        if !tail.is_empty() && !tail.starts_with('[') {
            return None;
        }
    }
    Some((name, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offsets() {
        let path: FieldPath = "0x10/8:3".parse().unwrap();
        assert_eq!(path.steps(), &[PathStep::at(16), PathStep::bits(8, 3)]);
        assert_eq!(path.to_string(), "0x10/0x8:3");
        assert!("0xZZ".parse::<FieldPath>().is_err());
        assert!("8:x".parse::<FieldPath>().is_err());
    }

    #[test]
    fn test_split_indices() {
        assert_eq!(split_indices("items[2][1]"), Some(("items", vec![2, 1])));
        assert_eq!(split_indices("x"), Some(("x", vec![])));
        assert_eq!(split_indices("[1]"), None);
        assert_eq!(split_indices("a[1]b"), None);
        assert_eq!(split_indices("a[1"), None);
    }
}
