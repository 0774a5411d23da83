// Mon Jan 26 2026 - Alex

use crate::builder::BuildError;
use crate::symbol::{DispatchSymbol, SectionHeader};
use ahash::AHashMap;

/// Section lookup by debug-info section number.
pub struct SectionMap<'a> {
    by_index: AHashMap<u16, &'a SectionHeader>,
}

impl<'a> SectionMap<'a> {
    pub fn new(sections: &'a [SectionHeader]) -> Self {
        let mut by_index = AHashMap::with_capacity(sections.len());
        for section in sections {
            by_index.entry(section.index).or_insert(section);
        }
        Self { by_index }
    }

    /// `sectionBase + sectionOffset + bias`, provided the section holds the offset.
    pub fn relative_address(&self, symbol: &DispatchSymbol, bias: u64) -> Result<u64, BuildError> {
        let no_section = || BuildError::NoMatchingSection {
            symbol: symbol.name.clone(),
            section_index: symbol.section_index,
            offset: symbol.section_offset,
        };

        let section = self
            .by_index
            .get(&symbol.section_index)
            .filter(|s| s.contains_offset(symbol.section_offset))
            .ok_or_else(no_section)?;

        section
            .relative_base
            .checked_add(symbol.section_offset)
            .and_then(|rva| rva.checked_add(bias))
            .ok_or_else(no_section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections() -> Vec<SectionHeader> {
        vec![
            SectionHeader::new(1, ".text", 0x1000, 0x5000),
            SectionHeader::new(2, ".rdata", 0x6000, 0x2000),
        ]
    }

    #[test]
    fn test_relative_address() {
        let sections = sections();
        let map = SectionMap::new(&sections);
        let symbol = DispatchSymbol::new("A", 2, 0x40);
        assert_eq!(map.relative_address(&symbol, 0).unwrap(), 0x6040);
        assert_eq!(map.relative_address(&symbol, 16).unwrap(), 0x6050);
    }

    #[test]
    fn test_offset_outside_section() {
        let sections = sections();
        let map = SectionMap::new(&sections);
        let symbol = DispatchSymbol::new("A", 2, 0x2000);
        assert!(matches!(map.relative_address(&symbol, 0), Err(BuildError::NoMatchingSection { .. })));
    }

    #[test]
    fn test_unknown_section_index() {
        let sections = sections();
        let map = SectionMap::new(&sections);
        assert!(map.relative_address(&DispatchSymbol::new("A", 9, 0), 0).is_err());
    }
}
