// Fri Jan 23 2026 - Alex

use crate::symbol::demangle::dispatch_table_name;
use crate::symbol::{DebugInfoProvider, DispatchSymbol, SectionHeader, SymbolError, TypeRecord};
use crate::table::Fingerprint;
use goblin::elf::program_header::PT_LOAD;
use goblin::Object;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Sections and dispatch table symbols read straight from an ELF or PE image.
///
/// Object files carry no class layouts, so type records are always empty;
/// pair this with a record dump through [`crate::symbol::SplitProvider`].
#[derive(Debug, Clone)]
pub struct ObjectProvider {
    module: String,
    sections: Vec<SectionHeader>,
    symbols: Vec<DispatchSymbol>,
    /// ELF images follow the Itanium ABI.
    itanium: bool,
    fingerprint: Fingerprint,
}

impl ObjectProvider {
    pub fn open<P: AsRef<Path>>(path: P, module: &str) -> Result<Self, SymbolError> {
        let file = File::open(path.as_ref())?;
        // SAFETY: the mapping is read-only and dropped before this function returns.
        let map = unsafe { Mmap::map(&file)? };
        Self::parse(&map, module)
    }

    pub fn parse(bytes: &[u8], module: &str) -> Result<Self, SymbolError> {
        let (sections, symbols, itanium) = match Object::parse(bytes)? {
            Object::Elf(elf) => {
                let image_base = elf
                    .program_headers
                    .iter()
                    .filter(|ph| ph.p_type == PT_LOAD)
                    .map(|ph| ph.p_vaddr & !0xfff)
                    .min()
                    .unwrap_or(0);

                let sections: Vec<SectionHeader> = elf
                    .section_headers
                    .iter()
                    .enumerate()
                    .filter(|(_, sh)| sh.sh_addr != 0)
                    .map(|(i, sh)| {
                        let name = elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("");
                        SectionHeader::new(i as u16, name, sh.sh_addr - image_base, sh.sh_size)
                    })
                    .collect();

                let mut symbols = Vec::new();
                let tables = [(&elf.syms, &elf.strtab), (&elf.dynsyms, &elf.dynstrtab)];
                for (syms, strtab) in tables {
                    for sym in syms.iter() {
                        let Some(name) = strtab.get_at(sym.st_name) else { continue };
                        let Some(parsed) = dispatch_table_name(name) else { continue };
                        let Some(section) = elf.section_headers.get(sym.st_shndx) else { continue };
                        let Some(offset) = sym.st_value.checked_sub(section.sh_addr) else { continue };

                        let symbol = DispatchSymbol::new(&parsed.class, sym.st_shndx as u16, offset);
                        if !symbols.contains(&symbol) {
                            symbols.push(symbol);
                        }
                    }
                }
                (sections, symbols, true)
            }
            Object::PE(pe) => {
                // PE section numbers are 1-based, matching debug-info section indices.
                let sections: Vec<SectionHeader> = pe
                    .sections
                    .iter()
                    .enumerate()
                    .map(|(i, s)| {
                        let name = s.name().unwrap_or("");
                        SectionHeader::new((i + 1) as u16, name, u64::from(s.virtual_address), u64::from(s.virtual_size))
                    })
                    .collect();

                let mut symbols = Vec::new();
                for export in &pe.exports {
                    let Some(parsed) = export.name.and_then(dispatch_table_name) else { continue };
                    let rva = export.rva as u64;
                    let Some(section) = sections
                        .iter()
                        .find(|s| rva >= s.relative_base && rva - s.relative_base < s.size.max(1))
                    else {
                        continue;
                    };

                    let mut symbol = DispatchSymbol::new(&parsed.class, section.index, rva - section.relative_base);
                    if let Some(base) = parsed.for_base.as_deref() {
                        symbol = symbol.with_for_base(base);
                    }
                    symbols.push(symbol);
                }
                (sections, symbols, false)
            }
            _ => return Err(SymbolError::ParseError("only ELF and PE images are supported".to_string())),
        };

        log::debug!("{}: {} sections, {} dispatch symbols", module, sections.len(), symbols.len());
        Ok(Self {
            module: module.to_string(),
            sections,
            symbols,
            itanium,
            fingerprint: Fingerprint::of_bytes(bytes),
        })
    }

    pub fn is_itanium(&self) -> bool {
        self.itanium
    }

    fn check_module(&self, module: &str) -> Result<(), SymbolError> {
        if self.module == module {
            Ok(())
        } else {
            Err(SymbolError::UnknownModule(module.to_string()))
        }
    }
}

impl DebugInfoProvider for ObjectProvider {
    fn list_dispatch_symbols(&self, module: &str) -> Result<Vec<DispatchSymbol>, SymbolError> {
        self.check_module(module)?;
        Ok(self.symbols.clone())
    }

    fn list_sections(&self, module: &str) -> Result<Vec<SectionHeader>, SymbolError> {
        self.check_module(module)?;
        Ok(self.sections.clone())
    }

    fn list_type_records(&self, module: &str) -> Result<Vec<TypeRecord>, SymbolError> {
        self.check_module(module)?;
        Ok(Vec::new())
    }

    fn fingerprint(&self, module: &str) -> Result<Option<Fingerprint>, SymbolError> {
        self.check_module(module)?;
        Ok(Some(self.fingerprint.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_garbage() {
        assert!(ObjectProvider::parse(b"definitely not an object file", "x").is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_reads_running_test_binary() {
        let exe = std::env::current_exe().unwrap();
        let provider = ObjectProvider::open(&exe, "self").unwrap();
        let sections = provider.list_sections("self").unwrap();
        assert!(sections.iter().any(|s| s.name == ".text"));
        assert!(provider.list_type_records("self").unwrap().is_empty());
        assert!(provider.list_sections("other").is_err());

        assert!(provider.is_itanium());
        let expected = crate::table::Fingerprint::of_file(&exe).unwrap();
        assert_eq!(provider.fingerprint("self").unwrap(), Some(expected));
    }
}
