// Mon Jan 26 2026 - Alex

use crate::catalog::CatalogError;
use crate::symbol::SymbolError;
use itertools::Itertools;
use std::fmt;
use thiserror::Error;

/// A per-symbol or per-type problem. The offending item is dropped and the
/// build carries on; these end up in a [`BuildReport`], never abort a bake.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("dispatch symbol {symbol}: no section {section_index} containing offset 0x{offset:X}")]
    NoMatchingSection { symbol: String, section_index: u16, offset: u64 },
    #[error("dispatch symbol {class} is a secondary table for base {base}")]
    SecondaryDispatchTable { class: String, base: String },
    #[error("dispatch symbol {name} has no class in the catalog")]
    UnknownDispatchClass { name: String },
    #[error("dispatch address 0x{rva:X} claimed by both {kept} and {dropped}")]
    DuplicateDispatchAddress { rva: u64, kept: String, dropped: String },
    #[error("forward reference {name} has no complete definition")]
    UnresolvedForwardReference { name: String },
    #[error("scoped type {name} skipped")]
    ScopedType { name: String },
    #[error("unnamed type {name} skipped")]
    UnnamedType { name: String },
    #[error("{name}: conflicting definitions ({kept_size} kept, {dropped_size} dropped)")]
    ConflictingDefinition { name: String, kept_size: u64, dropped_size: u64 },
    #[error("{name}: another class already uses this name")]
    DuplicateName { name: String },
    #[error("{name}: field list 0x{field_list:X} missing")]
    MissingFieldList { name: String, field_list: u32 },
    #[error("{class}.{field}: type size unknown, width taken from layout gap")]
    UnsizedField { class: String, field: String },
    #[error("{class}: base 0x{base:X} has no known size")]
    UnsizedBase { class: String, base: u32 },
    #[error("{class}: virtual base ignored")]
    VirtualBaseIgnored { class: String },
    #[error("invalid layout: {0}")]
    InvalidLayout(CatalogError),
}

impl BuildError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoMatchingSection { .. } => "no matching section",
            Self::SecondaryDispatchTable { .. } => "secondary dispatch table",
            Self::UnknownDispatchClass { .. } => "unknown dispatch class",
            Self::DuplicateDispatchAddress { .. } => "duplicate dispatch address",
            Self::UnresolvedForwardReference { .. } => "unresolved forward reference",
            Self::ScopedType { .. } => "scoped type",
            Self::UnnamedType { .. } => "unnamed type",
            Self::ConflictingDefinition { .. } => "conflicting definition",
            Self::DuplicateName { .. } => "duplicate name",
            Self::MissingFieldList { .. } => "missing field list",
            Self::UnsizedField { .. } => "unsized field",
            Self::UnsizedBase { .. } => "unsized base",
            Self::VirtualBaseIgnored { .. } => "virtual base",
            Self::InvalidLayout(_) => "invalid layout",
        }
    }
}

/// Fatal failures: the build produced nothing.
#[derive(Error, Debug)]
pub enum BakeError {
    #[error("debug info provider failed: {0}")]
    Provider(#[from] SymbolError),
    #[error("catalog assembly failed: {0}")]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    diagnostics: Vec<BuildError>,
}

impl BuildReport {
    pub fn record(&mut self, diagnostic: BuildError) {
        log::debug!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[BuildError] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn count_by_kind(&self) -> Vec<(&'static str, usize)> {
        self.diagnostics
            .iter()
            .map(BuildError::kind)
            .sorted()
            .dedup_with_count()
            .map(|(count, kind)| (kind, count))
            .collect()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (kind, count) in self.count_by_kind() {
            writeln!(f, "{:>6} x {}", count, kind)?;
        }
        Ok(())
    }
}
