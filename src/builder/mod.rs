// Mon Jan 26 2026 - Alex

pub mod error;
pub mod resolve;
pub mod sections;

pub use error::{BakeError, BuildError, BuildReport};
pub use resolve::TypeResolver;
pub use sections::SectionMap;

use crate::catalog::{LayoutConvention, TypeCatalog};
use crate::symbol::{DebugInfoProvider, DispatchSymbol, SectionHeader, TypeRecord};
use crate::table::{DispatchEntry, DispatchTable, Fingerprint};
use ahash::AHashMap;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Added to every dispatch symbol address, e.g. to reach an Itanium address point.
    pub dispatch_symbol_bias: u64,
    /// Drop tables emitted for non-primary bases; their pointers address a subobject.
    pub skip_secondary_tables: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { dispatch_symbol_bias: 0, skip_secondary_tables: true }
    }
}

/// Result of baking one module.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub module: String,
    pub catalog: TypeCatalog,
    pub dispatch: DispatchTable,
    pub report: BuildReport,
    /// Build identity reported by the provider, `None` when it has none.
    pub fingerprint: Option<Fingerprint>,
}

pub struct MetadataBuilder {
    convention: LayoutConvention,
    options: BuildOptions,
}

impl MetadataBuilder {
    pub fn new(convention: LayoutConvention, options: BuildOptions) -> Self {
        Self { convention, options }
    }

    pub fn options(&self) -> BuildOptions {
        self.options
    }

    pub fn convention(&self) -> LayoutConvention {
        self.convention
    }

    pub fn build(&self, provider: &dyn DebugInfoProvider, module: &str) -> Result<BuildOutput, BakeError> {
        let sections = provider.list_sections(module)?;
        let symbols = provider.list_dispatch_symbols(module)?;
        let records = provider.list_type_records(module)?;
        let fingerprint = provider.fingerprint(module)?;
        let mut output = self.build_from_records(module, &sections, &symbols, &records)?;
        output.fingerprint = fingerprint;
        Ok(output)
    }

    /// Bakes independent modules in parallel. Results keep the input order.
    pub fn build_many(&self, jobs: &[(&dyn DebugInfoProvider, &str)]) -> Vec<Result<BuildOutput, BakeError>> {
        jobs.par_iter().map(|(provider, module)| self.build(*provider, module)).collect()
    }

    pub fn build_from_records(
        &self,
        module: &str,
        sections: &[SectionHeader],
        symbols: &[DispatchSymbol],
        records: &[TypeRecord],
    ) -> Result<BuildOutput, BakeError> {
        let mut report = BuildReport::default();

        let addresses = self.resolve_symbols(sections, symbols, &mut report);
        let catalog = TypeResolver::new(self.convention, records, &mut report).resolve(&mut report)?;
        let dispatch = self.join(&catalog, addresses, &mut report);

        log::info!(
            "{}: {} types, {} dispatch entries, {} diagnostics",
            module,
            catalog.len(),
            dispatch.len(),
            report.len()
        );

        Ok(BuildOutput { module: module.to_string(), catalog, dispatch, report, fingerprint: None })
    }

    fn resolve_symbols<'s>(
        &self,
        sections: &[SectionHeader],
        symbols: &'s [DispatchSymbol],
        report: &mut BuildReport,
    ) -> Vec<(&'s str, u64)> {
        let map = SectionMap::new(sections);
        let mut addresses = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            if let (Some(base), true) = (&symbol.for_base, self.options.skip_secondary_tables) {
                report.record(BuildError::SecondaryDispatchTable { class: symbol.name.clone(), base: base.clone() });
                continue;
            }
            match map.relative_address(symbol, self.options.dispatch_symbol_bias) {
                Ok(rva) => addresses.push((symbol.name.as_str(), rva)),
                Err(err) => report.record(err),
            }
        }

        addresses
    }

    fn join(&self, catalog: &TypeCatalog, addresses: Vec<(&str, u64)>, report: &mut BuildReport) -> DispatchTable {
        let mut claimed: AHashMap<u64, &str> = AHashMap::with_capacity(addresses.len());
        let mut entries = Vec::with_capacity(addresses.len());

        for (name, rva) in addresses {
            let Some(desc) = catalog.find_by_name(name) else {
                report.record(BuildError::UnknownDispatchClass { name: name.to_string() });
                continue;
            };

            if let Some(kept) = claimed.get(&rva) {
                if *kept != name {
                    report.record(BuildError::DuplicateDispatchAddress {
                        rva,
                        kept: kept.to_string(),
                        dropped: name.to_string(),
                    });
                }
                continue;
            }

            claimed.insert(rva, name);
            entries.push(DispatchEntry::new(rva, desc.index, desc.size));
        }

        DispatchTable::new(entries)
    }
}
