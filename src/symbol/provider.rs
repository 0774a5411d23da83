// Thu Jan 22 2026 - Alex

use crate::symbol::{DispatchSymbol, SectionHeader, SymbolError, TypeRecord};
use crate::table::Fingerprint;
use serde::{Deserialize, Serialize};

/// Source of raw debug-info records for one module.
pub trait DebugInfoProvider: Send + Sync {
    fn list_dispatch_symbols(&self, module: &str) -> Result<Vec<DispatchSymbol>, SymbolError>;
    fn list_sections(&self, module: &str) -> Result<Vec<SectionHeader>, SymbolError>;
    fn list_type_records(&self, module: &str) -> Result<Vec<TypeRecord>, SymbolError>;

    /// Identity of the module build the records describe, if the source knows it.
    fn fingerprint(&self, _module: &str) -> Result<Option<Fingerprint>, SymbolError> {
        Ok(None)
    }
}

/// Fully materialized records of one module.
///
/// This is also the on-disk shape of a JSON record dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub module: String,
    #[serde(default)]
    pub sections: Vec<SectionHeader>,
    #[serde(default)]
    pub dispatch_symbols: Vec<DispatchSymbol>,
    #[serde(default)]
    pub types: Vec<TypeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
}

impl RecordSet {
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            ..Self::default()
        }
    }

    pub fn with_section(mut self, section: SectionHeader) -> Self {
        self.sections.push(section);
        self
    }

    pub fn with_symbol(mut self, symbol: DispatchSymbol) -> Self {
        self.dispatch_symbols.push(symbol);
        self
    }

    pub fn with_type(mut self, record: TypeRecord) -> Self {
        self.types.push(record);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Snapshots every list a provider offers for `module`.
    pub fn collect(provider: &dyn DebugInfoProvider, module: &str) -> Result<Self, SymbolError> {
        Ok(Self {
            module: module.to_string(),
            sections: provider.list_sections(module)?,
            dispatch_symbols: provider.list_dispatch_symbols(module)?,
            types: provider.list_type_records(module)?,
            fingerprint: provider.fingerprint(module)?,
        })
    }

    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, SymbolError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn check_module(&self, module: &str) -> Result<(), SymbolError> {
        if self.module == module {
            Ok(())
        } else {
            Err(SymbolError::UnknownModule(module.to_string()))
        }
    }
}

impl DebugInfoProvider for RecordSet {
    fn list_dispatch_symbols(&self, module: &str) -> Result<Vec<DispatchSymbol>, SymbolError> {
        self.check_module(module)?;
        Ok(self.dispatch_symbols.clone())
    }

    fn list_sections(&self, module: &str) -> Result<Vec<SectionHeader>, SymbolError> {
        self.check_module(module)?;
        Ok(self.sections.clone())
    }

    fn list_type_records(&self, module: &str) -> Result<Vec<TypeRecord>, SymbolError> {
        self.check_module(module)?;
        Ok(self.types.clone())
    }

    fn fingerprint(&self, module: &str) -> Result<Option<Fingerprint>, SymbolError> {
        self.check_module(module)?;
        Ok(self.fingerprint.clone())
    }
}

/// Takes sections and dispatch symbols from one provider and type records from another,
/// e.g. an object file paired with a type dump.
pub struct SplitProvider<'a> {
    pub layout: &'a dyn DebugInfoProvider,
    pub types: &'a dyn DebugInfoProvider,
}

impl DebugInfoProvider for SplitProvider<'_> {
    fn list_dispatch_symbols(&self, module: &str) -> Result<Vec<DispatchSymbol>, SymbolError> {
        self.layout.list_dispatch_symbols(module)
    }

    fn list_sections(&self, module: &str) -> Result<Vec<SectionHeader>, SymbolError> {
        self.layout.list_sections(module)
    }

    fn list_type_records(&self, module: &str) -> Result<Vec<TypeRecord>, SymbolError> {
        self.types.list_type_records(module)
    }

    /// The image's identity wins over whatever the type dump recorded.
    fn fingerprint(&self, module: &str) -> Result<Option<Fingerprint>, SymbolError> {
        match self.layout.fingerprint(module)? {
            Some(fingerprint) => Ok(Some(fingerprint)),
            None => self.types.fingerprint(module),
        }
    }
}
