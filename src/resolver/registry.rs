// Fri Jan 30 2026 - Alex

use crate::resolver::{LoadedModule, ModuleMap, ModuleRecord, ModuleTracker, ResolverError};
use crate::table::{Fingerprint, TableFile, TableError};
use ahash::{AHashMap, AHashSet};
use std::path::Path;
use std::sync::Arc;

/// Baked tables by module name, loaded once at start-up.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: AHashMap<String, Arc<TableFile>>,
}

/// What a [`TableRegistry::sync`] pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub attached: Vec<String>,
    pub detached: Vec<String>,
    /// Loaded modules with no table. Their pointers stay unresolved.
    pub untracked: Vec<String>,
    /// Tables baked from a different build than the one loaded.
    pub stale: Vec<String>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every `*.vtables.json` in `dir`. Unreadable tables are logged and skipped.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, ResolverError> {
        let mut registry = Self::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let is_table = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.ends_with(crate::table::file::TABLE_EXTENSION));
            if !is_table {
                continue;
            }
            match TableFile::read(&path) {
                Ok(table) => registry.insert(table),
                Err(err) => log::warn!("skipping {}: {}", path.display(), err),
            }
        }
        log::info!("loaded {} tables from {}", registry.len(), dir.as_ref().display());
        Ok(registry)
    }

    pub fn insert(&mut self, table: TableFile) {
        self.tables.insert(table.module().to_string(), Arc::new(table));
    }

    pub fn get(&self, module: &str) -> Option<Arc<TableFile>> {
        self.tables.get(module).cloned()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Brings `map` in line with what `tracker` reports as loaded.
    pub fn sync(&self, map: &ModuleMap, tracker: &dyn ModuleTracker) -> Result<SyncSummary, ResolverError> {
        let loaded = tracker.current_modules()?;
        let mut summary = SyncSummary::default();
        let present: AHashSet<&str> = loaded.iter().map(|m| m.name.as_str()).collect();

        for record in map.snapshot().iter() {
            if !present.contains(record.name.as_str()) {
                map.detach(&record.name);
                summary.detached.push(record.name.clone());
            }
        }

        for module in &loaded {
            let Some(table) = self.get(&module.name) else {
                log::warn!("{} has no baked table; its objects fall back to static sizes", module.name);
                summary.untracked.push(module.name.clone());
                continue;
            };

            if let Err(err) = check_fresh(&table, module) {
                log::warn!("{}", err);
                summary.stale.push(module.name.clone());
                continue;
            }

            let current = map.snapshot();
            let unchanged = current
                .iter()
                .any(|m| m.name == module.name && m.load_base == module.load_base && m.size == module.size);
            if unchanged {
                continue;
            }

            map.attach(ModuleRecord::new(&module.name, module.load_base, module.size, table))?;
            summary.attached.push(module.name.clone());
        }

        Ok(summary)
    }
}

/// Modules with a known file must match the table's recorded build.
/// Without a file there is nothing to compare, as with a hand-built tracker.
fn check_fresh(table: &TableFile, module: &LoadedModule) -> Result<(), TableError> {
    let Some(path) = &module.path else {
        return Ok(());
    };
    table.check_fingerprint(&Fingerprint::of_file(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LayoutConvention, TypeCatalog, TypeDescriptor, TypeIndex};
    use crate::memory::Address;
    use crate::resolver::{Resolution, StaticTracker};
    use crate::table::{DispatchEntry, DispatchTable, FingerprintKind};

    fn table(module: &str) -> TableFile {
        let catalog = TypeCatalog::from_descriptors(
            LayoutConvention::default(),
            vec![TypeDescriptor::new(TypeIndex(0), "A", 16)],
        )
        .unwrap();
        TableFile::new(module, catalog, DispatchTable::new(vec![DispatchEntry::new(0x100, TypeIndex(0), 16)]))
    }

    #[test]
    fn test_sync_attaches_and_reports_untracked() {
        let mut registry = TableRegistry::new();
        registry.insert(table("game.exe"));

        let tracker = StaticTracker::new(vec![
            LoadedModule::new("game.exe", Address::new(0x400000), 0x1000),
            LoadedModule::new("thirdparty.dll", Address::new(0x800000), 0x1000),
        ]);
        let map = ModuleMap::new();
        let summary = registry.sync(&map, &tracker).unwrap();

        assert_eq!(summary.attached, vec!["game.exe".to_string()]);
        assert_eq!(summary.untracked, vec!["thirdparty.dll".to_string()]);
        assert!(map.resolve(Address::new(0x400100)).is_resolved());
        assert_eq!(map.resolve(Address::new(0x800100)), Resolution::Unresolved);

        let again = registry.sync(&map, &tracker).unwrap();
        assert!(again.attached.is_empty());
    }

    #[test]
    fn test_sync_detaches_unloaded() {
        let mut registry = TableRegistry::new();
        registry.insert(table("game.exe"));
        let map = ModuleMap::new();

        let loaded = StaticTracker::new(vec![LoadedModule::new("game.exe", Address::new(0x400000), 0x1000)]);
        registry.sync(&map, &loaded).unwrap();

        let summary = registry.sync(&map, &StaticTracker::default()).unwrap();
        assert_eq!(summary.detached, vec!["game.exe".to_string()]);
        assert!(map.is_empty());
    }

    #[test]
    fn test_sync_skips_stale_table() {
        let path = std::env::temp_dir().join(format!("vtable_baker_stale_{}.so", std::process::id()));
        std::fs::write(&path, b"current build").unwrap();

        let mut registry = TableRegistry::new();
        registry.insert(table("game.so").with_fingerprint(Fingerprint::new(FingerprintKind::Content, "0")));
        let tracker =
            StaticTracker::new(vec![LoadedModule::new("game.so", Address::new(0x400000), 0x1000).with_path(&path)]);

        let map = ModuleMap::new();
        let summary = registry.sync(&map, &tracker).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(summary.stale, vec!["game.so".to_string()]);
        assert!(map.is_empty());
    }

    /// `Actor { vptr; }` with its dispatch table at section 1 + 0x40.
    fn baked(fingerprint: Option<Fingerprint>) -> TableFile {
        use crate::builder::{BuildOptions, MetadataBuilder};
        use crate::symbol::{ClassRecord, DispatchSymbol, MemberRecord, RecordSet, SectionHeader, TypeRecord};

        let mut set = RecordSet::new("game.so")
            .with_section(SectionHeader::new(1, ".data.rel.ro", 0x2000, 0x1000))
            .with_symbol(DispatchSymbol::new("Actor", 1, 0x40))
            .with_type(TypeRecord::FieldList { index: 0x1000, members: vec![MemberRecord::DispatchPointer] })
            .with_type(TypeRecord::Class(ClassRecord::definition(0x1001, "Actor", 8, 0x1000)));
        set.fingerprint = fingerprint;

        let builder = MetadataBuilder::new(LayoutConvention::default(), BuildOptions::default());
        TableFile::from_output(builder.build(&set, "game.so").unwrap())
    }

    #[test]
    fn test_sync_rejects_table_without_fingerprint() {
        let path = std::env::temp_dir().join(format!("vtable_baker_unfingerprinted_{}.so", std::process::id()));
        std::fs::write(&path, b"some other build").unwrap();

        let mut registry = TableRegistry::new();
        registry.insert(baked(None));
        let tracker =
            StaticTracker::new(vec![LoadedModule::new("game.so", Address::new(0x400000), 0x4000).with_path(&path)]);

        let map = ModuleMap::new();
        let summary = registry.sync(&map, &tracker).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(summary.stale, vec!["game.so".to_string()]);
        assert!(summary.attached.is_empty());
        assert_eq!(map.resolve(Address::new(0x402040)), Resolution::Unresolved);
    }

    #[test]
    fn test_sync_matches_baked_fingerprint() {
        let dir = std::env::temp_dir().join(format!("vtable_baker_builds_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let (baked_from, rebuilt) = (dir.join("game.so"), dir.join("game-new.so"));
        std::fs::write(&baked_from, b"build 1").unwrap();
        std::fs::write(&rebuilt, b"build 2").unwrap();

        let mut registry = TableRegistry::new();
        registry.insert(baked(Some(Fingerprint::of_file(&baked_from).unwrap())));
        let loaded = |path: &Path| {
            StaticTracker::new(vec![LoadedModule::new("game.so", Address::new(0x400000), 0x4000).with_path(path)])
        };

        let map = ModuleMap::new();
        let stale = registry.sync(&map, &loaded(rebuilt.as_path())).unwrap();
        let fresh = registry.sync(&map, &loaded(baked_from.as_path())).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(stale.stale, vec!["game.so".to_string()]);
        assert_eq!(fresh.attached, vec!["game.so".to_string()]);
        assert!(map.resolve(Address::new(0x402040)).is_resolved());
    }

    #[test]
    fn test_load_dir() {
        let dir = std::env::temp_dir().join(format!("vtable_baker_registry_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        table("game.exe").write_atomic(TableFile::path_for(&dir, "game.exe")).unwrap();
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();
        std::fs::write(dir.join("broken.vtables.json"), b"{").unwrap();

        let registry = TableRegistry::load_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(registry.len(), 1);
        assert!(registry.get("game.exe").is_some());
    }
}
