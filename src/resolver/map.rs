// Thu Jan 29 2026 - Alex

use crate::catalog::{LayoutConvention, SlotPosition};
use crate::memory::{Address, MemoryError, MemoryReader};
use crate::resolver::{ModuleRecord, Resolution, ResolverError};
use parking_lot::RwLock;
use std::sync::Arc;

/// Load range to per-module table.
///
/// Readers take the lock only long enough to clone the current snapshot, so
/// lookups never wait on each other and a concurrent attach or detach only
/// affects lookups that start after it.
#[derive(Debug, Default)]
pub struct ModuleMap {
    modules: RwLock<Arc<Vec<ModuleRecord>>>,
}

impl ModuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module. A record with the same name replaces the old one, which
    /// covers a module reloaded at a different base.
    pub fn attach(&self, record: ModuleRecord) -> Result<(), ResolverError> {
        if record.size == 0 {
            return Err(ResolverError::EmptyRange(record.name));
        }

        let mut guard = self.modules.write();
        let mut modules: Vec<ModuleRecord> = guard.iter().filter(|m| m.name != record.name).cloned().collect();

        if let Some(other) = modules.iter().find(|m| m.overlaps(&record)) {
            return Err(ResolverError::Overlap {
                module: record.name.clone(),
                base: record.load_base,
                other: other.name.clone(),
            });
        }

        log::debug!("attached {} ({} dispatch entries)", record, record.table.dispatch.len());
        modules.push(record);
        modules.sort_by_key(|m| m.load_base);
        *guard = Arc::new(modules);
        Ok(())
    }

    pub fn detach(&self, name: &str) -> Option<ModuleRecord> {
        let mut guard = self.modules.write();
        let position = guard.iter().position(|m| m.name == name)?;
        let mut modules: Vec<ModuleRecord> = (**guard).clone();
        let removed = modules.remove(position);
        *guard = Arc::new(modules);
        log::debug!("detached {}", removed);
        Some(removed)
    }

    pub fn snapshot(&self) -> Arc<Vec<ModuleRecord>> {
        Arc::clone(&self.modules.read())
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }

    pub fn module_containing(&self, addr: Address) -> Option<ModuleRecord> {
        let modules = self.snapshot();
        let after = modules.partition_point(|m| m.load_base <= addr);
        let candidate = modules.get(after.checked_sub(1)?)?;
        candidate.contains(addr).then(|| candidate.clone())
    }

    /// Looks `dispatch` up in whichever tracked module contains it.
    pub fn resolve(&self, dispatch: Address) -> Resolution {
        match self.module_containing(dispatch) {
            Some(module) => lookup(&module, dispatch),
            None => Resolution::Unresolved,
        }
    }

    /// Looks `dispatch` up in the module loaded at `base`.
    pub fn resolve_in(&self, dispatch: Address, base: Address) -> Resolution {
        let modules = self.snapshot();
        match modules.iter().find(|m| m.load_base == base) {
            Some(module) => lookup(module, dispatch),
            None => Resolution::Unresolved,
        }
    }

    /// Reads the dispatch pointer out of a live object and resolves it.
    /// `declared_size` is the static size of the pointer's declared type,
    /// needed to find a back-placed slot.
    pub fn resolve_object(
        &self,
        reader: &dyn MemoryReader,
        object: Address,
        convention: LayoutConvention,
        declared_size: u64,
    ) -> Result<Resolution, MemoryError> {
        let slot = match convention.dispatch_slot {
            SlotPosition::Front => object,
            SlotPosition::Back => {
                let (offset, _) = convention.slot_range(declared_size);
                object.checked_add(offset).ok_or(MemoryError::ReadFailed(object.as_u64()))?
            }
        };
        let dispatch = reader.read_ptr(slot, convention.pointer_width as usize)?;
        Ok(self.resolve(dispatch))
    }
}

fn lookup(module: &ModuleRecord, dispatch: Address) -> Resolution {
    let Some(relative) = dispatch.relative_to(module.load_base) else {
        return Resolution::Unresolved;
    };
    match module.table.dispatch.lookup(relative) {
        Some(entry) => Resolution::Resolved { size: entry.size, type_index: entry.type_index },
        None => Resolution::Unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{TypeCatalog, TypeDescriptor, TypeIndex};
    use crate::memory::SnapshotMemory;
    use crate::table::{DispatchEntry, DispatchTable, TableFile};

    fn table(module: &str) -> Arc<TableFile> {
        let catalog = TypeCatalog::from_descriptors(
            LayoutConvention::default(),
            vec![TypeDescriptor::new(TypeIndex(0), "A", 16), TypeDescriptor::new(TypeIndex(1), "B", 24)],
        )
        .unwrap();
        let dispatch = DispatchTable::new(vec![
            DispatchEntry::new(0x5100, TypeIndex(0), 16),
            DispatchEntry::new(0x5200, TypeIndex(1), 24),
        ]);
        Arc::new(TableFile::new(module, catalog, dispatch))
    }

    fn map() -> ModuleMap {
        let map = ModuleMap::new();
        map.attach(ModuleRecord::new("game.exe", Address::new(0x140000000), 0x10000, table("game.exe")))
            .unwrap();
        map.attach(ModuleRecord::new("tools.dll", Address::new(0x7ff000000), 0x8000, table("tools.dll")))
            .unwrap();
        map
    }

    #[test]
    fn test_resolve_subclass_through_base_pointer() {
        let map = map();
        let resolved = map.resolve(Address::new(0x140005200));
        assert_eq!(resolved, Resolution::Resolved { size: 24, type_index: TypeIndex(1) });
        assert_eq!(map.resolve_in(Address::new(0x140005200), Address::new(0x140000000)), resolved);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let map = map();
        let ptr = Address::new(0x7ff005100);
        assert_eq!(map.resolve(ptr), map.resolve(ptr));
        assert_eq!(map.resolve_in(ptr, Address::new(0x7ff000000)), map.resolve_in(ptr, Address::new(0x7ff000000)));
    }

    #[test]
    fn test_miss_falls_back_to_static_size() {
        let map = map();
        let resolution = map.resolve(Address::new(0x140005300));
        assert_eq!(resolution, Resolution::Unresolved);
        assert_eq!(resolution.or_fallback(16), (16, TypeIndex::UNKNOWN));

        assert_eq!(map.resolve(Address::new(0x1000)), Resolution::Unresolved);
        assert_eq!(map.resolve_in(Address::new(0x140005100), Address::new(0x150000000)), Resolution::Unresolved);
        assert_eq!(map.resolve_in(Address::new(0x100), Address::new(0x140000000)), Resolution::Unresolved);
    }

    #[test]
    fn test_attach_replaces_and_rejects_overlap() {
        let map = map();
        map.attach(ModuleRecord::new("game.exe", Address::new(0x150000000), 0x10000, table("game.exe")))
            .unwrap();
        assert_eq!(map.len(), 2);
        assert!(!map.resolve(Address::new(0x140005100)).is_resolved());
        assert!(map.resolve(Address::new(0x150005100)).is_resolved());

        let overlapping = ModuleRecord::new("other.dll", Address::new(0x7ff004000), 0x8000, table("other.dll"));
        assert!(matches!(map.attach(overlapping), Err(ResolverError::Overlap { .. })));

        let empty = ModuleRecord::new("empty.dll", Address::new(0x1000), 0, table("empty.dll"));
        assert!(map.attach(empty).is_err());
    }

    #[test]
    fn test_detach() {
        let map = map();
        assert!(map.detach("tools.dll").is_some());
        assert!(map.detach("tools.dll").is_none());
        assert_eq!(map.resolve(Address::new(0x7ff005100)), Resolution::Unresolved);
    }

    #[test]
    fn test_snapshot_survives_detach() {
        let map = map();
        let snapshot = map.snapshot();
        map.detach("game.exe");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_resolve_object_reads_front_slot() {
        let map = map();
        let mut memory = SnapshotMemory::zeroed(Address::new(0x20000), 32);
        memory.put(Address::new(0x20000), &0x140005200u64.to_le_bytes()).unwrap();

        let resolution = map
            .resolve_object(&memory, Address::new(0x20000), LayoutConvention::default(), 16)
            .unwrap();
        assert_eq!(resolution.or_fallback(16), (24, TypeIndex(1)));
    }

    #[test]
    fn test_resolve_object_reads_back_slot() {
        let map = map();
        let mut memory = SnapshotMemory::zeroed(Address::new(0x20000), 32);
        memory.put(Address::new(0x20008), &0x140005100u64.to_le_bytes()).unwrap();

        let convention = LayoutConvention::new(SlotPosition::Back, 8);
        let resolution = map.resolve_object(&memory, Address::new(0x20000), convention, 16).unwrap();
        assert_eq!(resolution, Resolution::Resolved { size: 16, type_index: TypeIndex(0) });
    }
    #[test]
    fn test_resolve_during_reattach() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let catalog = TypeCatalog::from_descriptors(
            LayoutConvention::default(),
            vec![TypeDescriptor::new(TypeIndex(0), "A", 16), TypeDescriptor::new(TypeIndex(1), "B", 24)],
        )
        .unwrap();
        let rebuilt = Arc::new(TableFile::new(
            "game.exe",
            catalog,
            DispatchTable::new(vec![DispatchEntry::new(0x5100, TypeIndex(1), 24)]),
        ));
        let base = Address::new(0x140000000);
        let old = Resolution::Resolved { size: 16, type_index: TypeIndex(0) };
        let new = Resolution::Resolved { size: 24, type_index: TypeIndex(1) };

        let map = ModuleMap::new();
        map.attach(ModuleRecord::new("game.exe", base, 0x10000, table("game.exe"))).unwrap();
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        let mut seen = 0usize;
                        loop {
                            let resolution = map.resolve(Address::new(0x140005100));
                            assert!(
                                resolution == old || resolution == new || resolution == Resolution::Unresolved,
                                "torn resolution {:?}",
                                resolution
                            );
                            seen += 1;
                            if done.load(Ordering::Acquire) {
                                break seen;
                            }
                        }
                    })
                })
                .collect();

            for round in 0..500 {
                let next = if round % 2 == 0 { rebuilt.clone() } else { table("game.exe") };
                if round % 7 == 0 {
                    map.detach("game.exe");
                }
                map.attach(ModuleRecord::new("game.exe", base, 0x10000, next)).unwrap();
            }
            done.store(true, Ordering::Release);

            for reader in readers {
                assert!(reader.join().unwrap() > 0);
            }
        });

        assert_eq!(map.len(), 1);
        assert_eq!(map.resolve(Address::new(0x140005100)), old);
    }
}
