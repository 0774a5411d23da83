// Wed Jan 28 2026 - Alex

use crate::builder::BuildOutput;
use crate::catalog::TypeCatalog;
use crate::table::{DispatchTable, Fingerprint, TableError};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const TABLE_MAGIC: &str = "vtable-baker";
pub const FORMAT_VERSION: u32 = 1;
pub const TABLE_EXTENSION: &str = "vtables.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHeader {
    pub magic: String,
    pub format_version: u32,
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    /// Unix seconds.
    #[serde(default)]
    pub generated_at: u64,
}

/// Everything the runtime needs for one module: the type catalog plus the
/// dispatch table mapping its dispatch addresses into that catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFile {
    pub header: TableHeader,
    pub catalog: TypeCatalog,
    pub dispatch: DispatchTable,
}

impl TableFile {
    pub fn new(module: &str, catalog: TypeCatalog, dispatch: DispatchTable) -> Self {
        let generated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            header: TableHeader {
                magic: TABLE_MAGIC.to_string(),
                format_version: FORMAT_VERSION,
                module: module.to_string(),
                fingerprint: None,
                generated_at,
            },
            catalog,
            dispatch,
        }
    }

    pub fn from_output(output: BuildOutput) -> Self {
        let mut table = Self::new(&output.module, output.catalog, output.dispatch);
        table.header.fingerprint = output.fingerprint;
        table
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.header.fingerprint = Some(fingerprint);
        self
    }

    pub fn module(&self) -> &str {
        &self.header.module
    }

    /// `<dir>/<module>.vtables.json`
    pub fn path_for(dir: &Path, module: &str) -> PathBuf {
        dir.join(format!("{}.{}", module, TABLE_EXTENSION))
    }

    /// Writes next to `path` and renames over it, so readers only ever see a
    /// complete previous or complete new table.
    pub fn write_atomic<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let result = (|| -> Result<(), TableError> {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            Ok(())
        })();

        if let Err(err) = result {
            fs::remove_file(&tmp).ok();
            return Err(err);
        }

        fs::rename(&tmp, path)?;
        log::debug!("wrote {} ({} entries) to {}", self.module(), self.dispatch.len(), path.display());
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = File::open(path.as_ref())?;
        let table: TableFile = serde_json::from_reader(BufReader::new(file))?;

        if table.header.magic != TABLE_MAGIC {
            return Err(TableError::BadMagic(table.header.magic));
        }
        if table.header.format_version != FORMAT_VERSION {
            return Err(TableError::UnsupportedVersion(table.header.format_version));
        }
        table.check_consistency()?;
        Ok(table)
    }

    /// Every dispatch entry must name a catalog type of the same size.
    pub fn check_consistency(&self) -> Result<(), TableError> {
        for entry in self.dispatch.entries() {
            let reason = match self.catalog.get(entry.type_index) {
                None => format!("{} names a type outside the catalog", entry),
                Some(desc) if desc.size != entry.size => {
                    format!("{} but {} is {} bytes", entry, desc.name, desc.size)
                }
                Some(_) => continue,
            };
            return Err(TableError::Inconsistent { module: self.module().to_string(), reason });
        }
        Ok(())
    }

    /// Fails when the table was baked for a different build of the module,
    /// or records no build at all and so cannot be matched against one.
    pub fn check_fingerprint(&self, actual: &Fingerprint) -> Result<(), TableError> {
        match &self.header.fingerprint {
            Some(expected) if expected == actual => Ok(()),
            Some(expected) => Err(TableError::Stale {
                module: self.module().to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            }),
            None => Err(TableError::Unfingerprinted(self.module().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LayoutConvention, TypeDescriptor, TypeIndex};
    use crate::table::{DispatchEntry, FingerprintKind};

    fn sample() -> TableFile {
        let catalog = TypeCatalog::from_descriptors(
            LayoutConvention::default(),
            vec![TypeDescriptor::new(TypeIndex(0), "A", 16), TypeDescriptor::new(TypeIndex(1), "B", 24)],
        )
        .unwrap();
        let dispatch = DispatchTable::new(vec![
            DispatchEntry::new(0x5100, TypeIndex(0), 16),
            DispatchEntry::new(0x5200, TypeIndex(1), 24),
        ]);
        TableFile::new("game.exe", catalog, dispatch)
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vtable_baker_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_write_and_read() {
        let path = temp_path("rw.vtables.json");
        let table = sample().with_fingerprint(Fingerprint::new(FingerprintKind::BuildId, "abcd"));
        table.write_atomic(&path).unwrap();

        let back = TableFile::read(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(back.header, table.header);
        assert_eq!(back.dispatch, table.dispatch);
        assert_eq!(back.catalog.find_by_name("B").unwrap().size, 24);
        assert!(!Path::new(&format!("{}.tmp", path.display())).exists());
    }

    #[test]
    fn test_rejects_wrong_magic() {
        let path = temp_path("magic.vtables.json");
        let mut table = sample();
        table.header.magic = "something-else".into();
        table.write_atomic(&path).unwrap();

        let err = TableFile::read(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, TableError::BadMagic(_)));
    }

    #[test]
    fn test_rejects_inconsistent_entries() {
        let mut table = sample();
        table.dispatch = DispatchTable::new(vec![DispatchEntry::new(0x5100, TypeIndex(0), 99)]);
        assert!(matches!(table.check_consistency(), Err(TableError::Inconsistent { .. })));

        table.dispatch = DispatchTable::new(vec![DispatchEntry::new(0x5100, TypeIndex(7), 16)]);
        assert!(table.check_consistency().is_err());
    }

    #[test]
    fn test_fingerprint_check() {
        let recorded = Fingerprint::new(FingerprintKind::Content, "0011");
        let table = sample().with_fingerprint(recorded.clone());
        assert!(table.check_fingerprint(&recorded).is_ok());

        let other = Fingerprint::new(FingerprintKind::Content, "2233");
        assert!(matches!(table.check_fingerprint(&other), Err(TableError::Stale { .. })));
        assert!(matches!(sample().check_fingerprint(&other), Err(TableError::Unfingerprinted(_))));
    }

    #[test]
    fn test_from_output_keeps_fingerprint() {
        use crate::builder::{BuildOutput, BuildReport};

        let table = sample();
        let fingerprint = Fingerprint::new(FingerprintKind::BuildId, "beef");
        let output = BuildOutput {
            module: "game.exe".into(),
            catalog: table.catalog.clone(),
            dispatch: table.dispatch.clone(),
            report: BuildReport::default(),
            fingerprint: Some(fingerprint.clone()),
        };
        assert_eq!(TableFile::from_output(output).header.fingerprint, Some(fingerprint));
    }

    #[test]
    fn test_path_for() {
        let path = TableFile::path_for(Path::new("/tmp/tables"), "game.exe");
        assert_eq!(path, PathBuf::from("/tmp/tables/game.exe.vtables.json"));
    }
}
