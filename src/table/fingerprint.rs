// Wed Jan 28 2026 - Alex

use crate::table::TableError;
use crate::utils::hash::HashComputer;
use crate::utils::hex::to_hex;
use goblin::elf::note::NT_GNU_BUILD_ID;
use goblin::Object;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintKind {
    /// ELF `.note.gnu.build-id`.
    BuildId,
    /// PE CodeView RSDS record, GUID followed by age.
    CodeView,
    /// FNV-1a 64 over the whole file.
    Content,
}

impl fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BuildId => "build-id",
            Self::CodeView => "codeview",
            Self::Content => "fnv1a64",
        };
        write!(f, "{}", s)
    }
}

/// Identity of the exact module build a table was baked from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub kind: FingerprintKind,
    pub value: String,
}

impl Fingerprint {
    pub fn new(kind: FingerprintKind, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }

    pub fn of_file<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = File::open(path.as_ref())?;
        if file.metadata()?.len() == 0 {
            return Ok(Self::of_bytes(&[]));
        }
        // SAFETY: read-only mapping, not held past this call.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self::of_bytes(&map))
    }

    /// Build identity embedded in the image when there is one, content hash otherwise.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self::embedded(bytes).unwrap_or_else(|| Self::content(bytes))
    }

    /// GUID bytes as stored in the RSDS record, followed by the age in hex.
    /// A PDB and the image linked against it yield the same value.
    pub fn codeview(guid: &[u8; 16], age: u32) -> Self {
        Self::new(FingerprintKind::CodeView, &format!("{}{:x}", to_hex(guid), age))
    }

    pub fn content(bytes: &[u8]) -> Self {
        Self::new(FingerprintKind::Content, &format!("{:016x}", HashComputer::fnv1a_64(bytes)))
    }

    fn embedded(bytes: &[u8]) -> Option<Self> {
        match Object::parse(bytes).ok()? {
            Object::Elf(elf) => {
                let notes = elf.iter_note_sections(bytes, Some(".note.gnu.build-id"))?;
                let id = notes
                    .filter_map(Result::ok)
                    .find(|note| note.n_type == NT_GNU_BUILD_ID)?;
                Some(Self::new(FingerprintKind::BuildId, &to_hex(id.desc)))
            }
            Object::PE(pe) => {
                let rsds = pe.debug_data?.codeview_pdb70_debug_info?;
                Some(Self::codeview(&rsds.signature, rsds.age))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

impl FromStr for FingerprintKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build-id" => Ok(Self::BuildId),
            "codeview" => Ok(Self::CodeView),
            "fnv1a64" => Ok(Self::Content),
            other => Err(format!("unknown fingerprint kind '{}' (build-id, codeview, fnv1a64)", other)),
        }
    }
}

/// Parses the `kind:value` form [`Display`](fmt::Display) produces.
impl FromStr for Fingerprint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s.split_once(':').ok_or_else(|| format!("expected kind:value, got '{}'", s))?;
        let value = value.trim().to_ascii_lowercase();
        if value.is_empty() || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("fingerprint value '{}' is not hex", value));
        }
        Ok(Self::new(kind.trim().parse()?, &value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_fallback() {
        let fp = Fingerprint::of_bytes(b"not an object file");
        assert_eq!(fp.kind, FingerprintKind::Content);
        assert_eq!(fp.value.len(), 16);
        assert_eq!(fp, Fingerprint::of_bytes(b"not an object file"));
        assert_ne!(fp, Fingerprint::of_bytes(b"not an object file!"));
    }

    #[test]
    fn test_empty_input() {
        let fp = Fingerprint::of_bytes(&[]);
        assert_eq!(fp.to_string(), "fnv1a64:cbf29ce484222325");
    }

    #[test]
    fn test_of_file_matches_of_bytes() {
        let path = std::env::temp_dir().join(format!("vtable_baker_fp_{}.bin", std::process::id()));
        std::fs::write(&path, b"\x01\x02\x03\x04").unwrap();
        let from_file = Fingerprint::of_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(from_file, Fingerprint::of_bytes(b"\x01\x02\x03\x04"));
    }

    #[test]
    fn test_codeview_value() {
        let guid = [0x4a, 0xec, 0xce, 0x4f, 0x5e, 0x7b, 0x4e, 0x7a, 0xa6, 0xa1, 0x1f, 0x8a, 0x1c, 0x5b, 0x8c, 0x7d];
        let fp = Fingerprint::codeview(&guid, 0x1c);
        assert_eq!(fp.to_string(), "codeview:4aecce4f5e7b4e7aa6a11f8a1c5b8c7d1c");
    }

    #[test]
    fn test_parse_display_form() {
        let fp: Fingerprint = "build-id:9F3A00C1".parse().unwrap();
        assert_eq!(fp, Fingerprint::new(FingerprintKind::BuildId, "9f3a00c1"));
        assert_eq!(fp.to_string().parse::<Fingerprint>().unwrap(), fp);
        assert!("sha1:abcd".parse::<Fingerprint>().is_err());
        assert!("codeview:".parse::<Fingerprint>().is_err());
        assert!("fnv1a64".parse::<Fingerprint>().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(Fingerprint::of_file("/nonexistent/vtable_baker/module.so").is_err());
    }
}
