// Fri Jan 30 2026 - Alex

use crate::memory::Address;
use crate::resolver::ResolverError;
use ahash::AHashMap;
use std::path::{Path, PathBuf};

/// A module currently mapped into the target process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    pub name: String,
    pub load_base: Address,
    pub size: u64,
    pub path: Option<PathBuf>,
}

impl LoadedModule {
    pub fn new(name: &str, load_base: Address, size: u64) -> Self {
        Self { name: name.to_string(), load_base, size, path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }
}

pub trait ModuleTracker: Send + Sync {
    fn current_modules(&self) -> Result<Vec<LoadedModule>, ResolverError>;
}

/// Fixed module list, for targets whose layout is already known.
#[derive(Debug, Clone, Default)]
pub struct StaticTracker {
    modules: Vec<LoadedModule>,
}

impl StaticTracker {
    pub fn new(modules: Vec<LoadedModule>) -> Self {
        Self { modules }
    }
}

impl ModuleTracker for StaticTracker {
    fn current_modules(&self) -> Result<Vec<LoadedModule>, ResolverError> {
        Ok(self.modules.clone())
    }
}

/// Reads `/proc/<pid>/maps`.
#[derive(Debug, Clone, Copy)]
pub struct ProcMapsTracker {
    pid: i32,
}

impl ProcMapsTracker {
    pub fn new(pid: i32) -> Self {
        Self { pid }
    }
}

impl ModuleTracker for ProcMapsTracker {
    fn current_modules(&self) -> Result<Vec<LoadedModule>, ResolverError> {
        let text = std::fs::read_to_string(format!("/proc/{}/maps", self.pid))?;
        parse_maps(&text)
    }
}

/// Groups file-backed mappings by path. A module spans from its lowest
/// mapping to the end of its highest one.
pub fn parse_maps(text: &str) -> Result<Vec<LoadedModule>, ResolverError> {
    let mut spans: AHashMap<&str, (u64, u64)> = AHashMap::new();
    let mut order = Vec::new();

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let malformed = || ResolverError::MapsFormat(line.to_string());
        let mut parts = line.split_whitespace();
        let range = parts.next().ok_or_else(malformed)?;
        // perms, offset, dev, inode
        let rest: Vec<&str> = parts.collect();
        if rest.len() < 4 {
            return Err(malformed());
        }
        let (start, end) = range.split_once('-').ok_or_else(malformed)?;
        let start = u64::from_str_radix(start, 16).map_err(|_| malformed())?;
        let end = u64::from_str_radix(end, 16).map_err(|_| malformed())?;

        let Some(path) = line.find(" /").map(|i| line[i + 1..].trim_end()) else {
            continue;
        };
        if path.ends_with(" (deleted)") {
            continue;
        }

        spans
            .entry(path)
            .and_modify(|(lo, hi)| {
                *lo = (*lo).min(start);
                *hi = (*hi).max(end);
            })
            .or_insert_with(|| {
                order.push(path);
                (start, end)
            });
    }

    Ok(order
        .into_iter()
        .filter_map(|path| {
            let (start, end) = spans.get(path)?;
            let name = Path::new(path).file_name()?.to_string_lossy().into_owned();
            Some(LoadedModule::new(&name, Address::new(*start), end - start).with_path(path))
        })
        .collect())
}
