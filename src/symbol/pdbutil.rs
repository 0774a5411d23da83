// Fri Jan 23 2026 - Alex

//! Reader for the text output of `llvm-pdbutil dump`.
//!
//! Three dumps carry the records: `--section-headers`, `--globals` and
//! `--types`. A fourth, `--summary`, supplies the PDB's GUID and age.
//! Blocks that do not match the expected shape are skipped with a debug log;
//! the builder reports anything that ends up unresolvable.

use crate::catalog::{PrimitiveKind, Visibility};
use crate::symbol::{
    ClassKind, ClassOptions, ClassRecord, DispatchSymbol, MemberRecord, RecordIndex, RecordSet, SectionHeader,
    SymbolError, TypeRecord, TypeRef,
};
use crate::table::Fingerprint;
use crate::utils::hex::from_hex;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

/// Dump name and the `llvm-pdbutil dump` flag producing it.
pub const DUMPS: [(&str, &str); 4] = [
    ("sections", "--section-headers"),
    ("globals", "--globals"),
    ("types", "--types"),
    ("summary", "--summary"),
];

static SECTION_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"SECTION HEADER #(\d+)").unwrap());
static SECTION_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*(\S+) name\s*$").unwrap());
static SECTION_VSIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*([0-9A-Fa-f]+) virtual size").unwrap());
static SECTION_VADDR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*([0-9A-Fa-f]+) virtual address").unwrap());

static GDATA32: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\d+\s+\|\s+S_GDATA32\s+\[[^\]]*\]\s+`(.+?)::`vftable'(?:\{for `(.+?)'\})?`\s*$").unwrap()
});
static ADDR: Lazy<Regex> = Lazy::new(|| Regex::new(r"addr\s+=\s+(\d+):(\d+)").unwrap());

static TYPE_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(0x[0-9A-Fa-f]+)\s*\|\s*(LF_\w+)").unwrap());
static CLASS_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"LF_\w+\s+\[size\s*=\s*\d+\s*\]\s+`(.+?)`\s*$").unwrap());
static UNIQUE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"unique name:\s*`(.+?)`").unwrap());
static FIELD_LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"field list: (0x[0-9A-Fa-f]+)").unwrap());
static FORWARD_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"forward ref(?: \(-> (0x[0-9A-Fa-f]+)\))?").unwrap());
static SCOPED: Lazy<Regex> = Lazy::new(|| Regex::new(r"options:.*\bscoped\b").unwrap());
static SIZEOF: Lazy<Regex> = Lazy::new(|| Regex::new(r"sizeof (\d+)").unwrap());

static MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"LF_MEMBER \[name = `(.+?)`, Type = (0x[0-9A-Fa-f]+)(?: \((.*?)\))?, offset = (\d+), attrs = (\w+)").unwrap()
});
static BASE_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"type = (0x[0-9A-Fa-f]+)(?: \((.*?)\))?, offset = (\d+), attrs = (\w+)").unwrap()
});
static VIRTUAL_BASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"base = (0x[0-9A-Fa-f]+)").unwrap());
static NAMED_MEMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[name = `(.+?)`").unwrap());

static POINTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"referent = (0x[0-9A-Fa-f]+)(?: \((.*?)\))?, mode = \w+, opts = .*?, kind = ptr(\d+)").unwrap()
});
static ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"size: (\d+), index type: .*?, element type: (0x[0-9A-Fa-f]+)(?: \((.*?)\))?\s*$").unwrap()
});
static MODIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"referent = (0x[0-9A-Fa-f]+)(?: \((.*?)\))?, modifiers").unwrap());
static BITFIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"type = (0x[0-9A-Fa-f]+)(?: \((.*?)\))?, bit offset = (\d+), # bits = (\d+)").unwrap()
});
static GUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"GUID:\s*\{([0-9A-Fa-f]{8})-([0-9A-Fa-f]{4})-([0-9A-Fa-f]{4})-([0-9A-Fa-f]{4})-([0-9A-Fa-f]{12})\}").unwrap()
});
static AGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*Age:\s*(\d+)\s*$").unwrap());

static UNDERLYING: Lazy<Regex> = Lazy::new(|| Regex::new(r"underlying type: (0x[0-9A-Fa-f]+)(?: \((.*?)\))?").unwrap());

/// Parses the three dump texts into a [`RecordSet`].
pub fn parse_dumps(module: &str, sections: &str, globals: &str, types: &str) -> RecordSet {
    RecordSet {
        module: module.to_string(),
        sections: parse_section_headers(sections),
        dispatch_symbols: parse_globals(globals),
        types: parse_types(types),
        fingerprint: None,
    }
}

/// Reads `<stem>.sections.txt`, `<stem>.globals.txt` and `<stem>.types.txt`
/// from `dir`, plus `<stem>.summary.txt` for the fingerprint when present.
pub fn load_dump_dir(dir: &Path, stem: &str, module: &str) -> Result<RecordSet, SymbolError> {
    let read = |kind: &str| fs::read_to_string(dir.join(format!("{}.{}.txt", stem, kind)));
    let sections = read("sections")?;
    let globals = read("globals")?;
    let types = read("types")?;

    let mut set = parse_dumps(module, &sections, &globals, &types);
    match read("summary") {
        Ok(summary) => set.fingerprint = parse_summary(&summary),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    Ok(set)
}

/// Runs every `llvm-pdbutil dump` in [`DUMPS`] on `pdb` in parallel and
/// parses the output. With `keep`, each dump is also saved as
/// `<keep>/<pdb stem>.<name>.txt`, the layout [`load_dump_dir`] reads.
pub fn run_pdbutil(tool: &Path, pdb: &Path, module: &str, keep: Option<&Path>) -> Result<RecordSet, SymbolError> {
    let texts: Vec<String> = DUMPS
        .par_iter()
        .map(|(_, flag)| run_dump(tool, pdb, flag))
        .collect::<Result<_, _>>()?;

    if let Some(dir) = keep {
        let stem = pdb.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| module.to_string());
        fs::create_dir_all(dir)?;
        for ((name, _), text) in DUMPS.iter().zip(&texts) {
            fs::write(dir.join(format!("{}.{}.txt", stem, name)), text)?;
        }
    }

    let mut set = parse_dumps(module, &texts[0], &texts[1], &texts[2]);
    set.fingerprint = parse_summary(&texts[3]);
    if set.fingerprint.is_none() {
        log::warn!("{}: no GUID/age in the pdbutil summary", pdb.display());
    }
    Ok(set)
}

fn run_dump(tool: &Path, pdb: &Path, flag: &str) -> Result<String, SymbolError> {
    let failed = |reason: String| SymbolError::Tool { tool: tool.display().to_string(), reason };
    let output = Command::new(tool)
        .arg("dump")
        .arg(flag)
        .arg(pdb)
        .output()
        .map_err(|e| failed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failed(format!("dump {} exited with {}: {}", flag, output.status, stderr.trim())));
    }
    log::debug!("dump {}: {} bytes", flag, output.stdout.len());
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// CodeView fingerprint from `dump --summary`. The GUID is printed in its
/// canonical form, whose first three groups are byte-swapped relative to
/// the RSDS record.
pub fn parse_summary(text: &str) -> Option<Fingerprint> {
    let guid = GUID.captures(text)?;
    let age: u32 = AGE.captures(text)?[1].parse().ok()?;

    let mut raw = Vec::with_capacity(16);
    for group in 1..=5 {
        let mut bytes = from_hex(&guid[group]).ok()?;
        if group <= 3 {
            bytes.reverse();
        }
        raw.extend(bytes);
    }
    let raw: [u8; 16] = raw.try_into().ok()?;
    Some(Fingerprint::codeview(&raw, age))
}

pub fn parse_section_headers(text: &str) -> Vec<SectionHeader> {
    let starts: Vec<usize> = SECTION_INDEX.find_iter(text).map(|m| m.start()).collect();
    let mut sections = Vec::with_capacity(starts.len());

    for (i, start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let block = &text[*start..end];

        let index = SECTION_INDEX.captures(block).and_then(|c| c[1].parse::<u16>().ok());
        let vaddr = SECTION_VADDR.captures(block).and_then(|c| u64::from_str_radix(&c[1], 16).ok());
        let (Some(index), Some(vaddr)) = (index, vaddr) else {
            log::debug!("skipping malformed section header block at byte {}", start);
            continue;
        };

        let name = SECTION_NAME.captures(block).map(|c| c[1].to_string()).unwrap_or_default();
        let size = SECTION_VSIZE
            .captures(block)
            .and_then(|c| u64::from_str_radix(&c[1], 16).ok())
            .unwrap_or(0);
        sections.push(SectionHeader::new(index, &name, vaddr, size));
    }

    sections
}

/// Pairs each ``S_GDATA32 `X::`vftable'`` line with the `addr = sec:off` on the next line.
pub fn parse_globals(text: &str) -> Vec<DispatchSymbol> {
    let mut symbols = Vec::new();
    let mut previous = "";

    for line in text.lines() {
        if let (Some(head), Some(addr)) = (GDATA32.captures(previous), ADDR.captures(line)) {
            let section = addr[1].parse::<u16>();
            let offset = addr[2].parse::<u64>();
            if let (Ok(section), Ok(offset)) = (section, offset) {
                let mut symbol = DispatchSymbol::new(&head[1], section, offset);
                if let Some(base) = head.get(2) {
                    symbol = symbol.with_for_base(base.as_str());
                }
                symbols.push(symbol);
            }
        }
        previous = line;
    }

    symbols
}

pub fn parse_types(text: &str) -> Vec<TypeRecord> {
    let mut records = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in text.lines() {
        if TYPE_HEADER.is_match(line) && !block.is_empty() {
            records.extend(parse_type_block(&block));
            block.clear();
        }
        if TYPE_HEADER.is_match(line) || !block.is_empty() {
            block.push(line);
        }
    }
    if !block.is_empty() {
        records.extend(parse_type_block(&block));
    }

    records
}

fn parse_type_block(lines: &[&str]) -> Option<TypeRecord> {
    let header = TYPE_HEADER.captures(lines.first()?)?;
    let index = parse_hex(&header[1])?;
    let leaf = header[2].to_string();
    let content = lines.join("\n");

    let record = match leaf.as_str() {
        "LF_CLASS" => parse_class(index, ClassKind::Class, lines, &content),
        "LF_STRUCTURE" => parse_class(index, ClassKind::Struct, lines, &content),
        "LF_UNION" => parse_class(index, ClassKind::Union, lines, &content),
        "LF_FIELDLIST" => Some(TypeRecord::FieldList { index, members: parse_members(&lines[1..]) }),
        "LF_POINTER" => {
            let caps = POINTER.captures(&content)?;
            let referent = parse_type_ref(&caps[1], caps.get(2).map(|m| m.as_str()))?;
            let bits: u8 = caps[3].parse().ok()?;
            Some(TypeRecord::Pointer { index, referent, size: bits / 8 })
        }
        "LF_ARRAY" => {
            let caps = ARRAY.captures(&content)?;
            let element = parse_type_ref(&caps[2], caps.get(3).map(|m| m.as_str()))?;
            Some(TypeRecord::Array { index, element, size: caps[1].parse().ok()? })
        }
        "LF_MODIFIER" => {
            let caps = MODIFIER.captures(&content)?;
            let referent = parse_type_ref(&caps[1], caps.get(2).map(|m| m.as_str()))?;
            Some(TypeRecord::Modifier { index, referent })
        }
        "LF_BITFIELD" => {
            let caps = BITFIELD.captures(&content)?;
            let base = parse_type_ref(&caps[1], caps.get(2).map(|m| m.as_str()))?;
            Some(TypeRecord::BitField {
                index,
                base,
                bit_offset: caps[3].parse().ok()?,
                bit_count: caps[4].parse().ok()?,
            })
        }
        "LF_ENUM" => {
            let name = CLASS_NAME.captures(lines.first()?)?[1].to_string();
            let caps = UNDERLYING.captures(&content)?;
            let underlying = parse_type_ref(&caps[1], caps.get(2).map(|m| m.as_str()))?;
            Some(TypeRecord::Enum { index, name, underlying })
        }
        _ => None,
    };

    if record.is_none() && leaf != "LF_ARGLIST" && leaf != "LF_PROCEDURE" && leaf != "LF_MFUNCTION" {
        log::debug!("skipping {} record 0x{:X}", leaf, index);
    }
    record
}

fn parse_class(index: RecordIndex, kind: ClassKind, lines: &[&str], content: &str) -> Option<TypeRecord> {
    let name = CLASS_NAME.captures(lines.first()?)?[1].to_string();
    let mut record = ClassRecord::forward(index, &name).with_kind(kind);
    record.options = ClassOptions::empty();

    if let Some(caps) = UNIQUE_NAME.captures(content) {
        record = record.with_unique_name(&caps[1]);
    }
    if let Some(caps) = FORWARD_REF.captures(content) {
        record.options |= ClassOptions::FORWARD_REF;
        record.definition = caps.get(1).and_then(|m| parse_hex(m.as_str()));
    }
    if SCOPED.is_match(content) {
        record.options |= ClassOptions::SCOPED;
    }
    record.field_list = FIELD_LIST.captures(content).and_then(|c| parse_hex(&c[1]));
    record.size = SIZEOF.captures(content).and_then(|c| c[1].parse().ok()).unwrap_or(0);

    Some(TypeRecord::Class(record))
}

fn parse_members(lines: &[&str]) -> Vec<MemberRecord> {
    let mut entries: Vec<String> = Vec::new();
    for line in lines {
        let trimmed = line.trim_start();
        if let Some(entry) = trimmed.strip_prefix("- ") {
            entries.push(entry.to_string());
        } else if let Some(last) = entries.last_mut() {
            last.push(' ');
            last.push_str(trimmed);
        }
    }

    entries.iter().filter_map(|entry| parse_member(entry)).collect()
}

fn parse_member(entry: &str) -> Option<MemberRecord> {
    let leaf = entry.split_whitespace().next()?;
    let named = || NAMED_MEMBER.captures(entry).map(|c| c[1].to_string());

    match leaf {
        "LF_MEMBER" => {
            let caps = MEMBER.captures(entry)?;
            Some(MemberRecord::Data {
                name: caps[1].to_string(),
                ty: parse_type_ref(&caps[2], caps.get(3).map(|m| m.as_str()))?,
                offset: caps[4].parse().ok()?,
                access: parse_access(&caps[5]),
            })
        }
        "LF_BCLASS" => {
            let caps = BASE_CLASS.captures(entry)?;
            Some(MemberRecord::Base {
                ty: parse_type_ref(&caps[1], caps.get(2).map(|m| m.as_str()))?,
                offset: caps[3].parse().ok()?,
                access: parse_access(&caps[4]),
            })
        }
        "LF_VBCLASS" | "LF_IVBCLASS" => {
            let caps = VIRTUAL_BASE.captures(entry)?;
            Some(MemberRecord::VirtualBase { ty: parse_type_ref(&caps[1], None)? })
        }
        "LF_VFUNCTAB" => Some(MemberRecord::DispatchPointer),
        "LF_STMEMBER" => Some(MemberRecord::Static { name: named()? }),
        "LF_NESTTYPE" => Some(MemberRecord::NestedType { name: named()? }),
        "LF_ONEMETHOD" | "LF_METHOD" => Some(MemberRecord::Method { name: named()? }),
        _ => None,
    }
}

/// Interprets `0xNNNN (name)`. Indices below 0x1000 are built-in types.
fn parse_type_ref(index: &str, name: Option<&str>) -> Option<TypeRef> {
    let index = parse_hex(index)?;
    if index >= 0x1000 {
        return Some(TypeRef::Record(index));
    }

    let name = name?;
    if name.trim_end().ends_with('*') {
        let width = match (index >> 8) & 0xF {
            4 => 4,
            _ => 8,
        };
        return Some(TypeRef::PrimitivePointer(width));
    }
    PrimitiveKind::from_c_name(name).map(TypeRef::Primitive)
}

fn parse_access(attrs: &str) -> Visibility {
    match attrs {
        "private" => Visibility::Private,
        "protected" => Visibility::Protected,
        _ => Visibility::Public,
    }
}

fn parse_hex(text: &str) -> Option<u32> {
    u32::from_str_radix(text.trim_start_matches("0x").trim_start_matches("0X"), 16).ok()
}
