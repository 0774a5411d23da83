// Sat Feb 07 2026 - Alex

use crate::builder::BuildReport;
use crate::catalog::{TypeCatalog, TypeDescriptor, TypeIndex};
use crate::table::TableFile;
use ahash::AHashMap;
use itertools::Itertools;
use serde::Serialize;
use std::fmt::Write;

/// One catalog entry as listed by `inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectRow {
    pub size: u64,
    pub type_index: TypeIndex,
    pub fields: usize,
    /// Dispatch table address relative to the module base, if the class has one.
    pub rva: Option<u64>,
    pub name: String,
}

/// Classes with a dispatch table first, then the rest; each group by size.
pub fn inspect_rows(table: &TableFile) -> Vec<InspectRow> {
    let rvas: AHashMap<TypeIndex, u64> = table
        .dispatch
        .entries()
        .iter()
        .map(|e| (e.type_index, e.relative_address))
        .collect();

    table
        .catalog
        .iter()
        .map(|desc| InspectRow {
            size: desc.size,
            type_index: desc.index,
            fields: desc.fields.len(),
            rva: rvas.get(&desc.index).copied(),
            name: desc.name.clone(),
        })
        .sorted_by(|a, b| {
            a.rva
                .is_none()
                .cmp(&b.rva.is_none())
                .then(a.size.cmp(&b.size))
                .then_with(|| a.name.cmp(&b.name))
        })
        .collect()
}

pub fn render_inspect(table: &TableFile) -> String {
    let rows = inspect_rows(table);
    let (dispatch, other): (Vec<_>, Vec<_>) = rows.iter().partition(|r| r.rva.is_some());

    let mut out = String::new();
    let _ = writeln!(out, "== dispatch types ({}) ==", dispatch.len());
    for row in dispatch {
        let _ = writeln!(out, "{}", format_row(row));
    }
    let _ = writeln!(out, "\n== other types ({}) ==", other.len());
    for row in other {
        let _ = writeln!(out, "{}", format_row(row));
    }
    out
}

fn format_row(row: &InspectRow) -> String {
    let rva = row.rva.map(|r| format!("0x{:X}", r)).unwrap_or_else(|| "-".to_string());
    format!(
        "Sizeof: {:>6} | type: {:>8} | fields: {:>4} | rva: {:<10} | name: {}",
        row.size,
        format!("0x{:X}", row.type_index.0),
        row.fields,
        rva,
        row.name
    )
}

/// Bases and fields of one class, in offset order.
pub fn render_type(catalog: &TypeCatalog, desc: &TypeDescriptor) -> String {
    let mut out = format!("{} {} ({} bytes", desc.name, desc.index, desc.size);
    if let Some(slot) = desc.dispatch_slot {
        let (offset, len) = catalog.convention().slot_range(desc.size);
        let _ = write!(out, ", {:?} dispatch slot +0x{:X}..+0x{:X}", slot, offset, offset + len);
    }
    out.push_str(")\n");

    for base in &desc.bases {
        let _ = writeln!(out, "  +0x{:04X} base {} ({} bytes)", base.offset, base.name, base.size);
    }
    for field in desc.fields.iter().sorted_by_key(|f| (f.offset, f.bit_field.map(|b| b.bit_offset))) {
        let bits = field
            .bit_field
            .map(|b| format!(" : {}@{}", b.bit_count, b.bit_offset))
            .unwrap_or_default();
        let _ = writeln!(out, "  +0x{:04X} {} {}{} ({} bytes)", field.offset, field.ty, field.name, bits, field.size);
    }
    out
}

/// Diagnostics grouped by kind, each group headed by its count.
pub fn render_diagnostics(module: &str, report: &BuildReport) -> String {
    if report.is_empty() {
        return format!("{}: no diagnostics\n", module);
    }

    let mut out = format!("{}: {} diagnostics\n", module, report.len());
    let groups = report.diagnostics().iter().into_group_map_by(|d| d.kind());
    for (kind, diagnostics) in groups.into_iter().sorted_by_key(|(kind, _)| *kind) {
        let _ = writeln!(out, "  {} ({})", kind, diagnostics.len());
        for diagnostic in diagnostics {
            let _ = writeln!(out, "    {}", diagnostic);
        }
    }
    out
}
