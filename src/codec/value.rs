// Tue Feb 03 2026 - Alex

use crate::catalog::TypeIndex;
use crate::utils::hex::to_hex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a span is shown as raw bytes instead of a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawMarker {
    /// The field's type is not in the catalog.
    Unresolved,
    /// Blob size disagrees with the catalog, e.g. the module was rebuilt.
    SizeMismatch,
    /// The blob carries the unknown-type sentinel or an index outside the catalog.
    UnknownType,
    /// The declared span runs past the end of the blob.
    OutOfRange,
}

impl fmt::Display for RawMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unresolved => "unresolved",
            Self::SizeMismatch => "size mismatch",
            Self::UnknownType => "unknown type",
            Self::OutOfRange => "out of range",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DecodedValue {
    Bool(bool),
    Int(i128),
    UInt(u128),
    Float(f64),
    Char(char),
    Pointer(u64),
    Enum { name: String, value: i128 },
    /// Bases then fields, in memory order.
    Struct(Vec<DecodedNode>),
    Array(Vec<DecodedNode>),
    Raw { marker: RawMarker, hex: String },
}

impl DecodedValue {
    pub fn raw(marker: RawMarker, bytes: &[u8]) -> Self {
        Self::Raw { marker, hex: to_hex(bytes) }
    }

    pub fn children(&self) -> &[DecodedNode] {
        match self {
            Self::Struct(nodes) | Self::Array(nodes) => nodes,
            _ => &[],
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Char(c) => write!(f, "{:?}", c),
            Self::Pointer(p) => write!(f, "0x{:X}", p),
            Self::Enum { name, value } => write!(f, "{}({})", name, value),
            Self::Struct(nodes) | Self::Array(nodes) => write!(f, "{{{} members}}", nodes.len()),
            Self::Raw { marker, hex } => write!(f, "<{}> {}", marker, hex),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedNode {
    pub name: String,
    pub type_name: String,
    /// Offset from the start of the blob.
    pub offset: u64,
    pub size: u64,
    pub value: DecodedValue,
}

impl DecodedNode {
    pub fn new(name: &str, type_name: &str, offset: u64, size: u64, value: DecodedValue) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            offset,
            size,
            value,
        }
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self.value, DecodedValue::Struct(_) | DecodedValue::Array(_))
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a DecodedNode>) {
        if self.is_leaf() {
            out.push(self);
        }
        for child in self.value.children() {
            child.collect_leaves(out);
        }
    }
}

/// Structured view of one blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedTree {
    pub type_index: TypeIndex,
    pub type_name: String,
    pub size: u64,
    /// Set when the whole blob is shown as raw bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<RawMarker>,
    pub nodes: Vec<DecodedNode>,
}

impl DecodedTree {
    /// Leaf values in memory order, bases flattened in.
    pub fn leaves(&self) -> Vec<&DecodedNode> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_leaves(&mut out);
        }
        out
    }

    /// `[name@offset:type]` per leaf.
    pub fn summary(&self) -> String {
        self.leaves()
            .iter()
            .map(|n| format!("[{}@{}:{}]", n.name, n.offset, n.type_name))
            .collect()
    }

    pub fn render(&self) -> String {
        let mut out = format!("{} {} ({} bytes)", self.type_name, self.type_index, self.size);
        if let Some(marker) = self.marker {
            out.push_str(&format!(" <{}>", marker));
        }
        out.push('\n');
        for node in &self.nodes {
            render_node(node, 1, &mut out);
        }
        out
    }
}

fn render_node(node: &DecodedNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!(
        "{}+0x{:04X} {} {}: {}\n",
        indent, node.offset, node.type_name, node.name, node.value
    ));
    for child in node.value.children() {
        render_node(child, depth + 1, out);
    }
}
