// Wed Jan 15 2026 - Alex

use crate::catalog::SlotPosition;
use crate::table::Fingerprint;
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vtable-baker")]
#[command(author = "Alex")]
#[command(version)]
#[command(about = "Bakes class layouts from debug info and decodes live objects by their dispatch pointer", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// error, warn, info, debug, trace or off. Overrides -v.
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build table files from debug-info records.
    Bake(BakeArgs),
    /// Print the contents of a table file.
    Inspect(InspectArgs),
    /// Map dispatch pointers to their dynamic types.
    Resolve(ResolveArgs),
    /// Capture an object into a blob.
    Encode(EncodeArgs),
    /// Print a blob as a field tree.
    Decode(DecodeArgs),
    /// Change one field of a blob and emit the matching writes.
    Edit(EditArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SlotArg {
    Front,
    Back,
}

impl From<SlotArg> for SlotPosition {
    fn from(slot: SlotArg) -> Self {
        match slot {
            SlotArg::Front => SlotPosition::Front,
            SlotArg::Back => SlotPosition::Back,
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct BakeArgs {
    /// JSON record dumps, one module each.
    #[arg(short, long)]
    pub records: Vec<PathBuf>,

    /// Directory holding `<stem>.sections.txt`, `<stem>.globals.txt` and `<stem>.types.txt`.
    #[arg(long, requires = "stem", conflicts_with = "pdb")]
    pub pdbutil: Option<PathBuf>,

    #[arg(long, requires = "pdbutil")]
    pub stem: Option<String>,

    /// PDB to run `llvm-pdbutil dump` on directly.
    #[arg(long)]
    pub pdb: Option<PathBuf>,

    #[arg(long, default_value = "llvm-pdbutil")]
    pub pdbutil_tool: PathBuf,

    /// Save the raw --pdb dumps here, readable later with --pdbutil.
    #[arg(long, requires = "pdb")]
    pub keep_dumps: Option<PathBuf>,

    /// Module name for a pdbutil dump. Defaults to the stem.
    #[arg(short, long)]
    pub module: Option<String>,

    /// ELF or PE image supplying sections and dispatch symbols for a single module.
    #[arg(long, conflicts_with = "binary")]
    pub object: Option<PathBuf>,

    /// Module image to fingerprint the table against, without reading its symbols.
    #[arg(long, conflicts_with = "fingerprint")]
    pub binary: Option<PathBuf>,

    /// Explicit `kind:value` fingerprint, e.g. `build-id:9f3a...`.
    #[arg(long)]
    pub fingerprint: Option<Fingerprint>,

    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub slot: Option<SlotArg>,

    #[arg(long, value_parser = parse_u64)]
    pub bias: Option<u64>,

    /// Target pointer size in bytes, 4 or 8.
    #[arg(long)]
    pub pointer_width: Option<u8>,

    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Keep tables emitted for non-primary bases.
    #[arg(long)]
    pub keep_secondary: bool,

    /// Also write the console report to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[arg(long)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug)]
pub struct InspectArgs {
    pub table: PathBuf,

    /// Print one class with its members instead of the summary.
    #[arg(short = 't', long = "type")]
    pub type_name: Option<String>,

    /// Print as JSON.
    #[arg(long)]
    pub json: bool,

    /// Also write the output to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct ResolveArgs {
    /// Directory of table files.
    #[arg(short, long)]
    pub tables: Option<PathBuf>,

    /// Attach modules from the live process's memory map.
    #[arg(short, long, conflicts_with = "module")]
    pub pid: Option<i32>,

    /// Attach one module by hand.
    #[arg(short, long, requires = "base")]
    pub module: Option<String>,

    #[arg(short, long, value_parser = parse_u64)]
    pub base: Option<u64>,

    #[arg(short, long, value_parser = parse_u64)]
    pub size: Option<u64>,

    #[arg(required = true, value_parser = parse_u64)]
    pub pointers: Vec<u64>,
}

#[derive(ClapArgs, Debug)]
pub struct EncodeArgs {
    #[arg(short, long)]
    pub table: PathBuf,

    /// Object address.
    #[arg(short, long, value_parser = parse_u64)]
    pub address: u64,

    /// Skip dispatch resolution and capture as this class.
    #[arg(long = "type")]
    pub type_name: Option<String>,

    /// Static size to capture when the dispatch pointer does not resolve.
    #[arg(long, value_parser = parse_u64)]
    pub fallback_size: Option<u64>,

    /// Where the table's module is loaded. Required for dispatch resolution.
    #[arg(long, value_parser = parse_u64)]
    pub module_base: Option<u64>,

    #[arg(short, long, conflicts_with = "snapshot")]
    pub pid: Option<i32>,

    /// Raw memory image, loaded at --snapshot-base.
    #[arg(long, requires = "snapshot_base")]
    pub snapshot: Option<PathBuf>,

    #[arg(long, value_parser = parse_u64)]
    pub snapshot_base: Option<u64>,

    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(ClapArgs, Debug)]
pub struct DecodeArgs {
    #[arg(short, long)]
    pub table: PathBuf,

    pub blob: PathBuf,

    #[arg(long)]
    pub json: bool,

    /// One `[name@offset:type]` entry per leaf.
    #[arg(long, conflicts_with = "json")]
    pub summary: bool,
}

#[derive(ClapArgs, Debug)]
pub struct EditArgs {
    #[arg(short, long)]
    pub table: PathBuf,

    pub blob: PathBuf,

    /// Dotted member name, e.g. `inner.x` or `items[2]`.
    #[arg(short, long, required_unless_present = "path", conflicts_with = "path")]
    pub field: Option<String>,

    /// Offset path, e.g. `0x8/0x4` or `0x10:3` for a bit-field.
    #[arg(long)]
    pub path: Option<String>,

    /// `true`, `-5`, `0x2A`, `1.5`, `ptr:0x7ff0`, `hex:deadbeef`.
    #[arg(long, allow_hyphen_values = true)]
    pub value: String,

    /// Write the edited blob here instead of in place.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Mirror the writes onto this process at --address.
    #[arg(short, long, requires = "address")]
    pub pid: Option<i32>,

    #[arg(short, long, value_parser = parse_u64)]
    pub address: Option<u64>,
}

/// Decimal or `0x` hex.
pub fn parse_u64(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("{:?}: {}", s, e))
}
