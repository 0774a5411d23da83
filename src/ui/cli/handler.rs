// Wed Jan 15 2026 - Alex

use super::args::{Args, BakeArgs, Command, DecodeArgs, EditArgs, EncodeArgs, InspectArgs, ResolveArgs};
use crate::builder::MetadataBuilder;
use crate::catalog::TypeIndex;
use crate::codec::{Blob, BlobCodec, EditValue, FieldPath};
use crate::config::Config;
use crate::memory::{Address, MemoryReader, ProcessMemory, SnapshotMemory};
use crate::resolver::{ModuleMap, ModuleRecord, ProcMapsTracker, Resolution, TableRegistry};
use crate::symbol::{pdbutil, DebugInfoProvider, ObjectProvider, RecordSet, SplitProvider};
use crate::table::{Fingerprint, TableFile};
use crate::ui::output::{colored_tag, DualOutput};
use crate::ui::report;
use crate::utils::{format_duration, pluralize, LoggingUtils};
use anyhow::{anyhow, bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub struct CommandHandler {
    config: Config,
    quiet: bool,
}

impl CommandHandler {
    pub fn new(config: Config, quiet: bool) -> Self {
        Self { config, quiet }
    }

    /// Logger, colors and configuration from the global flags, then the subcommand.
    pub fn run(args: Args) -> anyhow::Result<()> {
        let level = match &args.log_level {
            Some(name) => LoggingUtils::level_from_str(name).ok_or_else(|| anyhow!("unknown log level {:?}", name))?,
            None => LoggingUtils::level_from_verbosity(args.verbose),
        };
        LoggingUtils::init_logger(level);
        if args.no_color {
            colored::control::set_override(false);
        }

        let config = match &args.config {
            Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display()))?,
            None => Config::default(),
        };
        Self::new(config, args.quiet).execute(args.command)
    }

    pub fn execute(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Bake(args) => self.handle_bake(args),
            Command::Inspect(args) => self.handle_inspect(args),
            Command::Resolve(args) => self.handle_resolve(args),
            Command::Encode(args) => self.handle_encode(args),
            Command::Decode(args) => self.handle_decode(args),
            Command::Edit(args) => self.handle_edit(args),
        }
    }

    fn status(&self, tag: &str, message: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        println!("{} {}", colored_tag(tag), message.as_ref());
    }

    fn handle_bake(&self, args: BakeArgs) -> anyhow::Result<()> {
        let start = Instant::now();
        let config = self.bake_config(&args)?;
        let out_dir = config.table_dir.clone();
        let mut out = DualOutput::create(self.quiet, args.report.as_deref()).context("creating report file")?;
        let pool = rayon::ThreadPoolBuilder::new().num_threads(config.threads).build()?;

        let mut sets = Vec::new();
        for path in &args.records {
            let set = RecordSet::load_json(path).with_context(|| format!("reading records {}", path.display()))?;
            sets.push(set);
        }
        if let Some(dir) = &args.pdbutil {
            let stem = args.stem.as_deref().ok_or_else(|| anyhow!("--pdbutil needs --stem"))?;
            let module = args.module.as_deref().unwrap_or(stem);
            let set = pdbutil::load_dump_dir(dir, stem, module)
                .with_context(|| format!("reading pdbutil dumps {}/{}.*.txt", dir.display(), stem))?;
            sets.push(set);
        }
        if let Some(pdb) = &args.pdb {
            let module = match &args.module {
                Some(module) => module.clone(),
                None => pdb
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .ok_or_else(|| anyhow!("cannot name a module after {}; pass --module", pdb.display()))?,
            };
            out.status("*", &format!("Dumping {} with {}", pdb.display(), args.pdbutil_tool.display()))?;
            let set = pool
                .install(|| pdbutil::run_pdbutil(&args.pdbutil_tool, pdb, &module, args.keep_dumps.as_deref()))
                .with_context(|| format!("dumping {}", pdb.display()))?;
            sets.push(set);
        }
        if sets.is_empty() {
            bail!("nothing to bake: pass --records, --pdbutil or --pdb");
        }

        let object = match &args.object {
            Some(path) if sets.len() == 1 => Some(
                ObjectProvider::open(path, &sets[0].module)
                    .with_context(|| format!("reading object {}", path.display()))?,
            ),
            Some(_) => bail!("--object pairs with exactly one record source"),
            None => None,
        };
        let pinned = match (&args.binary, &args.fingerprint) {
            (Some(path), _) => Some(Fingerprint::of_file(path).with_context(|| format!("fingerprinting {}", path.display()))?),
            (None, Some(fingerprint)) => Some(fingerprint.clone()),
            (None, None) => None,
        };
        if pinned.is_some() && sets.len() != 1 {
            bail!("--binary and --fingerprint pair with exactly one record source");
        }

        let itanium = object.as_ref().map_or(false, |o| o.is_itanium());
        if itanium && config.dispatch_symbol_bias.is_none() {
            log::info!("ELF image, biasing dispatch symbols by {} bytes", config.symbol_bias(true));
        } else if object.is_none() && config.dispatch_symbol_bias.is_none() {
            let elf_like = sets.iter().filter(|set| set.sections.iter().any(|s| s.name.starts_with(".data.rel.ro")));
            for set in elf_like {
                out.status(
                    "!",
                    &format!(
                        "{}: ELF sections but no --bias; _ZTV symbols need {} to reach the address point",
                        set.module,
                        config.symbol_bias(true)
                    ),
                )?;
            }
        }

        let split = object.as_ref().map(|obj| SplitProvider { layout: obj, types: &sets[0] });
        let jobs: Vec<(&dyn DebugInfoProvider, &str)> = match &split {
            Some(split) => vec![(split as &dyn DebugInfoProvider, sets[0].module.as_str())],
            None => sets.iter().map(|s| (s as &dyn DebugInfoProvider, s.module.as_str())).collect(),
        };

        out.status("*", &format!("Baking {} into {}", pluralize(jobs.len(), "module", "modules"), out_dir.display()))?;
        let progress = if args.no_progress || self.quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(jobs.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        };
        progress.set_message("building");

        let builder = MetadataBuilder::new(config.convention(), config.build_options(itanium));
        let results = pool.install(|| builder.build_many(&jobs));

        let mut failures = 0;
        for ((_, module), result) in jobs.iter().zip(results) {
            progress.set_message(module.to_string());
            progress.inc(1);
            let output = match result {
                Ok(output) => output,
                Err(err) => {
                    failures += 1;
                    progress.suspend(|| out.status("!", &format!("{}: {}", module, err)))?;
                    continue;
                }
            };
            let fingerprint = match choose_fingerprint(output.fingerprint.as_ref(), pinned.as_ref()) {
                Ok(fingerprint) => fingerprint,
                Err(reason) => {
                    failures += 1;
                    progress.suspend(|| out.status("!", &format!("{}: {}", module, reason)))?;
                    continue;
                }
            };

            let diagnostics = report::render_diagnostics(module, &output.report);
            let (types, entries) = (output.catalog.len(), output.dispatch.len());
            let table = TableFile::from_output(output).with_fingerprint(fingerprint);
            let path = TableFile::path_for(&out_dir, module);
            table.write_atomic(&path).with_context(|| format!("writing {}", path.display()))?;

            progress.suspend(|| -> std::io::Result<()> {
                out.status(
                    "+",
                    &format!(
                        "{}: {}, {} -> {}",
                        module,
                        pluralize(types, "type", "types"),
                        pluralize(entries, "dispatch entry", "dispatch entries"),
                        path.display()
                    ),
                )?;
                write!(out, "{}", diagnostics)
            })?;
        }
        progress.finish_and_clear();

        out.status("*", &format!("Done in {}", format_duration(start.elapsed())))?;
        if failures > 0 {
            bail!("{} failed", pluralize(failures, "module", "modules"));
        }
        Ok(())
    }

    /// Loaded configuration with the bake command's overrides applied.
    fn bake_config(&self, args: &BakeArgs) -> anyhow::Result<Config> {
        let mut config = self.config.clone();
        if let Some(slot) = args.slot {
            config = config.with_dispatch_slot(slot.into());
        }
        if let Some(bias) = args.bias {
            config = config.with_dispatch_symbol_bias(bias);
        }
        if let Some(width) = args.pointer_width {
            config = config.with_pointer_width(width);
        }
        if let Some(threads) = args.threads {
            config = config.with_threads(threads);
        }
        if let Some(dir) = &args.out_dir {
            config = config.with_table_dir(dir.clone());
        }
        if args.keep_secondary {
            config.skip_secondary_tables = false;
        }
        config.validate()?;
        Ok(config)
    }

    fn handle_inspect(&self, args: InspectArgs) -> anyhow::Result<()> {
        let table = read_table(&args.table)?;
        let mut out = DualOutput::create(false, args.report.as_deref()).context("creating report file")?;

        if let Some(name) = &args.type_name {
            let desc = table
                .catalog
                .find_by_name(name)
                .ok_or_else(|| anyhow!("{} has no class named {:?}", table.module(), name))?;
            if args.json {
                writeln!(out, "{}", serde_json::to_string_pretty(desc)?)?;
            } else {
                write!(out, "{}", report::render_type(&table.catalog, desc))?;
            }
            return Ok(());
        }

        if args.json {
            writeln!(out, "{}", serde_json::to_string_pretty(&report::inspect_rows(&table))?)?;
            return Ok(());
        }

        let header = &table.header;
        out.status(
            "*",
            &format!(
                "{} (format {}, {})",
                header.module,
                header.format_version,
                header.fingerprint.as_ref().map_or("no fingerprint".to_string(), |f| f.to_string())
            ),
        )?;
        write!(out, "{}", report::render_inspect(&table))?;
        Ok(())
    }

    fn handle_resolve(&self, args: ResolveArgs) -> anyhow::Result<()> {
        let dir = args.tables.clone().unwrap_or_else(|| self.config.table_dir.clone());
        let registry = TableRegistry::load_dir(&dir).with_context(|| format!("loading tables from {}", dir.display()))?;
        let map = ModuleMap::new();

        if let Some(pid) = args.pid {
            let summary = registry.sync(&map, &ProcMapsTracker::new(pid))?;
            self.status(
                "*",
                format!(
                    "pid {}: {} attached, {} without tables, {} stale",
                    pid,
                    summary.attached.len(),
                    summary.untracked.len(),
                    summary.stale.len()
                ),
            );
        } else if let (Some(module), Some(base)) = (&args.module, args.base) {
            let table = registry.get(module).ok_or_else(|| anyhow!("no table for module {}", module))?;
            let size = args.size.unwrap_or_else(|| table_extent(&table));
            map.attach(ModuleRecord::new(module, Address::new(base), size, table))?;
        } else {
            bail!("pass --pid or --module with --base");
        }

        for pointer in &args.pointers {
            let resolution = map.resolve(Address::new(*pointer));
            let owner = map.module_containing(Address::new(*pointer));
            let described = match (&resolution, &owner) {
                (Resolution::Resolved { type_index, .. }, Some(module)) => module
                    .table
                    .catalog
                    .get(*type_index)
                    .map_or_else(|| resolution.to_string(), |d| format!("{} ({})", d.name, resolution)),
                _ => resolution.to_string(),
            };
            println!("0x{:016x} {}", pointer, described);
        }
        Ok(())
    }

    fn handle_encode(&self, args: EncodeArgs) -> anyhow::Result<()> {
        let table = Arc::new(read_table(&args.table)?);
        let reader: Box<dyn MemoryReader> = match (&args.snapshot, args.snapshot_base, args.pid) {
            (Some(path), Some(base), _) => {
                let bytes = std::fs::read(path).with_context(|| format!("reading snapshot {}", path.display()))?;
                Box::new(SnapshotMemory::new(Address::new(base), bytes))
            }
            (None, _, Some(pid)) => Box::new(ProcessMemory::attach(pid)?),
            _ => bail!("pass --pid or --snapshot with --snapshot-base"),
        };
        let object = Address::new(args.address);
        let codec = BlobCodec::new(Arc::new(table.catalog.clone()));

        let (size, type_index) = match &args.type_name {
            Some(name) => {
                let desc = table.catalog.find_by_name(name).ok_or_else(|| anyhow!("no class named {:?}", name))?;
                (desc.size, desc.index)
            }
            None => {
                let base = args.module_base.ok_or_else(|| anyhow!("dispatch resolution needs --module-base"))?;
                let fallback = args.fallback_size.ok_or_else(|| anyhow!("dispatch resolution needs --fallback-size"))?;
                let map = ModuleMap::new();
                map.attach(ModuleRecord::new(table.module(), Address::new(base), table_extent(&table), table.clone()))?;
                let resolution = map.resolve_object(reader.as_ref(), object, table.catalog.convention(), fallback)?;
                if !resolution.is_resolved() {
                    self.status("!", format!("{} did not resolve, capturing {} raw bytes", object, fallback));
                }
                resolution.or_fallback(fallback)
            }
        };

        let blob = codec.encode(reader.as_ref(), object, size, type_index)?;
        std::fs::write(&args.out, blob.to_bytes()).with_context(|| format!("writing {}", args.out.display()))?;
        self.status("+", format!("{} bytes of {} -> {}", blob.size(), type_name(&table, type_index), args.out.display()));
        Ok(())
    }

    fn handle_decode(&self, args: DecodeArgs) -> anyhow::Result<()> {
        let table = read_table(&args.table)?;
        let blob = read_blob(&args.blob)?;
        let tree = BlobCodec::new(Arc::new(table.catalog)).decode(&blob);

        if args.json {
            println!("{}", serde_json::to_string_pretty(&tree)?);
        } else if args.summary {
            println!("{}", tree.summary());
        } else {
            print!("{}", tree.render());
        }
        Ok(())
    }

    fn handle_edit(&self, args: EditArgs) -> anyhow::Result<()> {
        let table = read_table(&args.table)?;
        let mut blob = read_blob(&args.blob)?;
        let codec = BlobCodec::new(Arc::new(table.catalog));

        let path = match (&args.field, &args.path) {
            (Some(field), _) => codec.resolve_path(blob.type_index(), field)?,
            (None, Some(path)) => path.parse::<FieldPath>()?,
            (None, None) => bail!("pass --field or --path"),
        };
        let value: EditValue = args.value.parse()?;
        let set = codec.apply_edit(&mut blob, &path, &value)?;

        let out = args.out.as_ref().unwrap_or(&args.blob);
        std::fs::write(out, blob.to_bytes()).with_context(|| format!("writing {}", out.display()))?;
        for request in &set.requests {
            self.status("+", format!("{} = {}: {} bytes at +0x{:X}", path, value, request.len(), request.offset));
        }

        if let (Some(pid), Some(address)) = (args.pid, args.address) {
            let mut process = ProcessMemory::attach(pid)?;
            set.apply(Address::new(address), &mut process)?;
            self.status("+", format!("mirrored onto pid {} at 0x{:x}", pid, address));
        }
        Ok(())
    }
}

/// The fingerprint a baked table is stamped with. A pinned one must agree
/// with whatever the debug info itself identifies.
fn choose_fingerprint(from_debug_info: Option<&Fingerprint>, pinned: Option<&Fingerprint>) -> Result<Fingerprint, String> {
    match (from_debug_info, pinned) {
        (Some(found), Some(pinned)) if found.kind == pinned.kind && found != pinned => {
            Err(format!("debug info is for {}, binary is {}", found, pinned))
        }
        (_, Some(pinned)) => Ok(pinned.clone()),
        (Some(found), None) => Ok(found.clone()),
        (None, None) => Err("no build fingerprint; pass --object, --binary or --fingerprint".to_string()),
    }
}

fn read_table(path: &Path) -> anyhow::Result<TableFile> {
    TableFile::read(path).with_context(|| format!("reading table {}", path.display()))
}

fn read_blob(path: &Path) -> anyhow::Result<Blob> {
    let bytes = std::fs::read(path).with_context(|| format!("reading blob {}", path.display()))?;
    Blob::from_bytes(&bytes).with_context(|| format!("parsing blob {}", path.display()))
}

/// Span covering every dispatch table, for modules attached without a known size.
fn table_extent(table: &TableFile) -> u64 {
    let pointer = table.catalog.convention().pointer_size();
    table
        .dispatch
        .entries()
        .last()
        .map_or(pointer, |e| e.relative_address + pointer)
}

fn type_name(table: &TableFile, index: TypeIndex) -> String {
    table
        .catalog
        .get(index)
        .map_or_else(|| index.to_string(), |d| d.name.clone())
}
