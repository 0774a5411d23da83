// Thu Jan 29 2026 - Alex

pub mod error;
pub mod map;
pub mod module;
pub mod registry;
pub mod resolution;
pub mod tracker;

pub use error::ResolverError;
pub use map::ModuleMap;
pub use module::ModuleRecord;
pub use registry::{SyncSummary, TableRegistry};
pub use resolution::Resolution;
pub use tracker::{parse_maps, LoadedModule, ModuleTracker, ProcMapsTracker, StaticTracker};
