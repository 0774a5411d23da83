// Tue Jan 15 2026 - Alex

pub mod builder;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod memory;
pub mod resolver;
pub mod symbol;
pub mod table;
pub mod ui;
pub mod utils;

pub use builder::{BuildOptions, BuildOutput, MetadataBuilder};
pub use catalog::{LayoutConvention, TypeCatalog, TypeIndex};
pub use codec::{Blob, BlobCodec, DecodedTree, EditSet, EditValue, FieldPath};
pub use config::Config;
pub use resolver::{ModuleMap, ModuleRecord, Resolution};
pub use table::{DispatchTable, TableFile};
