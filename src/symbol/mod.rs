// Thu Jan 22 2026 - Alex

pub mod demangle;
pub mod error;
pub mod object;
pub mod pdbutil;
pub mod provider;
pub mod records;

pub use demangle::{dispatch_table_name, DispatchTableName};
pub use error::SymbolError;
pub use object::ObjectProvider;
pub use provider::{DebugInfoProvider, RecordSet, SplitProvider};
pub use records::{
    ClassKind, ClassOptions, ClassRecord, DispatchSymbol, MemberRecord, RecordIndex, SectionHeader, TypeRecord, TypeRef,
};
