// Tue Jan 20 2026 - Alex

pub mod descriptor;
pub mod error;
pub mod primitive;
pub mod store;

pub use descriptor::{
    BaseDescriptor, BitField, FieldDescriptor, FieldType, LayoutConvention, SlotPosition, TypeDescriptor, TypeIndex,
    Visibility,
};
pub use error::CatalogError;
pub use primitive::PrimitiveKind;
pub use store::{validate_layout, TypeCatalog};
