// Tue Jan 20 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-width scalar kinds a field can be read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Bool,
    Char,
    I8,
    U8,
    WChar,
    Char16,
    Char32,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    I128,
    U128,
    F32,
    F64,
    HResult,
    Ptr32,
    Ptr64,
}

impl PrimitiveKind {
    pub fn size(self) -> u64 {
        match self {
            Self::Bool | Self::Char | Self::I8 | Self::U8 => 1,
            Self::WChar | Self::Char16 | Self::I16 | Self::U16 => 2,
            Self::Char32 | Self::I32 | Self::U32 | Self::F32 | Self::HResult | Self::Ptr32 => 4,
            Self::I64 | Self::U64 | Self::F64 | Self::Ptr64 => 8,
            Self::I128 | Self::U128 => 16,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::Char | Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::I128 | Self::HResult)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    pub fn is_pointer(self) -> bool {
        matches!(self, Self::Ptr32 | Self::Ptr64)
    }

    pub fn is_character(self) -> bool {
        matches!(self, Self::WChar | Self::Char16 | Self::Char32)
    }

    pub fn pointer(width: u64) -> Option<Self> {
        match width {
            4 => Some(Self::Ptr32),
            8 => Some(Self::Ptr64),
            _ => None,
        }
    }

    /// Maps a C/C++ spelling as printed by debug-info dumpers.
    pub fn from_c_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.ends_with('*') {
            return None;
        }
        let kind = match name {
            "bool" => Self::Bool,
            "char" | "signed char" => Self::Char,
            "__int8" | "int8_t" => Self::I8,
            "unsigned char" | "uint8_t" | "char8_t" => Self::U8,
            "wchar_t" => Self::WChar,
            "char16_t" => Self::Char16,
            "char32_t" => Self::Char32,
            "short" | "__int16" | "int16_t" => Self::I16,
            "unsigned short" | "uint16_t" => Self::U16,
            "int" | "long" | "__int32" | "int32_t" => Self::I32,
            "unsigned" | "unsigned int" | "unsigned long" | "uint32_t" => Self::U32,
            "__int64" | "long long" | "int64_t" => Self::I64,
            "unsigned __int64" | "unsigned long long" | "uint64_t" => Self::U64,
            "__int128" => Self::I128,
            "unsigned __int128" => Self::U128,
            "float" => Self::F32,
            "double" | "long double" => Self::F64,
            "HRESULT" => Self::HResult,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::I8 => "int8",
            Self::U8 => "uint8",
            Self::WChar => "wchar",
            Self::Char16 => "char16",
            Self::Char32 => "char32",
            Self::I16 => "int16",
            Self::U16 => "uint16",
            Self::I32 => "int32",
            Self::U32 => "uint32",
            Self::I64 => "int64",
            Self::U64 => "uint64",
            Self::I128 => "int128",
            Self::U128 => "uint128",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::HResult => "hresult",
            Self::Ptr32 => "ptr32",
            Self::Ptr64 => "ptr64",
        };
        f.write_str(name)
    }
}
