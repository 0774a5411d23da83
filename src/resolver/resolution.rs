// Thu Jan 29 2026 - Alex

use crate::catalog::TypeIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of looking up a dispatch pointer. A miss is an ordinary result:
/// the caller copies the statically known size instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Resolved { size: u64, type_index: TypeIndex },
    Unresolved,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// `(size, type index)` to encode with. On a miss this is the declared
    /// type's size tagged [`TypeIndex::UNKNOWN`], a possibly truncated but
    /// never over-sized copy.
    pub fn or_fallback(self, static_size: u64) -> (u64, TypeIndex) {
        match self {
            Self::Resolved { size, type_index } => (size, type_index),
            Self::Unresolved => (static_size, TypeIndex::UNKNOWN),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved { size, type_index } => write!(f, "{} ({} bytes)", type_index, size),
            Self::Unresolved => write!(f, "unresolved"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback() {
        let hit = Resolution::Resolved { size: 24, type_index: TypeIndex(1) };
        assert_eq!(hit.or_fallback(16), (24, TypeIndex(1)));
        assert_eq!(Resolution::Unresolved.or_fallback(16), (16, TypeIndex::UNKNOWN));
        assert!(!Resolution::Unresolved.is_resolved());
    }
}
