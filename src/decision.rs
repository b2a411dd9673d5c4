// src/decision.rs

//! Per-node binary decision

use serde::Serialize;
use strum_macros::{Display, EnumString};

/// What must happen to a package before the build can proceed
///
/// `Unset` is the state every node starts in; the other variants are
/// terminal. A node is decided at most once per pass, except for the
/// skip overwrite applied through private-dependency closures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Display, EnumString,
    Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BinaryDecision {
    #[default]
    Unset,
    /// Package is consumed from an editable checkout
    Editable,
    /// Package is provided by a workspace override
    Workspace,
    /// Build from source
    Build,
    /// Reuse the binary already in the local cache
    Cache,
    /// Fetch the binary from a remote
    Download,
    /// Local binary exists but a newer one is on the remote
    Update,
    /// Not needed: only reachable privately from a package whose binary exists
    Skip,
    /// No binary anywhere and building is not permitted
    Missing,
}

impl BinaryDecision {
    #[inline]
    pub fn is_set(self) -> bool {
        self != Self::Unset
    }

    /// A usable binary exists or will be fetched, so nothing is compiled
    #[inline]
    pub fn provides_binary(self) -> bool {
        matches!(self, Self::Cache | Self::Download | Self::Update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_is_unset() {
        assert_eq!(BinaryDecision::default(), BinaryDecision::Unset);
        assert!(!BinaryDecision::Unset.is_set());
        assert!(BinaryDecision::Skip.is_set());
    }

    #[test]
    fn test_provides_binary() {
        assert!(BinaryDecision::Cache.provides_binary());
        assert!(BinaryDecision::Download.provides_binary());
        assert!(BinaryDecision::Update.provides_binary());
        assert!(!BinaryDecision::Build.provides_binary());
        assert!(!BinaryDecision::Missing.provides_binary());
        assert!(!BinaryDecision::Skip.provides_binary());
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(BinaryDecision::Download.to_string(), "download");
        assert_eq!(BinaryDecision::from_str("missing").unwrap(), BinaryDecision::Missing);
        assert_eq!(
            serde_json::to_string(&BinaryDecision::Workspace).unwrap(),
            "\"workspace\""
        );
    }
}
