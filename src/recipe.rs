// src/recipe.rs

//! Recipes as seen by the binary resolver
//!
//! Only the parts that influence binary identity are modelled here: the
//! reference, the build configuration (settings, options, requirement
//! package ids) and the recipe-declared build policy.

use crate::hash::{hash_bytes, HashAlgorithm};
use crate::reference::{PackageIdentity, RecipeRef};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// How a node's recipe entered the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeKind {
    /// Ordinary recipe from the cache or a remote
    #[default]
    Regular,
    /// The root consumer being installed (never decided here)
    Consumer,
    /// Synthetic root created for ad-hoc installs (never decided here)
    Virtual,
    /// Recipe consumed from an editable checkout
    Editable,
}

impl RecipeKind {
    pub fn as_str(&self) -> &str {
        match self {
            RecipeKind::Regular => "regular",
            RecipeKind::Consumer => "consumer",
            RecipeKind::Virtual => "virtual",
            RecipeKind::Editable => "editable",
        }
    }

    /// Consumer and virtual roots have no binary of their own
    pub fn has_binary(&self) -> bool {
        !matches!(self, RecipeKind::Consumer | RecipeKind::Virtual)
    }
}

impl fmt::Display for RecipeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build policy a recipe may declare for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeBuildPolicy {
    /// Build from source whenever no binary is available
    Missing,
    /// Always build from source
    Always,
}

/// A recipe with its binary-relevant configuration
#[derive(Debug, Clone)]
pub struct Recipe {
    pub reference: RecipeRef,
    /// Settings such as `os`, `arch`, `compiler`, `build_type`
    pub settings: BTreeMap<String, String>,
    /// Recipe options such as `shared=True`
    pub options: BTreeMap<String, String>,
    /// Public requirements (`name/version`) that affect this binary
    pub requires: Vec<String>,
    pub build_policy: Option<RecipeBuildPolicy>,
    /// Store the package under a compact path
    pub short_paths: bool,
}

impl Recipe {
    pub fn new(reference: RecipeRef) -> Self {
        Self {
            reference,
            settings: BTreeMap::new(),
            options: BTreeMap::new(),
            requires: Vec::new(),
            build_policy: None,
            short_paths: false,
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Configuration fingerprint of this recipe's binary
    ///
    /// Deterministic: settings and options iterate in key order and
    /// requirement ids are sorted before hashing.
    pub fn package_id(&self) -> String {
        let mut data = String::new();

        data.push_str("[settings]\n");
        for (k, v) in &self.settings {
            data.push_str(&format!("{}={}\n", k, v));
        }

        data.push_str("[options]\n");
        for (k, v) in &self.options {
            data.push_str(&format!("{}={}\n", k, v));
        }

        data.push_str("[requires]\n");
        let mut requires: Vec<_> = self.requires.iter().collect();
        requires.sort();
        for req in requires {
            data.push_str(req);
            data.push('\n');
        }

        hash_bytes(HashAlgorithm::Sha256, data.as_bytes()).value
    }

    /// Identity of the binary this recipe produces with its configuration
    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity::new(self.reference.clone(), self.package_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zlib() -> Recipe {
        Recipe::new(RecipeRef::new("zlib", "1.2.13"))
            .with_setting("os", "Linux")
            .with_setting("arch", "x86_64")
            .with_option("shared", "False")
    }

    #[test]
    fn test_package_id_deterministic() {
        assert_eq!(zlib().package_id(), zlib().package_id());
        assert_eq!(zlib().package_id().len(), 64);
    }

    #[test]
    fn test_package_id_ignores_insertion_order() {
        let a = Recipe::new(RecipeRef::new("zlib", "1.2.13"))
            .with_setting("arch", "x86_64")
            .with_setting("os", "Linux")
            .with_option("shared", "False");
        assert_eq!(a.package_id(), zlib().package_id());

        let mut b = zlib();
        b.requires = vec!["bbb".into(), "aaa".into()];
        let mut c = zlib();
        c.requires = vec!["aaa".into(), "bbb".into()];
        assert_eq!(b.package_id(), c.package_id());
    }

    #[test]
    fn test_package_id_changes_with_option() {
        let shared = zlib().with_option("shared", "True");
        assert_ne!(shared.package_id(), zlib().package_id());
    }

    #[test]
    fn test_package_id_independent_of_reference() {
        // Same configuration on a different version still yields the same id;
        // the identity differs through its recipe reference.
        let mut other = zlib();
        other.reference = RecipeRef::new("zlib", "1.3");
        assert_eq!(other.package_id(), zlib().package_id());
        assert_ne!(other.identity(), zlib().identity());
    }

    #[test]
    fn test_recipe_kind() {
        assert!(RecipeKind::Regular.has_binary());
        assert!(RecipeKind::Editable.has_binary());
        assert!(!RecipeKind::Consumer.has_binary());
        assert!(!RecipeKind::Virtual.has_binary());
        assert_eq!(RecipeKind::Editable.to_string(), "editable");
    }
}
