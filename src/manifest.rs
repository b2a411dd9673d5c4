// src/manifest.rs

//! Persisted package and recipe descriptors
//!
//! - [`Manifest`]: file digests plus a creation timestamp, stored next to a
//!   package (or an exported recipe)
//! - [`PackageInfo`]: binary description, carrying the digest of the recipe
//!   the binary was built from
//! - [`RecipeMetadata`]: revision bookkeeping for a recipe and its packages

use crate::error::{Error, Result};
use crate::hash::{hash_bytes, sha256_reader, HashAlgorithm};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use walkdir::WalkDir;

/// File name of a manifest inside a package or export folder
pub const MANIFEST_FILE: &str = "manifest.json";

/// File name of the package info inside a package folder
pub const PACKAGE_INFO_FILE: &str = "info.json";

/// Digest of every file in a folder, plus when the manifest was created
///
/// Equality compares file digests only; two manifests with the same content
/// but different timestamps are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub time: DateTime<Utc>,
    /// Relative path (forward slashes) -> SHA-256 hex digest
    pub files: BTreeMap<String, String>,
}

impl PartialEq for Manifest {
    fn eq(&self, other: &Self) -> bool {
        self.files == other.files
    }
}

impl Eq for Manifest {}

impl Manifest {
    pub fn new(time: DateTime<Utc>, files: BTreeMap<String, String>) -> Self {
        Self { time, files }
    }

    /// Compute the manifest of `folder`, skipping any existing manifest file
    pub fn from_folder(folder: &Path, time: DateTime<Utc>) -> Result<Self> {
        let mut files = BTreeMap::new();

        for entry in WalkDir::new(folder).follow_links(false) {
            let entry = entry.map_err(|e| {
                Error::IoError(format!("Failed to walk {}: {}", folder.display(), e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let rel = entry
                .path()
                .strip_prefix(folder)
                .map_err(|e| Error::IoError(e.to_string()))?;
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if rel == MANIFEST_FILE {
                continue;
            }

            let mut file = File::open(entry.path())?;
            let digest = sha256_reader(&mut file)?;
            files.insert(rel, digest.value);
        }

        Ok(Self { time, files })
    }

    /// Single digest summarizing all file digests
    pub fn summary_hash(&self) -> String {
        let mut data = String::new();
        for (path, digest) in &self.files {
            data.push_str(path);
            data.push_str(": ");
            data.push_str(digest);
            data.push('\n');
        }
        hash_bytes(HashAlgorithm::Sha256, data.as_bytes()).value
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(path, self)
    }
}

/// Description of a built binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Summary hash of the recipe this binary was built from
    pub recipe_hash: Option<String>,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl PackageInfo {
    pub fn with_recipe_hash(recipe_hash: impl Into<String>) -> Self {
        Self {
            recipe_hash: Some(recipe_hash.into()),
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(path, self)
    }
}

/// Revision bookkeeping of one installed package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRevisions {
    pub revision: Option<String>,
    /// Recipe revision the binary was built from
    pub recipe_revision: Option<String>,
}

/// Revision bookkeeping of a recipe and its installed packages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeMetadata {
    pub recipe_revision: Option<String>,
    /// Package id -> revisions
    #[serde(default)]
    pub packages: BTreeMap<String, PackageRevisions>,
}

impl RecipeMetadata {
    /// Recipe revision recorded for a package id, if any
    pub fn package_recipe_revision(&self, package_id: &str) -> Option<&str> {
        self.packages
            .get(package_id)
            .and_then(|p| p.recipe_revision.as_deref())
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::ParseError(format!("{}: {}", path.display(), e)))
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_equality_ignores_time() {
        let files = BTreeMap::from([("lib/libz.a".to_string(), "aa".to_string())]);
        let a = Manifest::new(at(100), files.clone());
        let b = Manifest::new(at(200), files);
        assert_eq!(a, b);

        let c = Manifest::new(at(100), BTreeMap::new());
        assert_ne!(a, c);
    }

    #[test]
    fn test_from_folder_skips_manifest() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("lib")).unwrap();
        std::fs::write(temp.path().join("lib/libz.a"), b"archive").unwrap();
        std::fs::write(temp.path().join("info.json"), b"{}").unwrap();
        std::fs::write(temp.path().join(MANIFEST_FILE), b"stale").unwrap();

        let manifest = Manifest::from_folder(temp.path(), at(0)).unwrap();
        let paths: Vec<_> = manifest.files.keys().cloned().collect();
        assert_eq!(paths, vec!["info.json".to_string(), "lib/libz.a".to_string()]);
    }

    #[test]
    fn test_summary_hash_tracks_content() {
        let a = Manifest::new(at(0), BTreeMap::from([("f".to_string(), "1".to_string())]));
        let b = Manifest::new(at(5), BTreeMap::from([("f".to_string(), "1".to_string())]));
        let c = Manifest::new(at(0), BTreeMap::from([("f".to_string(), "2".to_string())]));
        assert_eq!(a.summary_hash(), b.summary_hash());
        assert_ne!(a.summary_hash(), c.summary_hash());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/manifest.json");
        let manifest = Manifest::new(at(42), BTreeMap::from([("a".to_string(), "b".to_string())]));
        manifest.save(&path).unwrap();

        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.time, at(42));
    }

    #[test]
    fn test_load_garbage_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("info.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(PackageInfo::load(&path), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_metadata_lookup() {
        let mut meta = RecipeMetadata::default();
        meta.packages.insert(
            "abc".to_string(),
            PackageRevisions {
                revision: Some("p1".to_string()),
                recipe_revision: Some("r1".to_string()),
            },
        );
        assert_eq!(meta.package_recipe_revision("abc"), Some("r1"));
        assert_eq!(meta.package_recipe_revision("zzz"), None);
    }
}
