// src/store.rs

//! Local artifact store
//!
//! [`ArtifactStore`] is what the binary resolver needs from the local cache;
//! [`LocalCache`] implements it on a plain directory tree:
//!
//! ```text
//! <root>/<name>/<version>/<user>/<channel>/
//!     metadata.json               revisions of the recipe and its packages
//!     export/manifest.json        manifest of the exported recipe
//!     package/<package_id>/       package folder
//!         manifest.json
//!         info.json
//!     package/<package_id>.dirty  corruption marker
//! <root>/.short/<hash>/           package folders stored with short paths
//! <root>/locks/<hash>.lock        per-package locks
//! ```

use crate::error::{Error, Result};
use crate::hash::{hash_bytes, HashAlgorithm};
use crate::manifest::{
    Manifest, PackageInfo, RecipeMetadata, MANIFEST_FILE, PACKAGE_INFO_FILE,
};
use crate::reference::{PackageIdentity, RecipeRef};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

const METADATA_FILE: &str = "metadata.json";
const DIRTY_SUFFIX: &str = ".dirty";

/// Exclusive hold on one package slot of the store
///
/// Released when dropped.
#[derive(Debug)]
pub struct PackageLock {
    file: Option<File>,
    path: PathBuf,
}

impl PackageLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PackageLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
            debug!("Released package lock {}", self.path.display());
        }
    }
}

/// Local cache operations used while resolving binaries
pub trait ArtifactStore {
    /// Folder holding the binary for this package
    fn package_folder(&self, id: &PackageIdentity, short_paths: bool) -> PathBuf;

    /// Block until this process holds the package's slot exclusively
    fn package_lock(&self, id: &PackageIdentity) -> Result<PackageLock>;

    /// A package folder is present
    fn package_exists(&self, folder: &Path) -> bool;

    /// The folder was left half-written by an interrupted operation
    fn is_dirty(&self, folder: &Path) -> bool;

    /// Erase a package folder and its corruption marker
    fn remove_folder(&self, folder: &Path) -> Result<()>;

    /// Recipe and package revisions are tracked
    fn revisions_enabled(&self) -> bool;

    fn load_metadata(&self, recipe: &RecipeRef) -> Result<RecipeMetadata>;

    fn load_manifest(&self, folder: &Path) -> Result<Manifest>;

    fn load_package_info(&self, folder: &Path) -> Result<PackageInfo>;

    /// Summary hash of the locally exported recipe
    fn recipe_summary_hash(&self, recipe: &RecipeRef) -> Result<String>;
}

/// Filesystem-backed artifact store
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
    revisions_enabled: bool,
}

impl LocalCache {
    /// Open (creating if needed) a cache rooted at `root`
    pub fn new(root: impl Into<PathBuf>, revisions_enabled: bool) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            Error::IoError(format!("Failed to create cache at {}: {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            revisions_enabled,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder of everything belonging to one recipe
    pub fn recipe_folder(&self, recipe: &RecipeRef) -> PathBuf {
        self.root
            .join(&recipe.name)
            .join(&recipe.version)
            .join(recipe.user.as_deref().unwrap_or("_"))
            .join(recipe.channel.as_deref().unwrap_or("_"))
    }

    pub fn export_folder(&self, recipe: &RecipeRef) -> PathBuf {
        self.recipe_folder(recipe).join("export")
    }

    fn identity_hash(id: &PackageIdentity) -> String {
        let key = format!("{}:{}", id.recipe.base(), id.package_id);
        hash_bytes(HashAlgorithm::Xxh128, key.as_bytes()).value
    }

    fn dirty_marker(folder: &Path) -> PathBuf {
        let mut marker = folder.as_os_str().to_owned();
        marker.push(DIRTY_SUFFIX);
        PathBuf::from(marker)
    }

    /// Flag a package folder as corrupted
    pub fn mark_dirty(&self, folder: &Path) -> Result<()> {
        let marker = Self::dirty_marker(folder);
        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(&marker)?;
        Ok(())
    }

    /// Install package contents: writes the files, `info.json` and the manifest
    ///
    /// `files` are relative paths with their contents. Returns the folder.
    pub fn store_package(
        &self,
        id: &PackageIdentity,
        short_paths: bool,
        files: &[(&str, &[u8])],
        info: &PackageInfo,
        time: chrono::DateTime<chrono::Utc>,
    ) -> Result<PathBuf> {
        let folder = self.package_folder(id, short_paths);
        fs::create_dir_all(&folder)?;

        for (rel, content) in files {
            let path = folder.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)?;
        }
        info.save(&folder.join(PACKAGE_INFO_FILE))?;

        let manifest = Manifest::from_folder(&folder, time)?;
        manifest.save(&folder.join(MANIFEST_FILE))?;
        Ok(folder)
    }

    pub fn save_metadata(&self, recipe: &RecipeRef, metadata: &RecipeMetadata) -> Result<()> {
        let path = self.recipe_folder(recipe).join(METADATA_FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(metadata)?)?;
        Ok(())
    }

    /// Write the exported recipe manifest
    pub fn store_recipe_manifest(&self, recipe: &RecipeRef, manifest: &Manifest) -> Result<()> {
        manifest.save(&self.export_folder(recipe).join(MANIFEST_FILE))
    }
}

impl ArtifactStore for LocalCache {
    fn package_folder(&self, id: &PackageIdentity, short_paths: bool) -> PathBuf {
        if short_paths {
            let hash = Self::identity_hash(id);
            self.root.join(".short").join(&hash[..12])
        } else {
            self.recipe_folder(&id.recipe)
                .join("package")
                .join(&id.package_id)
        }
    }

    fn package_lock(&self, id: &PackageIdentity) -> Result<PackageLock> {
        let dir = self.root.join("locks");
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.lock", Self::identity_hash(id)));

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| {
                Error::LockError(format!("Failed to open lock {}: {}", path.display(), e))
            })?;
        file.lock_exclusive().map_err(|e| {
            Error::LockError(format!("Failed to lock {} for {}: {}", path.display(), id, e))
        })?;

        debug!("Acquired package lock for {}", id);
        Ok(PackageLock {
            file: Some(file),
            path,
        })
    }

    fn package_exists(&self, folder: &Path) -> bool {
        folder.is_dir()
    }

    fn is_dirty(&self, folder: &Path) -> bool {
        Self::dirty_marker(folder).exists()
    }

    fn remove_folder(&self, folder: &Path) -> Result<()> {
        if folder.exists() {
            fs::remove_dir_all(folder).map_err(|e| {
                Error::IoError(format!("Failed to remove {}: {}", folder.display(), e))
            })?;
        }
        let marker = Self::dirty_marker(folder);
        if marker.exists() {
            fs::remove_file(&marker)?;
        }
        Ok(())
    }

    fn revisions_enabled(&self) -> bool {
        self.revisions_enabled
    }

    fn load_metadata(&self, recipe: &RecipeRef) -> Result<RecipeMetadata> {
        let path = self.recipe_folder(recipe).join(METADATA_FILE);
        if !path.exists() {
            return Ok(RecipeMetadata::default());
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::ParseError(format!("{}: {}", path.display(), e)))
    }

    fn load_manifest(&self, folder: &Path) -> Result<Manifest> {
        Manifest::load(&folder.join(MANIFEST_FILE))
    }

    fn load_package_info(&self, folder: &Path) -> Result<PackageInfo> {
        PackageInfo::load(&folder.join(PACKAGE_INFO_FILE))
    }

    fn recipe_summary_hash(&self, recipe: &RecipeRef) -> Result<String> {
        let manifest = Manifest::load(&self.export_folder(recipe).join(MANIFEST_FILE))?;
        Ok(manifest.summary_hash())
    }
}
