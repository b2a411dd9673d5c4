// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use binresolve::manifest::{Manifest, PackageInfo, RecipeMetadata};
use binresolve::{
    ArtifactStore, Error, FetchOutcome, LocalCache, PackageIdentity, PackageLock, Recipe,
    RecipeRef, Remote, RemoteFetcher, ResolvedPackageRef, Result,
};
use chrono::{DateTime, TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// One lookup made against a [`MockFetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub kind: &'static str,
    pub remote: String,
    pub package: String,
}

/// Remote fetcher answering from in-memory tables and recording every call
#[derive(Default)]
pub struct MockFetcher {
    infos: HashMap<(String, PackageIdentity), (PackageInfo, ResolvedPackageRef)>,
    manifests: HashMap<(String, PackageIdentity), (Manifest, ResolvedPackageRef)>,
    unavailable: HashSet<String>,
    failing: HashSet<String>,
    calls: RefCell<Vec<FetchCall>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `info` for `pref` from `remote`, answering with `pref` as the
    /// refined reference
    pub fn with_info(mut self, remote: &str, pref: ResolvedPackageRef, info: PackageInfo) -> Self {
        self.infos
            .insert((remote.to_string(), pref.identity.clone()), (info, pref));
        self
    }

    pub fn with_manifest(
        mut self,
        remote: &str,
        pref: ResolvedPackageRef,
        manifest: Manifest,
    ) -> Self {
        self.manifests
            .insert((remote.to_string(), pref.identity.clone()), (manifest, pref));
        self
    }

    /// Every lookup on `remote` reports the remote as unavailable
    pub fn unavailable(mut self, remote: &str) -> Self {
        self.unavailable.insert(remote.to_string());
        self
    }

    /// Every lookup on `remote` fails fatally
    pub fn failing(mut self, remote: &str) -> Self {
        self.failing.insert(remote.to_string());
        self
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn lookup<T: Clone>(
        &self,
        kind: &'static str,
        table: &HashMap<(String, PackageIdentity), T>,
        pref: &ResolvedPackageRef,
        remote: &Remote,
    ) -> Result<FetchOutcome<T>> {
        self.calls.borrow_mut().push(FetchCall {
            kind,
            remote: remote.name.clone(),
            package: pref.to_string(),
        });

        if self.failing.contains(&remote.name) {
            return Err(Error::DownloadError(format!("{} rejected the request", remote.name)));
        }
        if self.unavailable.contains(&remote.name) {
            return Ok(FetchOutcome::RemoteUnavailable);
        }
        match table.get(&(remote.name.clone(), pref.identity.clone())) {
            Some(found) => Ok(FetchOutcome::Found(found.clone())),
            None => Ok(FetchOutcome::NotFound),
        }
    }
}

impl RemoteFetcher for MockFetcher {
    fn get_package_manifest(
        &self,
        pref: &ResolvedPackageRef,
        remote: &Remote,
    ) -> Result<FetchOutcome<(Manifest, ResolvedPackageRef)>> {
        self.lookup("manifest", &self.manifests, pref, remote)
    }

    fn get_package_info(
        &self,
        pref: &ResolvedPackageRef,
        remote: &Remote,
    ) -> Result<FetchOutcome<(PackageInfo, ResolvedPackageRef)>> {
        self.lookup("info", &self.infos, pref, remote)
    }
}

/// Local cache wrapper counting the operations the resolver performs
pub struct CountingStore {
    pub cache: LocalCache,
    locks: Cell<usize>,
    metadata_loads: Cell<usize>,
    existence_checks: Cell<usize>,
    removed: RefCell<Vec<PathBuf>>,
}

impl CountingStore {
    pub fn new(cache: LocalCache) -> Self {
        Self {
            cache,
            locks: Cell::new(0),
            metadata_loads: Cell::new(0),
            existence_checks: Cell::new(0),
            removed: RefCell::new(Vec::new()),
        }
    }

    pub fn locks(&self) -> usize {
        self.locks.get()
    }

    pub fn metadata_loads(&self) -> usize {
        self.metadata_loads.get()
    }

    pub fn existence_checks(&self) -> usize {
        self.existence_checks.get()
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.borrow().clone()
    }
}

impl ArtifactStore for CountingStore {
    fn package_folder(&self, id: &PackageIdentity, short_paths: bool) -> PathBuf {
        self.cache.package_folder(id, short_paths)
    }

    fn package_lock(&self, id: &PackageIdentity) -> Result<PackageLock> {
        self.locks.set(self.locks.get() + 1);
        self.cache.package_lock(id)
    }

    fn package_exists(&self, folder: &Path) -> bool {
        self.existence_checks.set(self.existence_checks.get() + 1);
        self.cache.package_exists(folder)
    }

    fn is_dirty(&self, folder: &Path) -> bool {
        self.cache.is_dirty(folder)
    }

    fn remove_folder(&self, folder: &Path) -> Result<()> {
        self.removed.borrow_mut().push(folder.to_path_buf());
        self.cache.remove_folder(folder)
    }

    fn revisions_enabled(&self) -> bool {
        self.cache.revisions_enabled()
    }

    fn load_metadata(&self, recipe: &RecipeRef) -> Result<RecipeMetadata> {
        self.metadata_loads.set(self.metadata_loads.get() + 1);
        self.cache.load_metadata(recipe)
    }

    fn load_manifest(&self, folder: &Path) -> Result<Manifest> {
        self.cache.load_manifest(folder)
    }

    fn load_package_info(&self, folder: &Path) -> Result<PackageInfo> {
        self.cache.load_package_info(folder)
    }

    fn recipe_summary_hash(&self, recipe: &RecipeRef) -> Result<String> {
        self.cache.recipe_summary_hash(recipe)
    }
}

/// Create a counting store over a fresh on-disk cache.
///
/// Returns (TempDir, store) - keep the TempDir alive to prevent cleanup.
pub fn setup_store(revisions_enabled: bool) -> (TempDir, CountingStore) {
    let temp_dir = tempfile::tempdir().unwrap();
    let cache = LocalCache::new(temp_dir.path().join("data"), revisions_enabled).unwrap();
    (temp_dir, CountingStore::new(cache))
}

/// Fixed point in time, `minutes` after a reference instant
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

pub fn recipe(name: &str, version: &str) -> Recipe {
    Recipe::new(RecipeRef::new(name, version)).with_setting("os", "Linux")
}

/// Install a binary for `recipe` in the cache, built from `recipe_hash`
pub fn install(store: &CountingStore, recipe: &Recipe, recipe_hash: &str, time: DateTime<Utc>) -> PathBuf {
    store
        .cache
        .store_package(
            &recipe.identity(),
            recipe.short_paths,
            &[("lib/lib.a", &b"binary"[..])],
            &PackageInfo::with_recipe_hash(recipe_hash),
            time,
        )
        .unwrap()
}

/// Export `recipe` to the cache; returns its summary hash
pub fn export(store: &CountingStore, recipe: &RecipeRef, content: &str) -> String {
    let manifest = Manifest::new(
        at(0),
        BTreeMap::from([("recipe.toml".to_string(), content.to_string())]),
    );
    store.cache.store_recipe_manifest(recipe, &manifest).unwrap();
    manifest.summary_hash()
}

/// Reference a remote would answer with for `recipe`
pub fn remote_pref(recipe: &Recipe, revision: &str) -> ResolvedPackageRef {
    ResolvedPackageRef::new(recipe.identity()).with_revision(revision)
}
