// src/remote/mod.rs

//! Remote servers: directory of known remotes and the fetcher contract
//!
//! The [`RemoteRegistry`] answers "which remote should this package come
//! from": by explicit name, by a remembered package association, or by a
//! remembered recipe association. The [`RemoteFetcher`] performs the
//! actual lookups and reports "not found" and "no remote available" as
//! ordinary outcomes rather than errors.

mod http;

pub use http::HttpFetcher;

use crate::error::{Error, Result};
use crate::manifest::{Manifest, PackageInfo};
use crate::reference::{PackageIdentity, RecipeRef, ResolvedPackageRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A configured remote server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
}

fn default_true() -> bool {
    true
}

impl Remote {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            verify_ssl: true,
        }
    }
}

/// Result of asking one remote about one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Found(T),
    /// The remote answered but does not have the package
    NotFound,
    /// No remote could be reached or none is configured
    RemoteUnavailable,
}

/// Remote package lookups
///
/// Both calls may refine the returned reference with a package revision.
/// `Err` is reserved for faults that must abort resolution.
pub trait RemoteFetcher {
    fn get_package_manifest(
        &self,
        pref: &ResolvedPackageRef,
        remote: &Remote,
    ) -> Result<FetchOutcome<(Manifest, ResolvedPackageRef)>>;

    fn get_package_info(
        &self,
        pref: &ResolvedPackageRef,
        remote: &Remote,
    ) -> Result<FetchOutcome<(PackageInfo, ResolvedPackageRef)>>;
}

/// Ordered remotes plus remembered recipe/package associations
#[derive(Debug, Clone, Default)]
pub struct RemoteRegistry {
    remotes: Vec<Remote>,
    /// Recipe (without revision) -> remote name
    recipes: HashMap<RecipeRef, String>,
    /// Package identity (recipe without revision) -> remote name
    packages: HashMap<PackageIdentity, String>,
}

impl RemoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an ordered list of remotes
    pub fn with_remotes(remotes: Vec<Remote>) -> Result<Self> {
        let mut registry = Self::new();
        for remote in remotes {
            registry.add(remote)?;
        }
        Ok(registry)
    }

    /// Append a remote; names must be unique
    pub fn add(&mut self, remote: Remote) -> Result<()> {
        if self.get(&remote.name).is_some() {
            return Err(Error::ConfigError(format!(
                "Remote '{}' is defined more than once",
                remote.name
            )));
        }
        self.remotes.push(remote);
        Ok(())
    }

    /// Remotes in configured order
    pub fn list(&self) -> &[Remote] {
        &self.remotes
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Remote> {
        self.remotes.iter().find(|r| r.name == name)
    }

    /// Remember that a recipe was obtained from `remote_name`
    pub fn set_recipe_remote(&mut self, recipe: &RecipeRef, remote_name: &str) -> Result<()> {
        self.ensure_known(remote_name)?;
        self.recipes
            .insert(recipe.without_revision(), remote_name.to_string());
        Ok(())
    }

    /// Remember that a package binary was obtained from `remote_name`
    pub fn set_package_remote(&mut self, id: &PackageIdentity, remote_name: &str) -> Result<()> {
        self.ensure_known(remote_name)?;
        self.packages
            .insert(package_key(id), remote_name.to_string());
        Ok(())
    }

    /// Remote remembered for this recipe
    pub fn for_recipe(&self, recipe: &RecipeRef) -> Option<&Remote> {
        self.recipes
            .get(&recipe.without_revision())
            .and_then(|name| self.get(name))
    }

    /// Remote remembered for this exact package
    pub fn for_package(&self, id: &PackageIdentity) -> Option<&Remote> {
        self.packages
            .get(&package_key(id))
            .and_then(|name| self.get(name))
    }

    /// Package association first, then the recipe association
    pub fn for_package_or_recipe(&self, id: &PackageIdentity) -> Option<&Remote> {
        self.for_package(id).or_else(|| self.for_recipe(&id.recipe))
    }

    fn ensure_known(&self, remote_name: &str) -> Result<()> {
        if self.get(remote_name).is_none() {
            return Err(Error::ConfigError(format!(
                "Unknown remote '{}'",
                remote_name
            )));
        }
        Ok(())
    }
}

fn package_key(id: &PackageIdentity) -> PackageIdentity {
    PackageIdentity::new(id.recipe.without_revision(), id.package_id.clone())
}
