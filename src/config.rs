// src/config.rs
//! Configuration file parsing for the resolver
//!
//! Supports TOML configuration files with the following sections:
//! - [cache] - Local cache root and revision tracking
//! - [[remotes]] - Remote servers, in lookup order
//! - [registry.recipes] / [registry.packages] - Remembered remote associations
//! - [workspace] - Recipes provided by local source trees

use crate::reference::{PackageIdentity, RecipeRef};
use crate::remote::{Remote, RemoteRegistry};
use crate::store::LocalCache;
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub cache: CacheSection,

    /// Remote servers in lookup order
    #[serde(default)]
    pub remotes: Vec<Remote>,

    #[serde(default)]
    pub registry: RegistrySection,

    /// Recipe reference to local source folder
    #[serde(default)]
    pub workspace: BTreeMap<String, PathBuf>,
}

/// Local cache section
#[derive(Debug, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Track recipe and package revisions
    #[serde(default)]
    pub revisions_enabled: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            revisions_enabled: false,
        }
    }
}

fn default_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".binresolve")
        .join("data")
}

/// Remembered remote associations
#[derive(Debug, Default, Deserialize)]
pub struct RegistrySection {
    /// Recipe reference to remote name
    #[serde(default)]
    pub recipes: BTreeMap<String, String>,

    /// Package reference (`recipe:package_id`) to remote name
    #[serde(default)]
    pub packages: BTreeMap<String, String>,
}

impl ResolverConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ResolverConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for remote in &self.remotes {
            if remote.name.is_empty() {
                anyhow::bail!("remotes: remote name must not be empty");
            }
            if remote.url.trim().is_empty() {
                anyhow::bail!("remotes.{}: url must not be empty", remote.name);
            }
            if !names.insert(remote.name.as_str()) {
                anyhow::bail!("remotes: duplicate remote '{}'", remote.name);
            }
        }

        let associations = self.registry.recipes.iter().chain(&self.registry.packages);
        for (reference, remote) in associations {
            if !names.contains(remote.as_str()) {
                anyhow::bail!(
                    "registry: '{}' refers to unknown remote '{}'",
                    reference,
                    remote
                );
            }
        }

        Ok(())
    }

    /// Open the local cache described by `[cache]`
    pub fn open_cache(&self) -> Result<LocalCache> {
        LocalCache::new(&self.cache.root, self.cache.revisions_enabled)
            .with_context(|| format!("Failed to open cache at {}", self.cache.root.display()))
    }

    /// Build the remote directory from `[[remotes]]` and `[registry]`
    pub fn remote_registry(&self) -> Result<RemoteRegistry> {
        let mut registry = RemoteRegistry::with_remotes(self.remotes.clone())?;

        for (reference, remote) in &self.registry.recipes {
            let recipe: RecipeRef = reference
                .parse()
                .with_context(|| format!("registry.recipes: invalid reference '{}'", reference))?;
            registry.set_recipe_remote(&recipe, remote)?;
        }
        for (reference, remote) in &self.registry.packages {
            let id: PackageIdentity = reference
                .parse()
                .with_context(|| format!("registry.packages: invalid reference '{}'", reference))?;
            registry.set_package_remote(&id, remote)?;
        }

        Ok(registry)
    }

    pub fn workspace(&self) -> Result<Workspace> {
        let mut workspace = Workspace::new();
        for (reference, path) in &self.workspace {
            let recipe: RecipeRef = reference
                .parse()
                .with_context(|| format!("workspace: invalid reference '{}'", reference))?;
            workspace.add(&recipe, path);
        }
        Ok(workspace)
    }
}
