// src/workspace.rs

//! Workspace overrides: recipes whose packages come from a local source tree

use crate::reference::RecipeRef;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Recipes provided by local checkouts instead of binaries
///
/// Lookups ignore the recipe revision.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    packages: HashMap<RecipeRef, PathBuf>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, recipe: &RecipeRef, path: impl Into<PathBuf>) {
        self.packages.insert(recipe.without_revision(), path.into());
    }

    /// Local source folder overriding this recipe, if any
    pub fn get(&self, recipe: &RecipeRef) -> Option<&Path> {
        self.packages
            .get(&recipe.without_revision())
            .map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
