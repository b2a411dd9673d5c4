// src/policy.rs

//! Build policy: when a package must, may, or must not be built from source
//!
//! [`BuildMode`] is parsed from the values of `--build`:
//!
//! | Input                 | Effect                                              |
//! |-----------------------|-----------------------------------------------------|
//! | (no `--build`)        | nothing forced, building missing binaries refused   |
//! | `--build` (no value)  | every package forced                                |
//! | `never`               | never build; cannot be combined                     |
//! | `missing`             | build whatever has no binary                        |
//! | `outdated`            | rebuild binaries built from an older recipe         |
//! | anything else         | glob matched against the recipe; match forces build |

use crate::error::{Error, Result};
use crate::recipe::{Recipe, RecipeBuildPolicy};
use crate::reference::RecipeRef;
use glob::Pattern;
use std::cell::RefCell;
use std::collections::BTreeSet;
use tracing::warn;

/// Queries the binary resolver makes about building
pub trait BuildPolicy {
    /// The package must be rebuilt regardless of available binaries
    fn forced(&self, recipe: &Recipe, reference: &RecipeRef) -> bool;

    /// Building is permitted when no binary is available
    fn allowed(&self, recipe: &Recipe) -> bool;

    /// Binaries built from a different recipe should be rebuilt
    fn outdated(&self) -> bool;
}

/// Build policy parsed from command-line values
#[derive(Debug, Default)]
pub struct BuildMode {
    all: bool,
    never: bool,
    missing: bool,
    outdated: bool,
    patterns: Vec<(String, Pattern)>,
    /// Patterns that have matched at least one package
    matched: RefCell<BTreeSet<String>>,
}

impl BuildMode {
    /// Parse `--build` values
    ///
    /// `None` means `--build` was not given; `Some(&[])` means it was given
    /// without a value.
    pub fn parse(values: Option<&[String]>) -> Result<Self> {
        let mut mode = Self::default();

        let Some(values) = values else {
            return Ok(mode);
        };

        if values.is_empty() {
            mode.all = true;
            return Ok(mode);
        }

        for value in values {
            match value.as_str() {
                "never" => mode.never = true,
                "missing" => mode.missing = true,
                "outdated" => mode.outdated = true,
                pattern => {
                    let compiled = Pattern::new(pattern).map_err(|e| {
                        Error::ConfigError(format!("Invalid build pattern '{}': {}", pattern, e))
                    })?;
                    mode.patterns.push((pattern.to_string(), compiled));
                }
            }
        }

        if mode.never && (mode.missing || mode.outdated || !mode.patterns.is_empty()) {
            return Err(Error::ConfigError(
                "--build=never is not compatible with other build options".to_string(),
            ));
        }

        Ok(mode)
    }

    /// Patterns that did not match any package so far
    pub fn unmatched_patterns(&self) -> Vec<String> {
        let matched = self.matched.borrow();
        self.patterns
            .iter()
            .map(|(raw, _)| raw)
            .filter(|raw| !matched.contains(*raw))
            .cloned()
            .collect()
    }

    /// Warn about patterns that never matched
    pub fn report_matches(&self) {
        for pattern in self.unmatched_patterns() {
            warn!("No package matching '{}' pattern", pattern);
        }
    }
}

impl BuildPolicy for BuildMode {
    fn forced(&self, recipe: &Recipe, reference: &RecipeRef) -> bool {
        if self.never {
            return false;
        }
        if self.all {
            return true;
        }
        if recipe.build_policy == Some(RecipeBuildPolicy::Always) {
            return true;
        }

        let full = reference.to_string();
        for (raw, pattern) in &self.patterns {
            if pattern.matches(&reference.name) || pattern.matches(&full) {
                self.matched.borrow_mut().insert(raw.clone());
                return true;
            }
        }
        false
    }

    fn allowed(&self, recipe: &Recipe) -> bool {
        if self.never {
            return false;
        }
        if self.missing || self.outdated {
            return true;
        }
        recipe.build_policy == Some(RecipeBuildPolicy::Missing)
    }

    fn outdated(&self) -> bool {
        self.outdated
    }
}
