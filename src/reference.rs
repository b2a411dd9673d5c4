// src/reference.rs

//! Recipe and package references
//!
//! Textual forms:
//!
//! ```text
//! recipe:   zlib/1.2.13[@user/channel][#recipe_revision]
//! package:  <recipe>:<package_id>
//! resolved: <package>[#package_revision]
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Reference to a recipe, optionally pinned to a recipe revision
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipeRef {
    pub name: String,
    pub version: String,
    pub user: Option<String>,
    pub channel: Option<String>,
    pub revision: Option<String>,
}

impl RecipeRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            user: None,
            channel: None,
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// The same reference with the revision stripped
    pub fn without_revision(&self) -> Self {
        Self {
            revision: None,
            ..self.clone()
        }
    }

    /// `name/version[@user/channel]` without the revision
    pub fn base(&self) -> String {
        match (&self.user, &self.channel) {
            (Some(user), Some(channel)) => {
                format!("{}/{}@{}/{}", self.name, self.version, user, channel)
            }
            _ => format!("{}/{}", self.name, self.version),
        }
    }
}

impl fmt::Display for RecipeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base())?;
        if let Some(rev) = &self.revision {
            write!(f, "#{}", rev)?;
        }
        Ok(())
    }
}

fn valid_component(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+'))
}

impl FromStr for RecipeRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidReference(s.to_string());

        let (body, revision) = match s.split_once('#') {
            Some((body, rev)) if valid_component(rev) => (body, Some(rev.to_string())),
            Some(_) => return Err(invalid()),
            None => (s, None),
        };

        let (name_version, user_channel) = match body.split_once('@') {
            Some((nv, uc)) => (nv, Some(uc)),
            None => (body, None),
        };

        let (name, version) = name_version.split_once('/').ok_or_else(invalid)?;
        if !valid_component(name) || !valid_component(version) {
            return Err(invalid());
        }

        let (user, channel) = match user_channel {
            Some(uc) => {
                let (user, channel) = uc.split_once('/').ok_or_else(invalid)?;
                if !valid_component(user) || !valid_component(channel) {
                    return Err(invalid());
                }
                (Some(user.to_string()), Some(channel.to_string()))
            }
            None => (None, None),
        };

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            user,
            channel,
            revision,
        })
    }
}

/// A recipe reference plus its configuration fingerprint
///
/// Two identities are equal exactly when their binaries are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageIdentity {
    pub recipe: RecipeRef,
    pub package_id: String,
}

impl PackageIdentity {
    pub fn new(recipe: RecipeRef, package_id: impl Into<String>) -> Self {
        Self {
            recipe,
            package_id: package_id.into(),
        }
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.recipe, self.package_id)
    }
}

impl FromStr for PackageIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (recipe, package_id) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidReference(s.to_string()))?;
        if !valid_component(package_id) {
            return Err(Error::InvalidReference(s.to_string()));
        }
        Ok(Self::new(recipe.parse()?, package_id))
    }
}

/// A package identity with the package revision known so far
///
/// The revision is attached when a remote reports one while resolving.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPackageRef {
    pub identity: PackageIdentity,
    pub revision: Option<String>,
}

impl ResolvedPackageRef {
    pub fn new(identity: PackageIdentity) -> Self {
        Self {
            identity,
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

impl fmt::Display for ResolvedPackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identity)?;
        if let Some(rev) = &self.revision {
            write!(f, "#{}", rev)?;
        }
        Ok(())
    }
}

impl FromStr for ResolvedPackageRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // The package revision follows the package id, after the last ':'
        let (head, tail) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidReference(s.to_string()))?;
        let (package_id, revision) = match tail.split_once('#') {
            Some((id, rev)) => (id, Some(rev)),
            None => (tail, None),
        };
        let identity: PackageIdentity = format!("{}:{}", head, package_id).parse()?;
        match revision {
            Some(rev) if valid_component(rev) => Ok(Self::new(identity).with_revision(rev)),
            Some(_) => Err(Error::InvalidReference(s.to_string())),
            None => Ok(Self::new(identity)),
        }
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(RecipeRef);
string_serde!(PackageIdentity);
string_serde!(ResolvedPackageRef);
