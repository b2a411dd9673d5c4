// src/lib.rs

//! Binary resolution for a source/binary package manager
//!
//! Given a dependency graph of recipes with their configurations, decides
//! for every package whether its binary comes from the local cache, is
//! downloaded or updated from a remote, is built from source, is skipped,
//! or is missing.
//!
//! # Architecture
//!
//! - Identity: a package is a recipe reference plus a configuration fingerprint
//! - Memoization: equal identities in one graph are decided once
//! - Private dependencies: skipped when their consumer already has a binary
//! - Local cache: file-locked per package, corrupt folders erased on sight
//! - Remotes: "not found" and "unavailable" degrade, they never abort

pub mod analyzer;
pub mod config;
pub mod decision;
mod error;
pub mod graph;
pub mod hash;
pub mod manifest;
pub mod memo;
pub mod policy;
pub mod recipe;
pub mod reference;
pub mod remote;
pub mod store;
pub mod workspace;

pub use analyzer::BinaryAnalyzer;
pub use config::ResolverConfig;
pub use decision::BinaryDecision;
pub use error::{Error, Result};
pub use graph::{DepsGraph, GraphNode, NodeId};
pub use memo::EvaluatedNodes;
pub use policy::{BuildMode, BuildPolicy};
pub use recipe::{Recipe, RecipeKind};
pub use reference::{PackageIdentity, RecipeRef, ResolvedPackageRef};
pub use remote::{FetchOutcome, HttpFetcher, Remote, RemoteFetcher, RemoteRegistry};
pub use store::{ArtifactStore, LocalCache, PackageLock};
pub use workspace::Workspace;
