// src/analyzer.rs

//! Binary analysis: decide, for every node of a resolved graph, whether its
//! binary is reused from the cache, downloaded, updated, built, skipped, or
//! missing.
//!
//! # Evaluation order
//!
//! Nodes with private dependencies are evaluated first. When such a node
//! ends up with a usable binary (cache, download or update), everything it
//! reaches only through private edges is marked `Skip` before the second
//! pass visits the remaining nodes.
//!
//! # Failure semantics
//!
//! Remote "not found" and "no remote available" outcomes degrade to a
//! warning and the decision proceeds without that information. Store faults
//! (lock, erase, metadata) abort the pass.

use crate::decision::BinaryDecision;
use crate::error::{Error, Result};
use crate::graph::{private_closure, DepsGraph, NodeId};
use crate::manifest::{Manifest, PackageInfo};
use crate::memo::EvaluatedNodes;
use crate::policy::BuildPolicy;
use crate::recipe::{Recipe, RecipeKind};
use crate::reference::ResolvedPackageRef;
use crate::remote::{FetchOutcome, Remote, RemoteFetcher, RemoteRegistry};
use crate::store::ArtifactStore;
use crate::workspace::Workspace;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of analyzing one node
struct Analysis {
    binary: BinaryDecision,
    remote: Option<Remote>,
    /// Remote manifest a cached binary is updated to
    update_manifest: Option<Manifest>,
}

impl Analysis {
    fn local(binary: BinaryDecision) -> Self {
        Self {
            binary,
            remote: None,
            update_manifest: None,
        }
    }
}

/// Binary resolution engine over a store, a remote directory and a fetcher
pub struct BinaryAnalyzer<'a> {
    store: &'a dyn ArtifactStore,
    registry: &'a RemoteRegistry,
    fetcher: &'a dyn RemoteFetcher,
    workspace: Option<&'a Workspace>,
}

impl<'a> BinaryAnalyzer<'a> {
    pub fn new(
        store: &'a dyn ArtifactStore,
        registry: &'a RemoteRegistry,
        fetcher: &'a dyn RemoteFetcher,
    ) -> Self {
        Self {
            store,
            registry,
            fetcher,
            workspace: None,
        }
    }

    /// Consult `workspace` for local overrides
    pub fn with_workspace(mut self, workspace: &'a Workspace) -> Self {
        self.workspace = Some(workspace);
        self
    }

    /// Decide the binary of every eligible node in `graph`
    ///
    /// `remote_name` restricts remote lookups to that remote. Every node in
    /// the private closure of a node with a binary becomes `Skip`, including
    /// that node itself when a private cycle leads back to it.
    pub fn resolve(
        &self,
        graph: &mut DepsGraph,
        policy: &dyn BuildPolicy,
        update: bool,
        remote_name: Option<&str>,
    ) -> Result<()> {
        let mut evaluated = EvaluatedNodes::new();

        for id in graph.node_ids() {
            if !Self::pending(graph, id) {
                continue;
            }
            let private_neighbors = graph.private_neighbors(id);
            if private_neighbors.is_empty() {
                continue;
            }

            self.evaluate_node(graph, id, policy, update, remote_name, &mut evaluated)?;

            if graph.node(id).binary.provides_binary() {
                for neighbor in private_neighbors {
                    let mut skipped = private_closure(graph, neighbor);
                    skipped.insert(neighbor);
                    for target in skipped {
                        let node = graph.node_mut(target);
                        if !node.kind.has_binary() {
                            continue;
                        }
                        debug!(
                            "{}: not needed, privately required by a package with a binary",
                            node.display_ref()
                        );
                        node.binary = BinaryDecision::Skip;
                    }
                }
            }
        }

        for id in graph.node_ids() {
            if Self::pending(graph, id) {
                self.evaluate_node(graph, id, policy, update, remote_name, &mut evaluated)?;
            }
        }

        Ok(())
    }

    fn pending(graph: &DepsGraph, id: NodeId) -> bool {
        let node = graph.node(id);
        node.kind.has_binary() && !node.binary.is_set()
    }

    /// Decide the binary of a single node
    ///
    /// The node must not be decided yet. Its resolved reference, decision,
    /// remote and update manifest are written in place.
    pub fn evaluate_node(
        &self,
        graph: &mut DepsGraph,
        id: NodeId,
        policy: &dyn BuildPolicy,
        update: bool,
        remote_name: Option<&str>,
        evaluated: &mut EvaluatedNodes,
    ) -> Result<()> {
        let node = graph.node(id);
        if node.binary.is_set() {
            return Err(Error::InvariantViolation(format!(
                "node {} ({}) already has binary decision '{}'",
                id,
                node.display_ref(),
                node.binary
            )));
        }

        let recipe = node.recipe.clone();
        let kind = node.kind;
        let identity = recipe.identity();
        let mut pref = ResolvedPackageRef::new(identity.clone());
        graph.node_mut(id).pref = Some(pref.clone());

        if let Some(previous) = evaluated.get(&identity) {
            let prev = graph.node(previous);
            let (binary, remote, update_manifest, prev_pref) = (
                prev.binary,
                prev.binary_remote.clone(),
                prev.update_manifest.clone(),
                prev.pref.clone(),
            );
            let node = graph.node_mut(id);
            node.binary = binary;
            node.binary_remote = remote;
            node.update_manifest = update_manifest;
            if prev_pref.is_some() {
                node.pref = prev_pref;
            }
            return Ok(());
        }
        evaluated.insert(identity, id);

        let analysis = self.analyze(&recipe, kind, &mut pref, policy, update, remote_name)?;

        let node = graph.node_mut(id);
        node.pref = Some(pref);
        node.binary = analysis.binary;
        node.binary_remote = analysis.remote;
        node.update_manifest = analysis.update_manifest;
        Ok(())
    }

    fn analyze(
        &self,
        recipe: &Recipe,
        kind: RecipeKind,
        pref: &mut ResolvedPackageRef,
        policy: &dyn BuildPolicy,
        update: bool,
        remote_name: Option<&str>,
    ) -> Result<Analysis> {
        if kind == RecipeKind::Editable {
            return Ok(Analysis::local(BinaryDecision::Editable));
        }

        if policy.forced(recipe, &recipe.reference) {
            warn!("{}: Forced build from source", pref);
            return Ok(Analysis::local(BinaryDecision::Build));
        }

        let identity = pref.identity.clone();
        let package_folder = self.store.package_folder(&identity, recipe.short_paths);

        if let Some(workspace) = self.workspace
            && let Some(path) = workspace.get(&recipe.reference)
        {
            debug!("{}: provided by workspace at {}", pref, path.display());
            return Ok(Analysis::local(BinaryDecision::Workspace));
        }

        {
            let _lock = self.store.package_lock(&identity)?;

            if self.store.is_dirty(&package_folder) {
                warn!(
                    "{}: Package is corrupted, removing folder: {}",
                    pref,
                    package_folder.display()
                );
                self.store.remove_folder(&package_folder)?;
            }

            if self.store.revisions_enabled() {
                let metadata = self.store.load_metadata(&recipe.reference)?;
                if let Some(recipe_revision) = metadata.package_recipe_revision(&identity.package_id)
                    && Some(recipe_revision) != recipe.reference.revision.as_deref()
                {
                    warn!(
                        "{}: The package doesn't belong to the installed recipe revision, removing folder",
                        pref
                    );
                    self.store.remove_folder(&package_folder)?;
                }
            }
        }

        let mut remote = match remote_name {
            Some(name) => {
                let found = self.registry.get(name).cloned();
                if found.is_none() {
                    warn!("{}: Remote '{}' is not defined", pref, name);
                }
                found
            }
            None => self.registry.for_package_or_recipe(&identity).cloned(),
        };
        let remotes = self.registry.list();

        let mut decision = BinaryDecision::Unset;
        // Digest of the recipe the chosen binary was built from
        let mut package_hash: Option<String> = None;
        let mut update_manifest = None;

        if self.store.package_exists(&package_folder) {
            if update {
                if let Some(selected) = &remote {
                    match self.fetcher.get_package_manifest(pref, selected)? {
                        FetchOutcome::NotFound => {
                            warn!("{}: Can't update, no package in remote", pref);
                        }
                        FetchOutcome::RemoteUnavailable => {
                            warn!("{}: Can't update, no remote defined", pref);
                        }
                        FetchOutcome::Found((upstream, remote_pref)) => {
                            if self.check_update(&upstream, &package_folder, pref)? {
                                decision = BinaryDecision::Update;
                                update_manifest = Some(upstream);
                                *pref = remote_pref;
                                if policy.outdated() {
                                    package_hash = self.remote_recipe_hash(pref, selected)?;
                                }
                            }
                        }
                    }
                } else if !remotes.is_empty() {
                    // Several remotes but none associated with this package:
                    // which one to check is not decided here
                } else {
                    warn!("{}: Can't update, no remote defined", pref);
                }
            }

            if !decision.is_set() {
                decision = BinaryDecision::Cache;
                package_hash = self.store.load_package_info(&package_folder)?.recipe_hash;
            }
        } else {
            let mut remote_info = None;
            if let Some(selected) = &remote {
                remote_info = self.fetch_info(pref, selected)?;
            }

            if remote.is_none()
                || (remote_info.is_none()
                    && self.store.revisions_enabled()
                    && remote_name.is_none())
            {
                for candidate in remotes {
                    if let Some(found) = self.fetch_info(pref, candidate)? {
                        remote_info = Some(found);
                        remote = Some(candidate.clone());
                        break;
                    }
                }
            }

            match remote_info {
                Some((info, remote_pref)) => {
                    decision = BinaryDecision::Download;
                    *pref = remote_pref;
                    package_hash = info.recipe_hash;
                }
                None if policy.allowed(recipe) => decision = BinaryDecision::Build,
                None => decision = BinaryDecision::Missing,
            }
        }

        if policy.outdated() && decision.provides_binary() {
            let local_recipe_hash = self.store.recipe_summary_hash(&recipe.reference)?;
            if package_hash.as_deref() != Some(local_recipe_hash.as_str()) {
                info!("{}: Outdated package!", pref);
                decision = BinaryDecision::Build;
            } else {
                info!("{}: Package is up to date", pref);
            }
        }

        Ok(Analysis {
            binary: decision,
            remote,
            update_manifest,
        })
    }

    /// Local binary differs from the remote one and the remote one is newer
    fn check_update(
        &self,
        upstream: &Manifest,
        package_folder: &Path,
        pref: &ResolvedPackageRef,
    ) -> Result<bool> {
        let local = self.store.load_manifest(package_folder)?;
        if *upstream == local {
            return Ok(false);
        }
        if upstream.time > local.time {
            warn!("{}: Current package is older than remote upstream one", pref);
            Ok(true)
        } else {
            warn!("{}: Current package is newer than remote upstream one", pref);
            Ok(false)
        }
    }

    /// Package info from one remote; "not found" and "unavailable" yield `None`
    fn fetch_info(
        &self,
        pref: &ResolvedPackageRef,
        remote: &Remote,
    ) -> Result<Option<(PackageInfo, ResolvedPackageRef)>> {
        match self.fetcher.get_package_info(pref, remote)? {
            FetchOutcome::Found(found) => Ok(Some(found)),
            FetchOutcome::NotFound => Ok(None),
            FetchOutcome::RemoteUnavailable => {
                warn!("{}: Remote '{}' is not available", pref, remote.name);
                Ok(None)
            }
        }
    }

    /// Recipe digest of the updated binary, refining `pref` with the remote answer
    fn remote_recipe_hash(
        &self,
        pref: &mut ResolvedPackageRef,
        remote: &Remote,
    ) -> Result<Option<String>> {
        match self.fetch_info(pref, remote)? {
            Some((info, remote_pref)) => {
                *pref = remote_pref;
                Ok(info.recipe_hash)
            }
            None => {
                warn!("{}: Can't check if the updated package is outdated", pref);
                Ok(None)
            }
        }
    }
}
