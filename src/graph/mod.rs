// src/graph/mod.rs

//! Resolved dependency graph annotated with binary decisions
//!
//! The graph is an arena: nodes live in a `Vec` and refer to each other by
//! [`NodeId`]. Construction is the graph builder's job; the binary resolver
//! only writes the decision, resolved reference and remote of each node.

mod closure;
mod file;

pub use closure::private_closure;
pub use file::{GraphFile, NodeSpec, RequireSpec};

use crate::decision::BinaryDecision;
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::recipe::{Recipe, RecipeKind};
use crate::reference::ResolvedPackageRef;
use crate::remote::Remote;
use std::collections::BTreeMap;
use std::fmt;

/// Index of a node in its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A dependency edge; private edges are not visible to the node's consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub target: NodeId,
    pub private: bool,
}

/// One vertex of the dependency graph
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub kind: RecipeKind,
    pub recipe: Recipe,
    /// Set once the configuration fingerprint has been computed
    pub pref: Option<ResolvedPackageRef>,
    pub binary: BinaryDecision,
    /// Remote the binary comes from, when one was selected
    pub binary_remote: Option<Remote>,
    /// Newer remote manifest, set when the decision is `Update`
    pub update_manifest: Option<Manifest>,
    pub dependencies: Vec<Edge>,
}

impl GraphNode {
    pub fn new(kind: RecipeKind, recipe: Recipe) -> Self {
        Self {
            kind,
            recipe,
            pref: None,
            binary: BinaryDecision::Unset,
            binary_remote: None,
            update_manifest: None,
            dependencies: Vec::new(),
        }
    }

    /// Display name used in log messages
    pub fn display_ref(&self) -> String {
        match &self.pref {
            Some(pref) => pref.to_string(),
            None => self.recipe.reference.to_string(),
        }
    }
}

/// Arena-backed dependency graph
#[derive(Debug, Default)]
pub struct DepsGraph {
    nodes: Vec<GraphNode>,
}

impl DepsGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its id
    pub fn add_node(&mut self, node: GraphNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Add a dependency edge `from -> to`
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, private: bool) -> Result<()> {
        if to.0 >= self.nodes.len() {
            return Err(Error::InvariantViolation(format!(
                "edge target {} is not in the graph",
                to
            )));
        }
        let node = self.nodes.get_mut(from.0).ok_or_else(|| {
            Error::InvariantViolation(format!("edge source {} is not in the graph", from))
        })?;
        node.dependencies.push(Edge {
            target: to,
            private,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut GraphNode {
        &mut self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Direct dependencies reached through private edges
    pub fn private_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .dependencies
            .iter()
            .filter(|e| e.private)
            .map(|e| e.target)
            .collect()
    }

    /// Count of nodes per decision
    pub fn decision_summary(&self) -> BTreeMap<BinaryDecision, usize> {
        let mut summary = BTreeMap::new();
        for node in &self.nodes {
            if node.kind.has_binary() {
                *summary.entry(node.binary).or_insert(0) += 1;
            }
        }
        summary
    }
}
