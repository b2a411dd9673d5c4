// src/graph/file.rs

//! TOML description of an already-resolved dependency graph
//!
//! ```toml
//! [[nodes]]
//! id = "app"
//! ref = "app/1.0"
//! kind = "consumer"
//! requires = [{ node = "zlib" }, { node = "cmake", private = true }]
//!
//! [[nodes]]
//! id = "zlib"
//! ref = "zlib/1.2.13#5c0b3a"
//! settings = { os = "Linux", arch = "x86_64" }
//! options = { shared = "False" }
//! ```

use super::{DepsGraph, GraphNode, NodeId};
use crate::recipe::{Recipe, RecipeBuildPolicy, RecipeKind};
use crate::reference::RecipeRef;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Whole graph file
#[derive(Debug, Deserialize)]
pub struct GraphFile {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

/// One `[[nodes]]` entry
#[derive(Debug, Deserialize)]
pub struct NodeSpec {
    /// Local name used by `requires`; defaults to the reference text
    pub id: Option<String>,
    #[serde(rename = "ref")]
    pub reference: RecipeRef,
    #[serde(default)]
    pub kind: RecipeKind,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    pub build_policy: Option<RecipeBuildPolicy>,
    #[serde(default)]
    pub short_paths: bool,
    #[serde(default)]
    pub requires: Vec<RequireSpec>,
}

/// A dependency edge in the graph file
#[derive(Debug, Deserialize)]
pub struct RequireSpec {
    pub node: String,
    #[serde(default)]
    pub private: bool,
}

impl NodeSpec {
    fn key(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.reference.to_string())
    }
}

impl GraphFile {
    /// Load a graph file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read graph file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse graph file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Build the arena graph
    ///
    /// Public requirements contribute their `name/version` to the
    /// dependent's configuration fingerprint.
    pub fn into_graph(self) -> Result<DepsGraph> {
        let mut graph = DepsGraph::new();
        let mut ids: HashMap<String, NodeId> = HashMap::new();

        for spec in &self.nodes {
            let key = spec.key();
            let mut recipe = Recipe::new(spec.reference.clone());
            recipe.settings = spec.settings.clone();
            recipe.options = spec.options.clone();
            recipe.build_policy = spec.build_policy;
            recipe.short_paths = spec.short_paths;

            let id = graph.add_node(GraphNode::new(spec.kind, recipe));
            if ids.insert(key.clone(), id).is_some() {
                return Err(anyhow!("Duplicate node id in graph file: {}", key));
            }
        }

        for spec in &self.nodes {
            let from = ids[&spec.key()];
            for req in &spec.requires {
                let to = *ids
                    .get(&req.node)
                    .ok_or_else(|| anyhow!("Unknown node '{}' required by {}", req.node, spec.key()))?;
                graph.add_edge(from, to, req.private)?;
                if !req.private {
                    let base = graph.node(to).recipe.reference.base();
                    graph.node_mut(from).recipe.requires.push(base);
                }
            }
        }

        Ok(graph)
    }
}
