// src/memo.rs

//! Memoization of binary decisions within one resolution pass

use crate::graph::NodeId;
use crate::reference::PackageIdentity;
use std::collections::HashMap;

/// First node evaluated for each package identity
///
/// Created per pass and discarded afterwards. Later nodes with an equal
/// identity copy their decision, remote and reference from the recorded node
/// instead of consulting the store or remotes again.
#[derive(Debug, Default)]
pub struct EvaluatedNodes {
    nodes: HashMap<PackageIdentity, NodeId>,
}

impl EvaluatedNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &PackageIdentity) -> Option<NodeId> {
        self.nodes.get(id).copied()
    }

    /// Record `node` as the representative for `id`; the first one wins
    pub fn insert(&mut self, id: PackageIdentity, node: NodeId) {
        self.nodes.entry(id).or_insert(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::RecipeRef;

    #[test]
    fn test_first_insert_wins() {
        let mut memo = EvaluatedNodes::new();
        let id = PackageIdentity::new(RecipeRef::new("zlib", "1.2.13"), "abc");

        assert!(memo.get(&id).is_none());
        memo.insert(id.clone(), NodeId(1));
        memo.insert(id.clone(), NodeId(4));
        assert_eq!(memo.get(&id), Some(NodeId(1)));
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_distinct_package_ids() {
        let mut memo = EvaluatedNodes::new();
        let recipe = RecipeRef::new("zlib", "1.2.13");
        memo.insert(PackageIdentity::new(recipe.clone(), "a"), NodeId(0));
        memo.insert(PackageIdentity::new(recipe.clone(), "b"), NodeId(1));
        assert_eq!(memo.get(&PackageIdentity::new(recipe, "b")), Some(NodeId(1)));
    }
}
