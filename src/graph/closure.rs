// src/graph/closure.rs

//! Private-edge reachability

use super::{DepsGraph, NodeId};
use std::collections::{BTreeSet, VecDeque};

/// Every node reachable from `start` following only private edges
///
/// `start` itself is not part of the result unless a private cycle leads
/// back to it.
pub fn private_closure(graph: &DepsGraph, start: NodeId) -> BTreeSet<NodeId> {
    let mut reached = BTreeSet::new();
    let mut queue: VecDeque<NodeId> = graph.private_neighbors(start).into();

    while let Some(id) = queue.pop_front() {
        if !reached.insert(id) {
            continue;
        }
        for next in graph.private_neighbors(id) {
            if !reached.contains(&next) {
                queue.push_back(next);
            }
        }
    }

    reached
}
