use crate::graph::edge::EdgeId;
use crate::graph::node::NodeId;

/// Per-search bookkeeping for the augmenting-path BFS.
///
/// Lives outside the graph so the topology carries no solver state and
/// independent solves never see each other's marks.
pub struct SearchScratch {
    visited: Vec<bool>,
    via: Vec<Option<EdgeId>>,
}

impl SearchScratch {
    pub fn new(slots: usize) -> Self {
        Self {
            visited: vec![false; slots],
            via: vec![None; slots],
        }
    }

    /// Clears all marks, growing to `slots` if the graph grew.
    pub fn reset(&mut self, slots: usize) {
        self.visited.clear();
        self.visited.resize(slots, false);
        self.via.clear();
        self.via.resize(slots, None);
    }

    pub fn is_visited(&self, node: NodeId) -> bool {
        self.visited.get(node.index()).copied().unwrap_or(false)
    }

    pub fn visit(&mut self, node: NodeId, via: Option<EdgeId>) {
        if let Some(slot) = self.visited.get_mut(node.index()) {
            *slot = true;
            self.via[node.index()] = via;
        }
    }

    /// The edge through which `node` was first reached.
    pub fn via(&self, node: NodeId) -> Option<EdgeId> {
        self.via.get(node.index()).copied().flatten()
    }
}
