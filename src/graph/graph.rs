use crate::error::{NetworkError, Result};
use crate::graph::edge::{Edge, EdgeId};
use crate::graph::node::{Node, NodeId};
use std::collections::HashMap;

/// Codes starting with this prefix belong to the solver's virtual terminals.
pub const RESERVED_PREFIX: char = '@';

/// Owns every node and link of the network.
///
/// Nodes and edges live in slot arenas addressed by [`NodeId`] / [`EdgeId`].
/// Removed slots are recycled, so an id is only meaningful while the entity
/// it was issued for is still present. Nodes list their incident edges and
/// edges refer to their endpoints by id; nothing holds a reference into the
/// arenas across calls.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    free_nodes: Vec<usize>,
    free_edges: Vec<usize>,
    by_code: HashMap<String, NodeId>,
    by_name: HashMap<String, NodeId>,
    by_endpoints: HashMap<(NodeId, NodeId), EdgeId>,
    /// bumped by every public mutation of topology, capacity or flags
    generation: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    pub fn add_node(&mut self, node: Node) -> Result<NodeId> {
        if node.code().starts_with(RESERVED_PREFIX) {
            return Err(NetworkError::ReservedCode {
                code: node.code().to_string(),
            });
        }
        let id = self.insert_node(node)?;
        self.touch();
        Ok(id)
    }

    /// Inserts without the reserved-code check or a generation bump.
    pub(crate) fn insert_node(&mut self, node: Node) -> Result<NodeId> {
        if self.by_code.contains_key(node.code()) {
            return Err(NetworkError::DuplicateNode {
                code: node.code().to_string(),
            });
        }
        let id = match self.free_nodes.pop() {
            Some(slot) => NodeId(slot),
            None => {
                self.nodes.push(None);
                NodeId(self.nodes.len() - 1)
            }
        };
        self.by_code.insert(node.code().to_string(), id);
        if let Some(name) = node.name() {
            self.by_name.entry(name.to_string()).or_insert(id);
        }
        self.nodes[id.index()] = Some(node);
        Ok(id)
    }

    /// Adds a link between two existing nodes.
    ///
    /// A bidirectional link becomes two directed edges with the full capacity
    /// each, tied together as twins. Returns the `origin -> dest` edge.
    pub fn add_edge(
        &mut self,
        origin: &str,
        dest: &str,
        capacity: u64,
        bidirectional: bool,
    ) -> Result<EdgeId> {
        let from = self.require_node(origin)?;
        let to = self.require_node(dest)?;
        let duplicate = self.by_endpoints.contains_key(&(from, to))
            || (bidirectional && self.by_endpoints.contains_key(&(to, from)));
        if duplicate {
            return Err(NetworkError::DuplicateEdge {
                origin: origin.to_string(),
                dest: dest.to_string(),
            });
        }
        let forward = self.link(from, to, capacity);
        if bidirectional {
            let backward = self.link(to, from, capacity);
            self.tie_twins(forward, backward);
        }
        self.touch();
        Ok(forward)
    }

    /// Raw directed insertion between live nodes; no duplicate check.
    pub(crate) fn link(&mut self, from: NodeId, to: NodeId, capacity: u64) -> EdgeId {
        let id = match self.free_edges.pop() {
            Some(slot) => EdgeId(slot),
            None => {
                self.edges.push(None);
                EdgeId(self.edges.len() - 1)
            }
        };
        self.edges[id.index()] = Some(Edge::new(from, to, capacity));
        if let Some(node) = self.node_mut(from) {
            node.attach_outgoing(id);
        }
        if let Some(node) = self.node_mut(to) {
            node.attach_incoming(id);
        }
        self.by_endpoints.insert((from, to), id);
        id
    }

    fn tie_twins(&mut self, a: EdgeId, b: EdgeId) {
        if let Some(edge) = self.edge_mut(a) {
            edge.set_twin(Some(b));
        }
        if let Some(edge) = self.edge_mut(b) {
            edge.set_twin(Some(a));
        }
    }

    /// Removes a node together with every link incident to it.
    pub fn remove_node(&mut self, code: &str) -> Result<Node> {
        let id = self.require_node(code)?;
        let node = self.detach_node(id)?;
        self.touch();
        Ok(node)
    }

    /// Cost is proportional to the node's degree (plus its neighbours'
    /// adjacency lists), never to the total number of edges.
    pub(crate) fn detach_node(&mut self, id: NodeId) -> Result<Node> {
        let node = self
            .nodes
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or_else(|| NetworkError::node_not_found(format!("#{}", id.index())))?;

        for edge in node.outgoing().iter().chain(node.incoming()) {
            self.drop_edge(*edge);
        }

        self.by_code.remove(node.code());
        if let Some(name) = node.name() {
            if self.by_name.get(name) == Some(&id) {
                // hand the name over to another node carrying it, if any
                let heir = self
                    .all_nodes()
                    .find(|(_, other)| other.name() == Some(name))
                    .map(|(other, _)| other);
                match heir {
                    Some(other) => {
                        self.by_name.insert(name.to_string(), other);
                    }
                    None => {
                        self.by_name.remove(name);
                    }
                }
            }
        }
        self.free_nodes.push(id.index());
        Ok(node)
    }

    /// Removes one directed link. Its twin, if any, stays but is untied.
    pub fn remove_edge(&mut self, origin: &str, dest: &str) -> Result<()> {
        let id = self.require_edge(origin, dest)?;
        self.drop_edge(id);
        self.touch();
        Ok(())
    }

    fn drop_edge(&mut self, id: EdgeId) {
        let Some(edge) = self.edges.get_mut(id.index()).and_then(Option::take) else {
            return;
        };
        if let Some(node) = self.node_mut(edge.origin()) {
            node.detach(id);
        }
        if let Some(node) = self.node_mut(edge.dest()) {
            node.detach(id);
        }
        if let Some(twin) = edge.twin().and_then(|t| self.edge_mut(t)) {
            twin.set_twin(None);
        }
        self.by_endpoints.remove(&(edge.origin(), edge.dest()));
        self.free_edges.push(id.index());
    }

    pub fn find_node(&self, code: &str) -> Option<NodeId> {
        self.by_code.get(code).copied()
    }

    pub fn require_node(&self, code: &str) -> Result<NodeId> {
        self.find_node(code)
            .ok_or_else(|| NetworkError::node_not_found(code))
    }

    /// Looks up a source or consumer by its display name.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn find_edge(&self, origin: &str, dest: &str) -> Option<EdgeId> {
        let from = self.find_node(origin)?;
        let to = self.find_node(dest)?;
        self.by_endpoints.get(&(from, to)).copied()
    }

    pub fn require_edge(&self, origin: &str, dest: &str) -> Result<EdgeId> {
        self.find_edge(origin, dest)
            .ok_or_else(|| NetworkError::EdgeNotFound {
                origin: origin.to_string(),
                dest: dest.to_string(),
            })
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn node_by_code(&self, code: &str) -> Option<&Node> {
        self.find_node(code).and_then(|id| self.node(id))
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Origin and destination codes of a link.
    pub fn endpoints(&self, id: EdgeId) -> Option<(&str, &str)> {
        let edge = self.edge(id)?;
        let origin = self.node(edge.origin())?;
        let dest = self.node(edge.dest())?;
        Some((origin.code(), dest.code()))
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    pub fn all_edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (EdgeId(i), e)))
    }

    pub fn sources(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.all_nodes().filter(|(_, n)| n.is_source())
    }

    pub fn consumers(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.all_nodes().filter(|(_, n)| n.is_consumer())
    }

    pub fn node_count(&self) -> usize {
        self.by_code.len()
    }

    pub fn edge_count(&self) -> usize {
        self.by_endpoints.len()
    }

    /// Upper bound on node indices, for sizing per-solve scratch arrays.
    pub(crate) fn node_slots(&self) -> usize {
        self.nodes.len()
    }

    pub fn set_capacity(&mut self, origin: &str, dest: &str, capacity: u64) -> Result<()> {
        let id = self.require_edge(origin, dest)?;
        if let Some(edge) = self.edge_mut(id) {
            edge.set_capacity(capacity);
        }
        self.touch();
        Ok(())
    }

    pub fn set_node_operational(&mut self, code: &str, operational: bool) -> Result<()> {
        let id = self.require_node(code)?;
        self.set_node_flag(id, operational);
        self.touch();
        Ok(())
    }

    /// Sets the flag on a link and on its twin.
    pub fn set_link_operational(&mut self, origin: &str, dest: &str, operational: bool) -> Result<()> {
        let id = self.require_edge(origin, dest)?;
        let twin = self.edge(id).and_then(Edge::twin);
        self.set_edge_flag(id, operational);
        if let Some(twin) = twin {
            self.set_edge_flag(twin, operational);
        }
        self.touch();
        Ok(())
    }

    /// Flag flip without a generation bump, for scoped outages that restore.
    pub(crate) fn set_node_flag(&mut self, id: NodeId, operational: bool) {
        if let Some(node) = self.node_mut(id) {
            node.set_operational(operational);
        }
    }

    pub(crate) fn set_edge_flag(&mut self, id: EdgeId, operational: bool) {
        if let Some(edge) = self.edge_mut(id) {
            edge.set_operational(operational);
        }
    }

    pub(crate) fn reset_flows(&mut self) {
        self.edges
            .iter_mut()
            .flatten()
            .for_each(|e| e.set_flow(0));
    }

    /// Sum of flow on the links entering a node.
    pub fn inbound_flow(&self, id: NodeId) -> u64 {
        self.node(id)
            .map(|n| {
                n.incoming()
                    .iter()
                    .filter_map(|e| self.edge(*e))
                    .map(Edge::flow)
                    .sum()
            })
            .unwrap_or(0)
    }

    pub fn outbound_flow(&self, id: NodeId) -> u64 {
        self.node(id)
            .map(|n| {
                n.outgoing()
                    .iter()
                    .filter_map(|e| self.edge(*e))
                    .map(Edge::flow)
                    .sum()
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Graph {
        let mut g = Graph::new();
        g.add_node(Node::source("R1", "Reservoir", "Funchal", "1", 10))
            .unwrap();
        g.add_node(Node::router("PS1", "1")).unwrap();
        g.add_node(Node::consumer("C1", "Town", "1", 8, 1000)).unwrap();
        g.add_edge("R1", "PS1", 6, false).unwrap();
        g.add_edge("PS1", "C1", 5, true).unwrap();
        g
    }

    #[test]
    fn test_lookup_by_code_name_and_endpoints() {
        let g = sample();
        let ps = g.find_node("PS1").unwrap();
        assert_eq!("PS1", g.node(ps).unwrap().code());
        assert_eq!(g.find_node("R1"), g.find_by_name("Reservoir"));
        assert_eq!(g.find_node("C1"), g.find_by_name("Town"));
        assert!(g.find_node("nope").is_none());
        assert!(g.find_edge("C1", "R1").is_none());

        let e = g.find_edge("R1", "PS1").unwrap();
        assert_eq!(Some(("R1", "PS1")), g.endpoints(e));
        assert_eq!(1, g.sources().count());
        assert_eq!(1, g.consumers().count());
    }

    #[test]
    fn test_absent_lookups_are_explicit_errors() {
        let g = sample();
        assert!(matches!(
            g.require_node("X"),
            Err(NetworkError::NodeNotFound { .. })
        ));
        assert!(matches!(
            g.require_edge("C1", "R1"),
            Err(NetworkError::EdgeNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicates_and_reserved_codes_are_rejected() {
        let mut g = sample();
        assert!(matches!(
            g.add_node(Node::router("PS1", "2")),
            Err(NetworkError::DuplicateNode { .. })
        ));
        assert!(matches!(
            g.add_node(Node::router("@sink", "2")),
            Err(NetworkError::ReservedCode { .. })
        ));
        assert!(matches!(
            g.add_edge("R1", "PS1", 1, false),
            Err(NetworkError::DuplicateEdge { .. })
        ));
        // reverse direction of a bidirectional pair already exists
        assert!(matches!(
            g.add_edge("C1", "PS1", 1, false),
            Err(NetworkError::DuplicateEdge { .. })
        ));
        assert!(matches!(
            g.add_edge("R1", "nowhere", 1, false),
            Err(NetworkError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn test_bidirectional_link_has_twins() {
        let g = sample();
        let ab = g.find_edge("PS1", "C1").unwrap();
        let ba = g.find_edge("C1", "PS1").unwrap();
        assert_eq!(Some(ba), g.edge(ab).unwrap().twin());
        assert_eq!(Some(ab), g.edge(ba).unwrap().twin());
        assert_eq!(5, g.edge(ba).unwrap().capacity());
        assert_eq!(3, g.edge_count());
    }

    #[test]
    fn test_remove_node_cascades_to_incident_links() {
        let mut g = sample();
        let removed = g.remove_node("PS1").unwrap();
        assert_eq!("PS1", removed.code());
        assert_eq!(0, g.edge_count());
        assert!(g.find_edge("R1", "PS1").is_none());
        assert!(g.find_edge("C1", "PS1").is_none());

        let r1 = g.node_by_code("R1").unwrap();
        assert!(r1.outgoing().is_empty());
        let c1 = g.node_by_code("C1").unwrap();
        assert!(c1.incoming().is_empty() && c1.outgoing().is_empty());
        assert_eq!(2, g.node_count());
    }

    #[test]
    fn test_remove_edge_unties_twin() {
        let mut g = sample();
        g.remove_edge("PS1", "C1").unwrap();
        let back = g.find_edge("C1", "PS1").unwrap();
        assert_eq!(None, g.edge(back).unwrap().twin());
        assert!(g.remove_edge("PS1", "C1").is_err());
    }

    #[test]
    fn test_slots_are_recycled_after_removal() {
        let mut g = sample();
        let slots = g.node_slots();
        g.remove_node("C1").unwrap();
        g.add_node(Node::consumer("C2", "Village", "2", 3, 10)).unwrap();
        assert_eq!(slots, g.node_slots());
        assert!(g.find_by_name("Town").is_none());
    }

    #[test]
    fn test_shared_name_survives_removal_of_first_holder() {
        let mut g = sample();
        g.add_node(Node::consumer("C2", "Town", "2", 4, 500)).unwrap();
        assert_eq!(g.find_node("C1"), g.find_by_name("Town"));

        g.remove_node("C1").unwrap();
        assert_eq!(g.find_node("C2"), g.find_by_name("Town"));
        g.remove_node("C2").unwrap();
        assert!(g.find_by_name("Town").is_none());
    }

    #[test]
    fn test_removed_id_may_name_a_new_node() {
        let mut g = sample();
        let old = g.find_node("C1").unwrap();
        g.remove_node("C1").unwrap();
        assert!(g.node(old).is_none());

        let fresh = g.add_node(Node::router("PS2", "2")).unwrap();
        assert_eq!(old, fresh);
        assert_eq!("PS2", g.node(old).unwrap().code());
    }

    #[test]
    fn test_public_mutations_bump_generation() {
        let mut g = sample();
        let before = g.generation();
        g.set_link_operational("PS1", "C1", false).unwrap();
        let ba = g.find_edge("C1", "PS1").unwrap();
        assert!(!g.edge(ba).unwrap().is_operational());
        g.set_capacity("R1", "PS1", 2).unwrap();
        assert!(g.generation() >= before + 2);

        let stamp = g.generation();
        let ps = g.find_node("PS1").unwrap();
        g.set_node_flag(ps, false);
        g.set_node_flag(ps, true);
        assert_eq!(stamp, g.generation());
    }
}
